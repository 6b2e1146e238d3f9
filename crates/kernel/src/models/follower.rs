//! Follow edges between users: `follower` follows `user`.

use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const FOLLOWERS: CollectionSchema = CollectionSchema {
    collection: "followers",
    plural: "followers",
    singular: "follow",
    label: "Follow",
    fields: &[
        FieldSpec::new("user", FieldKind::Ref),
        FieldSpec::new("follower", FieldKind::Ref),
    ],
};

/// The followed user.
pub const USER_FIELD: &str = "user";

/// The following user.
pub const FOLLOWER_FIELD: &str = "follower";
