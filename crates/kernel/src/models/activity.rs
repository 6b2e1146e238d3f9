//! Activity entries recorded when a user comments on a movie.

use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const ACTIVITIES: CollectionSchema = CollectionSchema {
    collection: "activities",
    plural: "activities",
    singular: "activity",
    label: "Activity",
    fields: &[
        FieldSpec::new("comment", FieldKind::Text),
        FieldSpec::new("user", FieldKind::Ref),
        FieldSpec::new("movie", FieldKind::Ref),
    ],
};
