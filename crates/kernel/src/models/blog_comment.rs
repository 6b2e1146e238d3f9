//! Blog comment resource.

use serde_json::{Map, Value};

use super::comment::COMMENT_LENGTH;
use super::resource::Validator;
use crate::error::AppResult;
use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const BLOG_COMMENTS: CollectionSchema = CollectionSchema {
    collection: "blog_comments",
    plural: "comments",
    singular: "comment",
    label: "Comment",
    fields: &[
        FieldSpec::new("comment", FieldKind::Text),
        FieldSpec::new("user", FieldKind::Ref),
        FieldSpec::new("blog", FieldKind::Ref),
    ],
};

/// Parent post reference field.
pub const BLOG_FIELD: &str = "blog";

pub fn validate_create(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    Validator::create(input)
        .text("comment", Some("Comment is required"), Some(COMMENT_LENGTH))
        .reference(BLOG_FIELD, Some("Comment has to belong to a post"))
        .finish()
}

pub fn validate_update(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    Validator::update(input)
        .text("comment", Some("Comment is required"), Some(COMMENT_LENGTH))
        .finish()
}
