//! Blog category resource.

use serde_json::{Map, Value};

use super::resource::{Length, Mode, Validator};
use crate::error::AppResult;
use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const BLOG_CATEGORIES: CollectionSchema = CollectionSchema {
    collection: "blog_categories",
    plural: "categories",
    singular: "category",
    label: "Blog category",
    fields: &[FieldSpec::new("name", FieldKind::Text)],
};

const NAME: Length = Length::new(
    3,
    40,
    "Blog category name can not be less than 3 characters",
    "Blog category name can not be more than 40 characters",
);

pub fn validate(input: &Map<String, Value>, mode: Mode) -> AppResult<Map<String, Value>> {
    Validator::new(input, mode)
        .text("name", Some("Blog category name is required"), Some(NAME))
        .finish()
}
