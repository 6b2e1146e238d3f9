//! Movie category resource.

use serde_json::{Map, Value};

use super::resource::{Length, Mode, Validator};
use crate::error::AppResult;
use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const CATEGORIES: CollectionSchema = CollectionSchema {
    collection: "categories",
    plural: "categories",
    singular: "category",
    label: "Category",
    fields: &[FieldSpec::new("name", FieldKind::Text)],
};

const NAME: Length = Length::new(
    3,
    30,
    "Category can not be less than three(3) characters",
    "Category can not be more than three(30) characters",
);

pub fn validate(input: &Map<String, Value>, mode: Mode) -> AppResult<Map<String, Value>> {
    Validator::new(input, mode)
        .text("name", Some("Category is required"), Some(NAME))
        .finish()
}
