//! Blog post resource.

use serde_json::{Map, Value};

use super::resource::{Length, Mode, Validator};
use crate::error::AppResult;
use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const BLOG_POSTS: CollectionSchema = CollectionSchema {
    collection: "blog_posts",
    plural: "posts",
    singular: "post",
    label: "Post",
    fields: &[
        FieldSpec::new("title", FieldKind::Text),
        FieldSpec::new("body", FieldKind::Text),
        FieldSpec::new("tags", FieldKind::Text),
        FieldSpec::new("coverImage", FieldKind::Text),
        FieldSpec::new("isFeatured", FieldKind::Bool),
        FieldSpec::new("category", FieldKind::Ref),
    ],
};

const TITLE: Length = Length::new(
    10,
    300,
    "Title can not be less than 10 characters",
    "Title can not be more than 300 characters",
);

const BODY: Length = Length::new(
    10,
    1000,
    "Body can not be less than 10 characters",
    "Body can not be more than 1000 characters",
);

pub fn validate(input: &Map<String, Value>, mode: Mode) -> AppResult<Map<String, Value>> {
    let mut v = Validator::new(input, mode);
    v.text("title", Some("Title is required"), Some(TITLE))
        .text("body", Some("Body is required"), Some(BODY))
        .string_list("tags", None)
        .text("coverImage", Some("Cover image is required"), None)
        .reference("category", None);
    if mode == Mode::Create {
        v.default_value("tags", Value::Array(Vec::new()))
            .default_value("isFeatured", false);
    }
    v.finish()
}
