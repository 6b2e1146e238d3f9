//! Movie comment resource. Each comment carries a 1-5 rating that feeds
//! the movie's aggregate fields.

use serde_json::{Map, Value};

use super::resource::{Length, Validator};
use crate::error::AppResult;
use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const COMMENTS: CollectionSchema = CollectionSchema {
    collection: "comments",
    plural: "comments",
    singular: "comment",
    label: "Comment",
    fields: &[
        FieldSpec::new("comment", FieldKind::Text),
        FieldSpec::new("rating", FieldKind::Number),
        FieldSpec::new("movie", FieldKind::Ref),
        FieldSpec::new("user", FieldKind::Ref),
    ],
};

/// Parent reference field.
pub const MOVIE_FIELD: &str = "movie";

/// Rated value field.
pub const RATING_FIELD: &str = "rating";

pub const COMMENT_LENGTH: Length = Length::new(
    10,
    350,
    "Comment can not be less than 10 characters",
    "Comment can not be more than 350 characters",
);

const RATING_MIN: (i64, &str) = (1, "Rating can not be less than 1");
const RATING_MAX: (i64, &str) = (5, "Rating can not be more than 5");

/// Clean fields for a new comment. `user` is filled by the service.
pub fn validate_create(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    Validator::create(input)
        .text("comment", Some("Comment is required"), Some(COMMENT_LENGTH))
        .integer(RATING_FIELD, Some("Rating is required"), RATING_MIN, RATING_MAX)
        .reference(MOVIE_FIELD, Some("Comment has to belong to a movie"))
        .finish()
}

/// Comment text and rating may change; the parent movie may not.
pub fn validate_update(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    Validator::update(input)
        .text("comment", Some("Comment is required"), Some(COMMENT_LENGTH))
        .integer(RATING_FIELD, Some("Rating is required"), RATING_MIN, RATING_MAX)
        .finish()
}
