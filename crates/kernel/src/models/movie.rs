//! Movie resource.

use serde_json::{Map, Value};

use super::resource::{Length, Validator, slugify};
use crate::error::AppResult;
use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const MOVIES: CollectionSchema = CollectionSchema {
    collection: "movies",
    plural: "movies",
    singular: "movie",
    label: "Movie",
    fields: &[
        FieldSpec::new("name", FieldKind::Text),
        FieldSpec::new("summary", FieldKind::Text),
        FieldSpec::new("slug", FieldKind::Text),
        FieldSpec::new("yearReleased", FieldKind::Date),
        FieldSpec::new("movieReleaseDate", FieldKind::Date),
        FieldSpec::new("averageRating", FieldKind::Number),
        FieldSpec::new("ratingsCount", FieldKind::Number),
        FieldSpec::new("isFeatured", FieldKind::Bool),
        FieldSpec::new("category", FieldKind::Ref),
        FieldSpec::new("actor", FieldKind::Ref),
    ],
};

/// Derived rating fields, owned by the rating aggregator.
pub const AVERAGE_RATING: &str = "averageRating";
pub const RATINGS_COUNT: &str = "ratingsCount";

const SUMMARY: Length = Length::new(
    10,
    350,
    "Summary can not be less than 10 characters",
    "Summary can not be more than 350 characters",
);

fn check(v: &mut Validator<'_>) {
    v.text("name", Some("Movie name is required"), None)
        .text("summary", Some("Movie summary is required"), Some(SUMMARY))
        .date("yearReleased", None)
        .date("movieReleaseDate", Some("Movie release date is required"))
        .reference("category", Some("Movie must belong to a category"))
        .references("actor", Some("A movie must have actors"))
        .string_list("images", None);
}

/// Clean fields for a new movie, with derived defaults.
pub fn validate_create(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    let mut v = Validator::create(input);
    check(&mut v);
    v.default_value("images", Value::Array(Vec::new()));
    let mut fields = v.finish()?;

    with_slug(&mut fields);
    fields.insert("isFeatured".to_string(), Value::Bool(false));
    fields.insert(AVERAGE_RATING.to_string(), Value::from(0.0));
    fields.insert(RATINGS_COUNT.to_string(), Value::from(0));
    Ok(fields)
}

/// Clean fields for a movie update. The slug follows a renamed movie.
pub fn validate_update(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    let mut v = Validator::update(input);
    check(&mut v);
    let mut fields = v.finish()?;
    with_slug(&mut fields);
    Ok(fields)
}

fn with_slug(fields: &mut Map<String, Value>) {
    if let Some(name) = fields.get("name").and_then(Value::as_str) {
        let slug = slugify(name);
        fields.insert("slug".to_string(), Value::String(slug));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> Map<String, Value> {
        json!({
            "name": "The Matrix",
            "summary": "A hacker learns the truth about reality.",
            "yearReleased": "1999-01-01",
            "movieReleaseDate": "1999-03-31",
            "category": "0190a4c2-0000-7000-8000-000000000001",
            "actor": ["0190a4c2-0000-7000-8000-000000000002"],
            "averageRating": 5,
            "ratingsCount": 999,
            "slug": "hand-written"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn create_derives_fields_and_ignores_client_aggregates() {
        let fields = validate_create(&input()).unwrap();
        assert_eq!(fields["slug"], "the-matrix");
        assert_eq!(fields["averageRating"], 0.0);
        assert_eq!(fields["ratingsCount"], 0);
        assert_eq!(fields["isFeatured"], false);
        assert_eq!(fields["images"], json!([]));
    }

    #[test]
    fn update_accepts_partial_bodies() {
        let body = json!({ "summary": "Short but long enough" });
        let fields = validate_update(body.as_object().unwrap()).unwrap();
        assert_eq!(fields.len(), 1);

        let body = json!({ "name": "Matrix Reloaded", "ratingsCount": 3 });
        let fields = validate_update(body.as_object().unwrap()).unwrap();
        assert_eq!(fields["slug"], "matrix-reloaded");
        assert!(fields.get("ratingsCount").is_none());
    }

    #[test]
    fn short_summary_is_rejected() {
        let mut body = input();
        body.insert("summary".into(), json!("Too short"));
        let err = validate_create(&body).unwrap_err();
        assert!(err.to_string().contains("Summary can not be less than 10 characters"));
    }
}
