//! Actor resource.

use serde_json::{Map, Value};

use super::resource::Validator;
use crate::error::AppResult;
use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const ACTORS: CollectionSchema = CollectionSchema {
    collection: "actors",
    plural: "actors",
    singular: "actor",
    label: "Actor",
    fields: &[
        FieldSpec::new("name", FieldKind::Text),
        FieldSpec::new("description", FieldKind::Text),
        FieldSpec::new("avatar", FieldKind::Text),
    ],
};

pub const DEFAULT_AVATAR: &str = "default.jpg";

pub fn validate_create(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    Validator::create(input)
        .text("name", Some("Actor name is required"), None)
        .text("description", Some("Description is required"), None)
        .text("avatar", None, None)
        .default_value("avatar", DEFAULT_AVATAR)
        .finish()
}

pub fn validate_update(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    Validator::update(input)
        .text("name", Some("Actor name is required"), None)
        .text("description", Some("Description is required"), None)
        .text("avatar", None, None)
        .finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn avatar_defaults() {
        let body = json!({ "name": "Keanu Reeves", "description": "Actor" });
        let fields = validate_create(body.as_object().unwrap()).unwrap();
        assert_eq!(fields["avatar"], DEFAULT_AVATAR);
    }

    #[test]
    fn description_is_required() {
        let body = json!({ "name": "Keanu Reeves" });
        assert_eq!(
            validate_create(body.as_object().unwrap())
                .unwrap_err()
                .to_string(),
            "Invalid input data: Description is required"
        );
    }
}
