//! Stored document record and its JSON rendering.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::query::Projection;

/// Keys the renderer owns. Client input may not set them as fields.
pub const BASE_KEYS: &[&str] = &[
    "id",
    "_id",
    "isActive",
    "createdAt",
    "lastUpdatedAt",
    "version",
];

/// One record in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Collection the record belongs to.
    pub collection: String,

    /// Resource fields.
    pub fields: Map<String, Value>,

    /// Soft activation flag.
    pub is_active: bool,

    /// Unix milliseconds when created.
    pub created: i64,

    /// Unix milliseconds when last changed.
    pub changed: i64,

    /// Revision counter, bumped on every update.
    pub version: i32,
}

impl Document {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// A reference field parsed as a UUID.
    pub fn get_uuid(&self, key: &str) -> Option<Uuid> {
        self.get_str(key).and_then(|s| Uuid::parse_str(s).ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    /// Render with the given projection.
    ///
    /// `Projection::Default` emits every field except `version`;
    /// `Projection::Only` emits `id` plus the listed keys that exist.
    pub fn render(&self, projection: &Projection) -> Value {
        let mut full = Map::new();
        full.insert("id".to_string(), Value::String(self.id.to_string()));
        for (key, value) in &self.fields {
            full.insert(key.clone(), value.clone());
        }
        full.insert("isActive".to_string(), Value::Bool(self.is_active));
        full.insert("createdAt".to_string(), Value::String(millis_to_rfc3339(self.created)));
        full.insert(
            "lastUpdatedAt".to_string(),
            Value::String(millis_to_rfc3339(self.changed)),
        );

        match projection {
            Projection::Default => Value::Object(full),
            Projection::Only(names) => {
                let mut out = Map::new();
                if let Some(id) = full.remove("id") {
                    out.insert("id".to_string(), id);
                }
                for name in names {
                    if name == "version" {
                        out.insert(name.clone(), Value::from(self.version));
                    } else if let Some(value) = full.remove(name) {
                        out.insert(name.clone(), value);
                    }
                }
                Value::Object(out)
            }
        }
    }

    pub fn to_json(&self) -> Value {
        self.render(&Projection::Default)
    }
}

/// Format unix milliseconds as RFC 3339 (UTC, millisecond precision).
pub fn millis_to_rfc3339(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Text key for grouping, matching Postgres `->>` output for scalars.
pub(crate) fn group_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
