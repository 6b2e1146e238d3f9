//! Document storage.
//!
//! Services talk to storage only through [`DocumentStore`]. Two backends:
//! - [`PgStore`]: PostgreSQL, one `document` table with JSONB fields
//! - [`MemoryStore`]: in-process, used by tests and the CLI dry runs

mod document;
mod memory;
mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::query::QueryPlan;

pub use document::{BASE_KEYS, Document, millis_to_rfc3339};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Fields that must be unique among active and inactive records of a
/// collection. Postgres enforces these with `uq_<collection>_<field>` indexes.
pub const UNIQUE_FIELDS: &[(&str, &str)] = &[
    ("categories", "name"),
    ("blog_categories", "name"),
    ("users", "email"),
    ("users", "username"),
];

/// Partial update applied by [`DocumentStore::find_by_id_and_update`].
///
/// `fields` is merged key by key into the stored map; keys not present are
/// left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    pub fields: Map<String, Value>,
    pub is_active: Option<bool>,
}

impl DocumentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an entire field map.
    pub fn merge(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            is_active: None,
        }
    }

    /// Set one field.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.is_active.is_none()
    }
}

/// Selection for [`DocumentStore::aggregate`]: records of `collection`
/// whose `match_field` equals `match_value`, summing numeric `value_field`.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub collection: String,
    pub match_field: String,
    pub match_value: Value,
    pub value_field: String,
}

/// Count and sum over a group. Records whose value field is not a number
/// are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupStats {
    pub count: u64,
    pub sum: f64,
}

/// Storage collaborator.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Execute a plan.
    async fn find(&self, plan: &QueryPlan) -> AppResult<Vec<Document>>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> AppResult<Option<Document>>;

    /// Insert a new active record with a fresh id.
    async fn create(&self, collection: &str, fields: Map<String, Value>) -> AppResult<Document>;

    /// Apply a partial update. Returns the updated record, or `None` when
    /// no such record exists.
    async fn find_by_id_and_update(
        &self,
        collection: &str,
        id: Uuid,
        update: DocumentUpdate,
    ) -> AppResult<Option<Document>>;

    /// Remove a record, returning it if it existed.
    async fn find_by_id_and_delete(&self, collection: &str, id: Uuid) -> AppResult<Option<Document>>;

    /// Remove every record whose `field` equals (or, for arrays, contains)
    /// `value`. Returns the number removed.
    async fn delete_many(&self, collection: &str, field: &str, value: &Value) -> AppResult<u64>;

    async fn aggregate(&self, spec: &GroupSpec) -> AppResult<GroupStats>;

    /// Number of records per distinct value of `field`. Array fields
    /// count once per member.
    async fn count_by(&self, collection: &str, field: &str) -> AppResult<HashMap<String, u64>>;

    /// Backend reachability.
    async fn ping(&self) -> bool {
        true
    }
}
