//! In-process document store.
//!
//! Evaluates plans with [`crate::query::eval`] so results match the
//! Postgres backend. Timestamps strictly increase within one store, which
//! makes creation order total even when records are written in the same
//! millisecond.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::document::group_key;
use super::{Document, DocumentStore, DocumentUpdate, GroupSpec, GroupStats, UNIQUE_FIELDS};
use crate::error::{AppError, AppResult};
use crate::query::{Predicate, QueryPlan, eval};

/// Memory-backed [`DocumentStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<Uuid, Document>>,
    clock: i64,
}

impl Inner {
    /// Next timestamp, never equal to or earlier than the previous one.
    fn tick(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.clock = now.max(self.clock + 1);
        self.clock
    }

    /// Reject a write that would duplicate a unique field.
    fn check_unique(
        &self,
        collection: &str,
        id: Uuid,
        fields: &Map<String, Value>,
    ) -> AppResult<()> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(());
        };

        for (_, field) in UNIQUE_FIELDS.iter().filter(|(c, _)| *c == collection) {
            let Some(wanted) = fields.get(*field).and_then(group_key) else {
                continue;
            };
            let taken = docs.values().any(|doc| {
                doc.id != id && doc.fields.get(*field).and_then(group_key).as_ref() == Some(&wanted)
            });
            if taken {
                return Err(AppError::Duplicate {
                    field: field.to_string(),
                    value: wanted,
                });
            }
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.inner
            .read()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, plan: &QueryPlan) -> AppResult<Vec<Document>> {
        let inner = self.inner.read();
        let Some(docs) = inner.collections.get(&plan.collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Document> = docs
            .values()
            .filter(|doc| eval::matches_all(&plan.predicates, doc))
            .collect();
        matched.sort_by(|a, b| eval::compare(&plan.sorts, a, b));

        let page: Vec<Document> = match plan.pagination {
            Some(p) => matched
                .into_iter()
                .skip(usize::try_from(p.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(p.limit).unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            None => matched.into_iter().cloned().collect(),
        };

        debug!(collection = %plan.collection, rows = page.len(), "memory find");
        Ok(page)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> AppResult<Option<Document>> {
        let inner = self.inner.read();
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .cloned())
    }

    async fn create(&self, collection: &str, fields: Map<String, Value>) -> AppResult<Document> {
        let mut inner = self.inner.write();
        let id = Uuid::now_v7();
        inner.check_unique(collection, id, &fields)?;

        let now = inner.tick();
        let doc = Document {
            id,
            collection: collection.to_string(),
            fields,
            is_active: true,
            created: now,
            changed: now,
            version: 0,
        };
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, doc.clone());

        Ok(doc)
    }

    async fn find_by_id_and_update(
        &self,
        collection: &str,
        id: Uuid,
        update: DocumentUpdate,
    ) -> AppResult<Option<Document>> {
        let mut inner = self.inner.write();

        let Some(mut merged) = inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(&id))
            .map(|doc| doc.fields.clone())
        else {
            return Ok(None);
        };
        for (key, value) in update.fields {
            merged.insert(key, value);
        }
        inner.check_unique(collection, id, &merged)?;

        let now = inner.tick();
        let Some(doc) = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(&id))
        else {
            return Ok(None);
        };
        doc.fields = merged;
        if let Some(active) = update.is_active {
            doc.is_active = active;
        }
        doc.changed = now;
        doc.version += 1;

        Ok(Some(doc.clone()))
    }

    async fn find_by_id_and_delete(&self, collection: &str, id: Uuid) -> AppResult<Option<Document>> {
        let mut inner = self.inner.write();
        Ok(inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(&id)))
    }

    async fn delete_many(&self, collection: &str, field: &str, value: &Value) -> AppResult<u64> {
        let predicate = Predicate::field_eq(field, value.clone());
        let mut inner = self.inner.write();
        let Some(docs) = inner.collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = docs.len();
        docs.retain(|_, doc| !eval::matches(&predicate, doc));
        Ok((before - docs.len()) as u64)
    }

    async fn aggregate(&self, spec: &GroupSpec) -> AppResult<GroupStats> {
        let predicate = Predicate::field_eq(&spec.match_field, spec.match_value.clone());
        let inner = self.inner.read();
        let Some(docs) = inner.collections.get(&spec.collection) else {
            return Ok(GroupStats::default());
        };

        let stats = docs
            .values()
            .filter(|doc| eval::matches(&predicate, doc))
            .filter_map(|doc| doc.fields.get(&spec.value_field).and_then(Value::as_f64))
            .fold(GroupStats::default(), |acc, value| GroupStats {
                count: acc.count + 1,
                sum: acc.sum + value,
            });
        Ok(stats)
    }

    async fn count_by(&self, collection: &str, field: &str) -> AppResult<HashMap<String, u64>> {
        let inner = self.inner.read();
        let mut counts = HashMap::new();
        if let Some(docs) = inner.collections.get(collection) {
            for value in docs.values().filter_map(|doc| doc.fields.get(field)) {
                let keys: Vec<String> = match value {
                    Value::Array(items) => items.iter().filter_map(group_key).collect(),
                    other => group_key(other).into_iter().collect(),
                };
                for key in keys {
                    *counts.entry(key).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::{FieldRef, SortKey};
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_timestamps() {
        let store = MemoryStore::new();
        let a = store.create("movies", fields(json!({ "name": "A" }))).await.unwrap();
        let b = store.create("movies", fields(json!({ "name": "B" }))).await.unwrap();
        assert!(b.created > a.created);
        assert!(a.is_active);
        assert_eq!(a.version, 0);
    }

    #[tokio::test]
    async fn update_merges_and_bumps_revision() {
        let store = MemoryStore::new();
        let doc = store
            .create("movies", fields(json!({ "name": "A", "summary": "first" })))
            .await
            .unwrap();

        let updated = store
            .find_by_id_and_update("movies", doc.id, DocumentUpdate::new().set("summary", "second"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get_str("name"), Some("A"));
        assert_eq!(updated.get_str("summary"), Some("second"));
        assert_eq!(updated.version, 1);
        assert!(updated.changed > doc.changed);
        assert_eq!(updated.created, doc.created);
    }

    #[tokio::test]
    async fn missing_records_yield_none() {
        let store = MemoryStore::new();
        let id = Uuid::now_v7();
        assert!(store.find_by_id("movies", id).await.unwrap().is_none());
        assert!(
            store
                .find_by_id_and_update("movies", id, DocumentUpdate::new().set("x", 1))
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.find_by_id_and_delete("movies", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_fields_are_enforced() {
        let store = MemoryStore::new();
        store
            .create("categories", fields(json!({ "name": "Drama" })))
            .await
            .unwrap();
        let err = store
            .create("categories", fields(json!({ "name": "Drama" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { ref field, .. } if field == "name"));

        // Other collections are unaffected.
        store
            .create("movies", fields(json!({ "name": "Drama" })))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn updating_a_record_to_its_own_value_is_allowed() {
        let store = MemoryStore::new();
        let doc = store
            .create("users", fields(json!({ "email": "a@b.io", "username": "abc" })))
            .await
            .unwrap();
        store
            .find_by_id_and_update("users", doc.id, DocumentUpdate::new().set("email", "a@b.io"))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn find_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for rating in [3, 1, 5, 4, 2] {
            store
                .create("comments", fields(json!({ "rating": rating })))
                .await
                .unwrap();
        }

        let mut plan = QueryPlan::matching("comments", vec![]);
        plan.sorts = vec![SortKey::desc(FieldRef::Data("rating".into()))];
        let plan = plan.with_limit(2);
        let ratings: Vec<_> = store
            .find(&plan)
            .await
            .unwrap()
            .iter()
            .filter_map(|d| d.get_f64("rating"))
            .collect();
        assert_eq!(ratings, vec![5.0, 4.0]);
    }

    #[tokio::test]
    async fn aggregate_and_count_by() {
        let store = MemoryStore::new();
        for (movie, rating) in [("m1", 5), ("m1", 2), ("m2", 4)] {
            store
                .create("comments", fields(json!({ "movie": movie, "rating": rating })))
                .await
                .unwrap();
        }

        let stats = store
            .aggregate(&GroupSpec {
                collection: "comments".into(),
                match_field: "movie".into(),
                match_value: json!("m1"),
                value_field: "rating".into(),
            })
            .await
            .unwrap();
        assert_eq!(stats, GroupStats { count: 2, sum: 7.0 });

        let counts = store.count_by("comments", "movie").await.unwrap();
        assert_eq!(counts.get("m1"), Some(&2));
        assert_eq!(counts.get("m2"), Some(&1));
    }

    #[tokio::test]
    async fn count_by_counts_array_members() {
        let store = MemoryStore::new();
        store
            .create("movies", fields(json!({ "actor": ["a1", "a2"] })))
            .await
            .unwrap();
        store
            .create("movies", fields(json!({ "actor": ["a1"] })))
            .await
            .unwrap();

        let counts = store.count_by("movies", "actor").await.unwrap();
        assert_eq!(counts.get("a1"), Some(&2));
        assert_eq!(counts.get("a2"), Some(&1));
    }

    #[tokio::test]
    async fn delete_many_matches_array_members() {
        let store = MemoryStore::new();
        store
            .create("pairs", fields(json!({ "user": "u1", "follower": "u2" })))
            .await
            .unwrap();
        store
            .create("pairs", fields(json!({ "user": "u3", "follower": "u1" })))
            .await
            .unwrap();
        store
            .create("tagged", fields(json!({ "tags": ["a", "b"] })))
            .await
            .unwrap();

        assert_eq!(store.delete_many("pairs", "user", &json!("u1")).await.unwrap(), 1);
        assert_eq!(store.len("pairs"), 1);
        assert_eq!(store.delete_many("tagged", "tags", &json!("b")).await.unwrap(), 1);
        assert_eq!(store.len("tagged"), 0);
    }
}
