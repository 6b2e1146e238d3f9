//! Generic CRUD over one collection.
//!
//! Resource services compose one or more [`Collection`]s and add their own
//! validation, permissions and side effects on top.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::QueryLimits;
use crate::error::{AppError, AppResult};
use crate::query::{CollectionSchema, ParamBag, Predicate, Projection, QueryBuilder, QueryPlan};
use crate::store::{Document, DocumentStore, DocumentUpdate};

/// A reference to expand when rendering: the id (or ids) under `key` are
/// replaced by the referenced records, limited to `select`.
#[derive(Debug, Clone, Copy)]
pub struct Populate {
    pub key: &'static str,
    pub schema: &'static CollectionSchema,
    pub select: &'static [&'static str],
}

/// Store access bound to one collection.
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn DocumentStore>,
    schema: &'static CollectionSchema,
    limits: QueryLimits,
}

impl Collection {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        schema: &'static CollectionSchema,
        limits: QueryLimits,
    ) -> Self {
        Self {
            store,
            schema,
            limits,
        }
    }

    pub fn schema(&self) -> &'static CollectionSchema {
        self.schema
    }

    /// Client-driven listing: filter, sort, field selection and
    /// pagination from `params`, ANDed with the trusted `base` predicates.
    pub async fn query(&self, params: &ParamBag, base: Vec<Predicate>) -> AppResult<Vec<Value>> {
        let plan = self.plan(params, base)?;
        let docs = self.store.find(&plan).await?;
        debug!(collection = self.schema.collection, rows = docs.len(), "listed");
        Ok(docs.iter().map(|d| d.render(&plan.projection)).collect())
    }

    /// Build the plan for a client listing without running it.
    pub fn plan(&self, params: &ParamBag, base: Vec<Predicate>) -> AppResult<QueryPlan> {
        base.into_iter()
            .fold(
                QueryBuilder::new(self.schema, params, self.limits),
                QueryBuilder::with_base_filter,
            )
            .filter()?
            .sort()?
            .limit_fields()?
            .paginate()
            .build()
    }

    /// Every record matching `predicates`, newest first.
    pub async fn find_all(&self, predicates: Vec<Predicate>) -> AppResult<Vec<Document>> {
        self.store
            .find(&QueryPlan::matching(self.schema.collection, predicates))
            .await
    }

    /// At most `limit` records matching `predicates`, newest first.
    pub async fn find_newest(
        &self,
        predicates: Vec<Predicate>,
        limit: u64,
    ) -> AppResult<Vec<Document>> {
        let plan = QueryPlan::matching(self.schema.collection, predicates).with_limit(limit);
        self.store.find(&plan).await
    }

    /// First record matching `predicates`.
    pub async fn find_one(&self, predicates: Vec<Predicate>) -> AppResult<Option<Document>> {
        Ok(self.find_newest(predicates, 1).await?.into_iter().next())
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Document>> {
        self.store.find_by_id(self.schema.collection, id).await
    }

    /// Fetch or fail with `<Label> not found`.
    pub async fn get(&self, id: Uuid) -> AppResult<Document> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(self.schema.label, id))
    }

    pub async fn create(&self, fields: Map<String, Value>) -> AppResult<Document> {
        let doc = self.store.create(self.schema.collection, fields).await?;
        info!(collection = self.schema.collection, id = %doc.id, "created");
        Ok(doc)
    }

    pub async fn update(&self, id: Uuid, update: DocumentUpdate) -> AppResult<Document> {
        let doc = self
            .store
            .find_by_id_and_update(self.schema.collection, id, update)
            .await?
            .ok_or_else(|| AppError::not_found(self.schema.label, id))?;
        info!(collection = self.schema.collection, id = %id, version = doc.version, "updated");
        Ok(doc)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<Document> {
        let doc = self
            .store
            .find_by_id_and_delete(self.schema.collection, id)
            .await?
            .ok_or_else(|| AppError::not_found(self.schema.label, id))?;
        info!(collection = self.schema.collection, id = %id, "deleted");
        Ok(doc)
    }

    /// Remove every record whose `field` references `id`.
    pub async fn delete_referencing(&self, field: &str, id: Uuid) -> AppResult<u64> {
        let removed = self
            .store
            .delete_many(self.schema.collection, field, &Value::String(id.to_string()))
            .await?;
        if removed > 0 {
            info!(collection = self.schema.collection, field, parent = %id, removed, "cascade delete");
        }
        Ok(removed)
    }

    pub async fn toggle_active(&self, id: Uuid) -> AppResult<Document> {
        let doc = self.get(id).await?;
        self.update(id, DocumentUpdate::new().active(!doc.is_active))
            .await
    }

    /// Flip a boolean field. A missing field counts as `false`.
    pub async fn toggle_flag(&self, id: Uuid, key: &str) -> AppResult<Document> {
        let doc = self.get(id).await?;
        let current = doc.get_bool(key).unwrap_or(false);
        self.update(id, DocumentUpdate::new().set(key, !current))
            .await
    }

    /// Every record of this collection with the number of `children`
    /// referencing it through `field`, most referenced first.
    pub async fn ranked_by_references(
        &self,
        children: &CollectionSchema,
        field: &str,
        count_key: &str,
        projection: &Projection,
    ) -> AppResult<Vec<Value>> {
        let counts = self.store.count_by(children.collection, field).await?;
        let docs = self.find_all(Vec::new()).await?;

        let mut rows: Vec<(u64, Value)> = docs
            .iter()
            .map(|doc| {
                let count = counts.get(&doc.id.to_string()).copied().unwrap_or(0);
                let mut row = doc.render(projection);
                if let Some(obj) = row.as_object_mut() {
                    obj.insert(count_key.to_string(), Value::from(count));
                }
                (count, row)
            })
            .collect();
        // Stable, so equal counts keep newest-first order.
        rows.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }

    /// Expand references in a rendered record. Dangling ids become `null`.
    pub async fn populate(&self, record: &mut Value, refs: &[Populate]) -> AppResult<()> {
        for spec in refs {
            let Some(slot) = record.get_mut(spec.key) else {
                continue;
            };
            let projection = Projection::Only(spec.select.iter().map(|s| s.to_string()).collect());

            match slot {
                Value::String(raw) => {
                    let expanded = self.lookup(spec, raw, &projection).await?;
                    *slot = expanded;
                }
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        if let Value::String(raw) = item {
                            let expanded = self.lookup(spec, raw, &projection).await?;
                            *item = expanded;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn lookup(&self, spec: &Populate, raw: &str, projection: &Projection) -> AppResult<Value> {
        let Ok(id) = Uuid::parse_str(raw) else {
            return Ok(Value::Null);
        };
        Ok(self
            .store
            .find_by_id(spec.schema.collection, id)
            .await?
            .map_or(Value::Null, |doc| doc.render(projection)))
    }
}
