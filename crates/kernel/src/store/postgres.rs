//! PostgreSQL document store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use super::{Document, DocumentStore, DocumentUpdate, GroupSpec, GroupStats};
use crate::error::AppResult;
use crate::query::QueryPlan;
use crate::query::sql::{DOCUMENT_COLUMNS, select_sql};

/// Row shape of the `document` table.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    collection: String,
    fields: Json<Map<String, Value>>,
    is_active: bool,
    created: i64,
    changed: i64,
    version: i32,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            collection: row.collection,
            fields: row.fields.0,
            is_active: row.is_active,
            created: row.created,
            changed: row.changed,
            version: row.version,
        }
    }
}

/// Postgres-backed [`DocumentStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(&self, plan: &QueryPlan) -> AppResult<Vec<Document>> {
        let sql = select_sql(plan);
        debug!(sql = %sql, "executing plan");

        let rows = sqlx::query_as::<_, DocumentRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> AppResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM document WHERE collection = $1 AND id = $2"
        ))
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn create(&self, collection: &str, fields: Map<String, Value>) -> AppResult<Document> {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now().timestamp_millis();

        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            INSERT INTO document (id, collection, fields, is_active, created, changed, version)
            VALUES ($1, $2, $3, TRUE, $4, $4, 0)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(collection)
        .bind(Json(&fields))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id_and_update(
        &self,
        collection: &str,
        id: Uuid,
        update: DocumentUpdate,
    ) -> AppResult<Option<Document>> {
        let now = chrono::Utc::now().timestamp_millis();

        // `||` merges top-level keys; `changed` never moves backwards.
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            UPDATE document
            SET fields = fields || $3,
                is_active = COALESCE($4, is_active),
                changed = GREATEST($5, changed + 1),
                version = version + 1
            WHERE collection = $1 AND id = $2
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(collection)
        .bind(id)
        .bind(Json(&update.fields))
        .bind(update.is_active)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn find_by_id_and_delete(&self, collection: &str, id: Uuid) -> AppResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "DELETE FROM document WHERE collection = $1 AND id = $2 RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn delete_many(&self, collection: &str, field: &str, value: &Value) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM document WHERE collection = $1 AND fields -> $2 @> $3")
                .bind(collection)
                .bind(field)
                .bind(Json(value))
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn aggregate(&self, spec: &GroupSpec) -> AppResult<GroupStats> {
        let (count, sum): (i64, f64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM((fields ->> $3)::float8), 0)::float8
            FROM document
            WHERE collection = $1
              AND fields -> $2 @> $4
              AND jsonb_typeof(fields -> $3) = 'number'
            "#,
        )
        .bind(&spec.collection)
        .bind(&spec.match_field)
        .bind(&spec.value_field)
        .bind(Json(&spec.match_value))
        .fetch_one(&self.pool)
        .await?;

        Ok(GroupStats {
            count: u64::try_from(count).unwrap_or(0),
            sum,
        })
    }

    async fn count_by(&self, collection: &str, field: &str) -> AppResult<HashMap<String, u64>> {
        // Array fields count once per member.
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT group_key, COUNT(*)
            FROM (
                SELECT CASE WHEN jsonb_typeof(fields -> $2) = 'array'
                            THEN e.elem
                            ELSE fields ->> $2
                       END AS group_key
                FROM document
                LEFT JOIN LATERAL jsonb_array_elements_text(
                    CASE WHEN jsonb_typeof(fields -> $2) = 'array'
                         THEN fields -> $2
                         ELSE '[]'::jsonb
                    END
                ) AS e(elem) ON TRUE
                WHERE collection = $1
            ) grouped
            WHERE group_key IS NOT NULL
            GROUP BY group_key
            "#,
        )
        .bind(collection)
        .bind(field)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(key, count)| (key, u64::try_from(count).unwrap_or(0)))
            .collect())
    }

    async fn ping(&self) -> bool {
        crate::db::check_health(&self.pool).await
    }
}
