#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every test gets its own [`TestApp`] over a fresh in-memory store, wired
//! through the same [`AppState`] the binary uses.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use marquee_kernel::config::{DEFAULT_FEED_MAX_ITEMS, QueryLimits};
use marquee_kernel::models::Principal;
use marquee_kernel::query::QueryPlan;
use marquee_kernel::response::ApiResponse;
use marquee_kernel::store::{
    Document, DocumentStore, DocumentUpdate, GroupSpec, GroupStats, MemoryStore,
};
use marquee_kernel::{AppResult, AppState};
use marquee_test_utils::{test_actor, test_category, test_comment, test_movie, test_user};

/// Test application over an isolated store.
pub struct TestApp {
    pub state: AppState,
    pub admin: Principal,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            state: AppState::in_memory(QueryLimits::default()),
            admin: Principal::admin(Uuid::now_v7()),
        }
    }

    /// Test application whose store pauses at the points where concurrent
    /// writers can interleave.
    pub fn with_slow_store(store: SlowStore) -> Self {
        Self {
            state: AppState::with_store(
                Arc::new(store),
                QueryLimits::default(),
                DEFAULT_FEED_MAX_ITEMS,
            ),
            admin: Principal::admin(Uuid::now_v7()),
        }
    }

    /// Create a user profile and return a principal acting as that user.
    pub async fn user(&self, username: &str) -> Principal {
        let body = test_user(username).to_json();
        let response = self.state.users().create(&self.admin, &body).await.unwrap();
        Principal::user(id_of(&response, "user"))
    }

    pub async fn category(&self, name: &str) -> Uuid {
        let response = self
            .state
            .categories()
            .create(&self.admin, &test_category(name))
            .await
            .unwrap();
        id_of(&response, "category")
    }

    pub async fn actor(&self, name: &str) -> Uuid {
        let response = self
            .state
            .actors()
            .create(&self.admin, &test_actor(name))
            .await
            .unwrap();
        id_of(&response, "actor")
    }

    /// Create a movie with a fresh category and actor.
    pub async fn movie(&self, name: &str) -> Uuid {
        let category = self.category(&format!("{name} films")).await;
        let actor = self.actor("Jane Doe").await;
        self.movie_in(name, category, &[actor]).await
    }

    pub async fn movie_in(&self, name: &str, category: Uuid, actors: &[Uuid]) -> Uuid {
        let body = test_movie(name, category, actors).to_json();
        let response = self.state.movies().create(&self.admin, &body).await.unwrap();
        id_of(&response, "movie")
    }

    /// Rate `movie` as `principal`, returning the comment id.
    pub async fn rate(&self, principal: &Principal, movie: Uuid, rating: i64) -> Uuid {
        let body = test_comment(movie, rating).to_json();
        let response = self.state.comments().create(principal, &body).await.unwrap();
        id_of(&response, "comment")
    }

    /// The stored movie as rendered by the API.
    pub async fn movie_json(&self, movie: Uuid) -> Value {
        let response = self.state.movies().get(&movie.to_string()).await.unwrap();
        response.get("movie").cloned().unwrap()
    }
}

/// Id of the record under `key` in a response's data section.
pub fn id_of(response: &ApiResponse, key: &str) -> Uuid {
    let raw = response
        .get(key)
        .and_then(|v| v.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("response has no {key}.id: {response:?}"));
    Uuid::parse_str(raw).unwrap()
}

/// Rows of the list under `key` in a response's data section.
pub fn rows(response: &ApiResponse, key: &str) -> Vec<Value> {
    response
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_else(|| panic!("response has no {key} list: {response:?}"))
}

/// A [`MemoryStore`] that sleeps after movie reads and after aggregates,
/// yielding to other tasks between a read and the write that depends on it.
#[derive(Default)]
pub struct SlowStore {
    inner: MemoryStore,
    movie_read_delay: Duration,
    aggregate_delay: Duration,
}

impl SlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn movie_reads(mut self, delay: Duration) -> Self {
        self.movie_read_delay = delay;
        self
    }

    pub fn aggregates(mut self, delay: Duration) -> Self {
        self.aggregate_delay = delay;
        self
    }
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn find(&self, plan: &QueryPlan) -> AppResult<Vec<Document>> {
        self.inner.find(plan).await
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> AppResult<Option<Document>> {
        let found = self.inner.find_by_id(collection, id).await?;
        if collection == "movies" && !self.movie_read_delay.is_zero() {
            tokio::time::sleep(self.movie_read_delay).await;
        }
        Ok(found)
    }

    async fn create(&self, collection: &str, fields: Map<String, Value>) -> AppResult<Document> {
        self.inner.create(collection, fields).await
    }

    async fn find_by_id_and_update(
        &self,
        collection: &str,
        id: Uuid,
        update: DocumentUpdate,
    ) -> AppResult<Option<Document>> {
        tokio::task::yield_now().await;
        self.inner.find_by_id_and_update(collection, id, update).await
    }

    async fn find_by_id_and_delete(&self, collection: &str, id: Uuid) -> AppResult<Option<Document>> {
        self.inner.find_by_id_and_delete(collection, id).await
    }

    async fn delete_many(&self, collection: &str, field: &str, value: &Value) -> AppResult<u64> {
        self.inner.delete_many(collection, field, value).await
    }

    async fn aggregate(&self, spec: &GroupSpec) -> AppResult<GroupStats> {
        let stats = self.inner.aggregate(spec).await?;
        if !self.aggregate_delay.is_zero() {
            tokio::time::sleep(self.aggregate_delay).await;
        }
        Ok(stats)
    }

    async fn count_by(&self, collection: &str, field: &str) -> AppResult<HashMap<String, u64>> {
        self.inner.count_by(collection, field).await
    }
}
