//! Rating aggregation.
//!
//! A movie's `averageRating` and `ratingsCount` are derived from the live
//! set of comments that reference it. Every rating write and the
//! recompute that follows run under a per-movie async mutex, so two
//! concurrent writes on the same movie cannot both read the old set and
//! overwrite each other's result. The recompute re-reads the full set, so
//! a missed update heals on the next write (or via [`RatingAggregator::recompute`]).
//!
//! The lock is in-process. Multiple kernel instances writing ratings for
//! the same movie need a storage-level lock on top.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::comment::{COMMENTS, MOVIE_FIELD, RATING_FIELD};
use crate::models::movie::{AVERAGE_RATING, MOVIES, RATINGS_COUNT};
use crate::store::{Document, DocumentStore, DocumentUpdate, GroupSpec, GroupStats};

/// Keeps parent aggregates consistent with their child ratings.
pub struct RatingAggregator {
    store: Arc<dyn DocumentStore>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    parent_collection: &'static str,
    child_collection: &'static str,
    parent_field: &'static str,
    value_field: &'static str,
}

impl RatingAggregator {
    /// Aggregator for movie ratings carried by comments.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            parent_collection: MOVIES.collection,
            child_collection: COMMENTS.collection,
            parent_field: MOVIE_FIELD,
            value_field: RATING_FIELD,
        }
    }

    /// Run a rating write for `parent`, then recompute the parent's
    /// aggregate, both inside the parent's lock.
    ///
    /// If `mutation` fails nothing is recomputed and its error is returned.
    pub async fn apply<T, F, Fut>(&self, parent: Uuid, mutation: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let lock = self.lock_for(parent);
        let result = {
            let _guard = lock.lock().await;
            match mutation().await {
                Ok(value) => self.recompute_locked(parent).await.map(|_| value),
                Err(err) => Err(err),
            }
        };
        drop(lock);
        self.release(parent);
        result
    }

    /// Recompute one parent's aggregate from scratch.
    ///
    /// Returns the updated parent, or `None` if it no longer exists.
    pub async fn recompute(&self, parent: Uuid) -> AppResult<Option<Document>> {
        let lock = self.lock_for(parent);
        let result = {
            let _guard = lock.lock().await;
            self.recompute_locked(parent).await
        };
        drop(lock);
        self.release(parent);
        result
    }

    /// Number of parents with a lock currently held or awaited.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    async fn recompute_locked(&self, parent: Uuid) -> AppResult<Option<Document>> {
        let stats = self
            .store
            .aggregate(&GroupSpec {
                collection: self.child_collection.to_string(),
                match_field: self.parent_field.to_string(),
                match_value: Value::String(parent.to_string()),
                value_field: self.value_field.to_string(),
            })
            .await?;

        let (average, count) = summarize(stats);

        // Both fields in one partial update so they never disagree.
        let update = DocumentUpdate::new()
            .set(AVERAGE_RATING, average)
            .set(RATINGS_COUNT, count);

        let updated = self
            .store
            .find_by_id_and_update(self.parent_collection, parent, update)
            .await?;

        match &updated {
            Some(_) => info!(
                parent = %parent,
                average_rating = average,
                ratings_count = count,
                "rating aggregate updated"
            ),
            None => debug!(parent = %parent, "rating parent missing, aggregate skipped"),
        }
        Ok(updated)
    }

    fn lock_for(&self, parent: Uuid) -> Arc<Mutex<()>> {
        self.locks.entry(parent).or_default().clone()
    }

    /// Drop the parent's lock entry once nobody else holds it.
    fn release(&self, parent: Uuid) {
        self.locks
            .remove_if(&parent, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Average rounded half-up to one decimal, and the count. An empty set
/// resets both to zero.
pub fn summarize(stats: GroupStats) -> (f64, u64) {
    if stats.count == 0 {
        return (0.0, 0);
    }
    // Ratings are whole numbers, so sum * 10 / count is exact at .5 ties.
    let tenths = (stats.sum * 10.0 / stats.count as f64).round();
    (tenths / 10.0, stats.count)
}
