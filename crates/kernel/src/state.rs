//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{Config, DEFAULT_FEED_MAX_ITEMS, QueryLimits};
use crate::db;
use crate::models::activity::ACTIVITIES;
use crate::models::actor::ACTORS;
use crate::models::blog_category::BLOG_CATEGORIES;
use crate::models::blog_comment::BLOG_COMMENTS;
use crate::models::blog_post::BLOG_POSTS;
use crate::models::category::CATEGORIES;
use crate::models::comment::COMMENTS;
use crate::models::follower::FOLLOWERS;
use crate::models::movie::MOVIES;
use crate::models::user::USERS;
use crate::query::CollectionSchema;
use crate::services::{
    ActorService, BlogCategoryService, BlogCommentService, BlogPostService, CategoryService,
    Collection, CommentService, MovieService, RatingAggregator, SocialService, UserService,
};
use crate::store::{DocumentStore, MemoryStore, PgStore};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Document storage backend.
    store: Arc<dyn DocumentStore>,

    /// Listing limits applied to every client query.
    limits: QueryLimits,

    /// Per-movie rating aggregation.
    ratings: Arc<RatingAggregator>,

    movies: MovieService,
    comments: CommentService,
    actors: ActorService,
    categories: CategoryService,
    users: UserService,
    social: SocialService,
    blog_categories: BlogCategoryService,
    blog_posts: BlogPostService,
    blog_comments: BlogCommentService,
}

impl AppState {
    /// Create application state backed by PostgreSQL.
    ///
    /// Connects, runs pending migrations and wires every service.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;

        info!(environment = ?config.environment, "application state initialized");
        Ok(Self::with_store(
            Arc::new(PgStore::new(pool)),
            config.query_limits,
            config.feed_max_items,
        ))
    }

    /// State over a fresh in-memory store, for tests and local tooling.
    pub fn in_memory(limits: QueryLimits) -> Self {
        Self::with_store(
            Arc::new(MemoryStore::new()),
            limits,
            DEFAULT_FEED_MAX_ITEMS,
        )
    }

    /// Wire every service over one store.
    pub fn with_store(
        store: Arc<dyn DocumentStore>,
        limits: QueryLimits,
        feed_max_items: u64,
    ) -> Self {
        let collection = |schema: &'static CollectionSchema| {
            Collection::new(store.clone(), schema, limits)
        };
        let ratings = Arc::new(RatingAggregator::new(store.clone()));

        let inner = AppStateInner {
            movies: MovieService::new(
                collection(&MOVIES),
                collection(&COMMENTS),
                collection(&ACTIVITIES),
                collection(&CATEGORIES),
                collection(&ACTORS),
                ratings.clone(),
            ),
            comments: CommentService::new(
                collection(&COMMENTS),
                collection(&MOVIES),
                collection(&ACTIVITIES),
                ratings.clone(),
            ),
            actors: ActorService::new(collection(&ACTORS)),
            categories: CategoryService::new(collection(&CATEGORIES)),
            users: UserService::new(collection(&USERS), collection(&FOLLOWERS)),
            social: SocialService::new(
                collection(&FOLLOWERS),
                collection(&USERS),
                collection(&ACTIVITIES),
                feed_max_items,
            ),
            blog_categories: BlogCategoryService::new(collection(&BLOG_CATEGORIES)),
            blog_posts: BlogPostService::new(
                collection(&BLOG_POSTS),
                collection(&BLOG_COMMENTS),
                collection(&BLOG_CATEGORIES),
            ),
            blog_comments: BlogCommentService::new(
                collection(&BLOG_COMMENTS),
                collection(&BLOG_POSTS),
            ),
            ratings,
            limits,
            store,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Get the storage backend.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    pub fn limits(&self) -> QueryLimits {
        self.inner.limits
    }

    /// Get the rating aggregator.
    pub fn ratings(&self) -> &Arc<RatingAggregator> {
        &self.inner.ratings
    }

    pub fn movies(&self) -> &MovieService {
        &self.inner.movies
    }

    pub fn comments(&self) -> &CommentService {
        &self.inner.comments
    }

    pub fn actors(&self) -> &ActorService {
        &self.inner.actors
    }

    pub fn categories(&self) -> &CategoryService {
        &self.inner.categories
    }

    pub fn users(&self) -> &UserService {
        &self.inner.users
    }

    pub fn social(&self) -> &SocialService {
        &self.inner.social
    }

    pub fn blog_categories(&self) -> &BlogCategoryService {
        &self.inner.blog_categories
    }

    pub fn blog_posts(&self) -> &BlogPostService {
        &self.inner.blog_posts
    }

    pub fn blog_comments(&self) -> &BlogCommentService {
        &self.inner.blog_comments
    }

    /// Check if the storage backend is reachable.
    pub async fn healthy(&self) -> bool {
        self.inner.store.ping().await
    }
}
