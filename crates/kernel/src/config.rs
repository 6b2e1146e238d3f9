//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result, bail};

/// Activity feed cap when FEED_MAX_ITEMS is unset.
pub const DEFAULT_FEED_MAX_ITEMS: u64 = 100;

/// Deployment mode from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            _ => Self::Production,
        }
    }
}

/// Bounds applied to untrusted pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Page size used when `limit` is missing or unparseable.
    pub default_limit: u64,

    /// Largest page size a client may request.
    pub max_limit: u64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Deployment mode from APP_ENV (default: production).
    pub environment: Environment,

    /// Pagination bounds for list queries.
    pub query_limits: QueryLimits,

    /// Maximum number of entries returned by the activity feed (default: 100).
    pub feed_max_items: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let environment = env::var("APP_ENV")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Production);

        let default_limit = env::var("QUERY_DEFAULT_LIMIT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("QUERY_DEFAULT_LIMIT must be a valid u64")?;

        let max_limit = env::var("QUERY_MAX_LIMIT")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .context("QUERY_MAX_LIMIT must be a valid u64")?;

        let query_limits = QueryLimits::new(default_limit, max_limit)?;

        let feed_max_items = match env::var("FEED_MAX_ITEMS") {
            Ok(raw) => raw.parse().context("FEED_MAX_ITEMS must be a valid u64")?,
            Err(_) => DEFAULT_FEED_MAX_ITEMS,
        };

        Ok(Self {
            database_url,
            database_max_connections,
            environment,
            query_limits,
            feed_max_items,
        })
    }
}

impl QueryLimits {
    /// Build limits, rejecting a default outside `1..=max`.
    pub fn new(default_limit: u64, max_limit: u64) -> Result<Self> {
        if default_limit == 0 || default_limit > max_limit {
            bail!("QUERY_DEFAULT_LIMIT ({default_limit}) must be between 1 and QUERY_MAX_LIMIT ({max_limit})");
        }
        Ok(Self {
            default_limit,
            max_limit,
        })
    }
}
