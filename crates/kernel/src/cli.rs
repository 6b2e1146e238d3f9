//! Command-line interface for the `marquee` binary.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::models::parse_id;
use crate::query::ParamBag;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Movie catalog maintenance tool.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,

    /// Check that the database is reachable.
    Health,

    /// Print a listing as JSON, using the same query syntax as the API.
    List {
        resource: Resource,

        /// Query string, e.g. `averageRating[gte]=4&sort=-createdAt&page=2`.
        #[arg(long, short)]
        query: Option<String>,
    },

    /// Recompute rating aggregates from the stored comments.
    RecomputeRatings {
        /// Only this movie. Defaults to every movie.
        #[arg(long)]
        movie: Option<String>,
    },
}

/// Listable resources.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Movies,
    Comments,
    Actors,
    Categories,
    Users,
    BlogCategories,
    BlogPosts,
    BlogComments,
}

impl Cli {
    pub async fn run(self, config: &Config) -> Result<()> {
        match self.command {
            Command::Migrate => {
                let pool = db::create_pool(config).await?;
                db::run_migrations(&pool).await?;
            }
            Command::Health => {
                let pool = db::create_pool(config).await?;
                if !db::check_health(&pool).await {
                    bail!("database health check failed");
                }
                info!("database healthy");
            }
            Command::List { resource, query } => {
                let state = AppState::new(config).await?;
                let params = ParamBag::from_query_str(query.as_deref().unwrap_or_default());
                let response = list(&state, resource, &params).await?;
                let body = serde_json::to_string_pretty(&response)
                    .context("failed to serialize listing")?;
                println!("{body}");
            }
            Command::RecomputeRatings { movie } => {
                let state = AppState::new(config).await?;
                let ids = match movie {
                    Some(raw) => vec![parse_id(&raw)?],
                    None => state.movies().all_ids().await?,
                };
                let mut updated = 0usize;
                for id in ids {
                    if state.movies().recompute_rating(id).await? {
                        updated += 1;
                    } else {
                        warn!(movie = %id, "movie not found, skipped");
                    }
                }
                info!(updated, "rating aggregates recomputed");
            }
        }
        Ok(())
    }
}

async fn list(state: &AppState, resource: Resource, params: &ParamBag) -> Result<ApiResponse> {
    let response = match resource {
        Resource::Movies => state.movies().list(params).await,
        Resource::Comments => state.comments().list(None, params).await,
        Resource::Actors => state.actors().list(params).await,
        Resource::Categories => state.categories().list(params).await,
        Resource::Users => state.users().list(params).await,
        Resource::BlogCategories => state.blog_categories().list(params).await,
        Resource::BlogPosts => state.blog_posts().list(params).await,
        Resource::BlogComments => state.blog_comments().list(params).await,
    };
    Ok(response?)
}
