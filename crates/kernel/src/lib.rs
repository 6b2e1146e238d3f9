//! Marquee Kernel Library
//!
//! Movie catalog services: client-driven listing queries over an
//! allow-listed field set, and movie rating aggregates kept consistent
//! under concurrent comment writes.
//! The maintenance entry point is the `marquee` binary.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod response;
pub mod services;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
