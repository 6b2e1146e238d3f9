//! Resource models: collection schemas and input validation.

pub mod activity;
pub mod actor;
pub mod blog_category;
pub mod blog_comment;
pub mod blog_post;
pub mod category;
pub mod comment;
pub mod follower;
pub mod movie;
pub mod resource;
pub mod user;

pub use resource::{Mode, Validator, body_object, parse_id};
pub use user::{Principal, Role};
