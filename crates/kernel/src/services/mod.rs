//! Resource services.
//!
//! Each service validates input, checks the caller's permissions and
//! composes [`collection::Collection`]s. Writes that touch movie ratings go
//! through [`rating::RatingAggregator`].

pub mod blog;
pub mod catalog;
pub mod collection;
pub mod comment;
pub mod movie;
pub mod rating;
pub mod social;
pub mod user;

pub use blog::{BlogCategoryService, BlogCommentService, BlogPostService};
pub use catalog::{ActorService, CategoryService};
pub use collection::{Collection, Populate};
pub use comment::CommentService;
pub use movie::MovieService;
pub use rating::RatingAggregator;
pub use social::SocialService;
pub use user::UserService;
