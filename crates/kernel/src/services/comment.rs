//! Movie comments and their ratings.
//!
//! Every write that changes the set of ratings for a movie goes through
//! [`RatingAggregator::apply`].

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use super::collection::{Collection, Populate};
use super::rating::RatingAggregator;
use crate::error::{AppError, AppResult};
use crate::models::comment::{self, COMMENTS, MOVIE_FIELD, RATING_FIELD};
use crate::models::user::USERS;
use crate::models::{Principal, body_object, parse_id};
use crate::query::{ParamBag, Predicate};
use crate::response::ApiResponse;
use crate::store::DocumentUpdate;

/// Author summary embedded in rendered comments.
pub const COMMENT_AUTHOR: Populate = Populate {
    key: "user",
    schema: &USERS,
    select: &["first_name", "last_name"],
};

#[derive(Clone)]
pub struct CommentService {
    comments: Collection,
    movies: Collection,
    activities: Collection,
    ratings: Arc<RatingAggregator>,
}

impl CommentService {
    pub fn new(
        comments: Collection,
        movies: Collection,
        activities: Collection,
        ratings: Arc<RatingAggregator>,
    ) -> Self {
        Self {
            comments,
            movies,
            activities,
            ratings,
        }
    }

    /// List comments, optionally scoped to one movie.
    pub async fn list(&self, movie_id: Option<&str>, params: &ParamBag) -> AppResult<ApiResponse> {
        let base = match movie_id {
            Some(raw) => vec![Predicate::field_eq(MOVIE_FIELD, parse_id(raw)?.to_string())],
            None => Vec::new(),
        };
        let mut rows = self.comments.query(params, base).await?;
        for row in &mut rows {
            self.comments.populate(row, &[COMMENT_AUTHOR]).await?;
        }
        Ok(ApiResponse::new(
            "Comments retrieved successfully",
            COMMENTS.plural,
            Value::Array(rows),
        ))
    }

    pub async fn get(&self, id: &str) -> AppResult<ApiResponse> {
        let doc = self.comments.get(parse_id(id)?).await?;
        let mut row = doc.to_json();
        self.comments.populate(&mut row, &[COMMENT_AUTHOR]).await?;
        Ok(ApiResponse::new(
            "Comment retrieved successfully",
            COMMENTS.singular,
            row,
        ))
    }

    /// Create a comment for an existing movie and record the activity.
    pub async fn create(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        let mut fields = comment::validate_create(body_object(body)?)?;
        let movie_id = fields
            .get(MOVIE_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::invalid("Comment has to belong to a movie"))?;
        fields.insert("user".to_string(), Value::String(principal.id.to_string()));

        // The movie check and both writes share the movie's lock, so a
        // concurrent movie delete cannot leave an orphan behind.
        let doc = self
            .ratings
            .apply(movie_id, || async {
                self.movies.get(movie_id).await?;
                let doc = self.comments.create(fields).await?;

                let mut activity = serde_json::Map::new();
                for key in ["comment", "user", MOVIE_FIELD] {
                    if let Some(value) = doc.get(key) {
                        activity.insert(key.to_string(), value.clone());
                    }
                }
                self.activities.create(activity).await?;
                Ok::<_, AppError>(doc)
            })
            .await?;

        Ok(
            ApiResponse::new("Comment created successfully", COMMENTS.singular, doc.to_json())
                .created(),
        )
    }

    /// Update comment text and/or rating. Author or admin only.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        body: &Value,
    ) -> AppResult<ApiResponse> {
        let id = parse_id(id)?;
        let fields = comment::validate_update(body_object(body)?)?;
        let existing = self.comments.get(id).await?;
        principal.require_owner_or_admin(existing.get_uuid("user"))?;

        let rating_changed = fields.contains_key(RATING_FIELD);
        let update = DocumentUpdate::merge(fields);

        let doc = match existing.get_uuid(MOVIE_FIELD) {
            Some(movie_id) if rating_changed => {
                self.ratings
                    .apply(movie_id, || self.comments.update(id, update))
                    .await?
            }
            _ => self.comments.update(id, update).await?,
        };

        Ok(ApiResponse::new(
            "Comment updated successfully",
            COMMENTS.singular,
            doc.to_json(),
        ))
    }

    /// Delete a comment. Author or admin only.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        let id = parse_id(id)?;
        let existing = self.comments.get(id).await?;
        principal.require_owner_or_admin(existing.get_uuid("user"))?;

        match existing.get_uuid(MOVIE_FIELD) {
            Some(movie_id) => {
                self.ratings
                    .apply(movie_id, || self.comments.delete(id))
                    .await?;
            }
            None => {
                self.comments.delete(id).await?;
            }
        }

        Ok(ApiResponse::message_only("Comment deleted successfully"))
    }

    /// The comments collection, for services that embed comments.
    pub fn collection(&self) -> &Collection {
        &self.comments
    }
}
