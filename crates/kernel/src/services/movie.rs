//! Movie catalog service.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use super::collection::{Collection, Populate};
use super::comment::COMMENT_AUTHOR;
use super::rating::RatingAggregator;
use crate::error::{AppError, AppResult};
use crate::models::actor::ACTORS;
use crate::models::category::CATEGORIES;
use crate::models::comment::{COMMENTS, MOVIE_FIELD};
use crate::models::movie::{self, MOVIES};
use crate::models::{Principal, body_object, parse_id};
use crate::query::{ParamBag, Predicate, Projection};
use crate::response::ApiResponse;
use crate::store::DocumentUpdate;

const MOVIE_REFS: &[Populate] = &[
    Populate {
        key: "category",
        schema: &CATEGORIES,
        select: &["name"],
    },
    Populate {
        key: "actor",
        schema: &ACTORS,
        select: &["name", "description", "avatar"],
    },
];

/// Fields shown per movie in the comment ranking.
const STATS_FIELDS: &[&str] = &["name", "summary", "slug", "averageRating", "ratingsCount"];

#[derive(Clone)]
pub struct MovieService {
    movies: Collection,
    comments: Collection,
    activities: Collection,
    categories: Collection,
    actors: Collection,
    ratings: Arc<RatingAggregator>,
}

impl MovieService {
    pub fn new(
        movies: Collection,
        comments: Collection,
        activities: Collection,
        categories: Collection,
        actors: Collection,
        ratings: Arc<RatingAggregator>,
    ) -> Self {
        Self {
            movies,
            comments,
            activities,
            categories,
            actors,
            ratings,
        }
    }

    pub async fn list(&self, params: &ParamBag) -> AppResult<ApiResponse> {
        let rows = self.movies.query(params, Vec::new()).await?;
        Ok(ApiResponse::new(
            "Movies retrieved successfully",
            MOVIES.plural,
            Value::Array(rows),
        ))
    }

    /// One movie with its category, actors and comments expanded.
    pub async fn get(&self, id: &str) -> AppResult<ApiResponse> {
        let id = parse_id(id)?;
        let doc = self.movies.get(id).await?;
        let mut row = doc.to_json();
        self.movies.populate(&mut row, MOVIE_REFS).await?;

        let mut comments = Vec::new();
        for comment in self
            .comments
            .find_all(vec![Predicate::field_eq(MOVIE_FIELD, id.to_string())])
            .await?
        {
            let mut rendered = comment.to_json();
            self.comments.populate(&mut rendered, &[COMMENT_AUTHOR]).await?;
            comments.push(rendered);
        }
        if let Some(obj) = row.as_object_mut() {
            obj.insert(COMMENTS.plural.to_string(), Value::Array(comments));
        }

        Ok(ApiResponse::new(
            "Movie retrieved successfully",
            MOVIES.singular,
            row,
        ))
    }

    pub async fn create(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let fields = movie::validate_create(body_object(body)?)?;
        self.check_references(&fields).await?;

        let doc = self.movies.create(fields).await?;
        Ok(
            ApiResponse::new("Movie created successfully", MOVIES.singular, doc.to_json())
                .created(),
        )
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        body: &Value,
    ) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let id = parse_id(id)?;
        let fields = movie::validate_update(body_object(body)?)?;
        self.check_references(&fields).await?;

        let doc = self
            .movies
            .update(id, DocumentUpdate::merge(fields))
            .await?;
        Ok(ApiResponse::new(
            "Movie updated successfully",
            MOVIES.singular,
            doc.to_json(),
        ))
    }

    /// Delete a movie with its comments and activities.
    ///
    /// Runs under the movie's rating lock so no comment write can land
    /// between the delete and the cascade.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let id = parse_id(id)?;

        self.ratings
            .apply(id, || async {
                self.movies.delete(id).await?;
                let comments = self.comments.delete_referencing(MOVIE_FIELD, id).await?;
                let activities = self.activities.delete_referencing(MOVIE_FIELD, id).await?;
                info!(movie = %id, comments, activities, "movie removed");
                Ok::<(), AppError>(())
            })
            .await?;

        Ok(ApiResponse::message_only("Movie deleted successfully"))
    }

    pub async fn toggle_active(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let doc = self.movies.toggle_active(parse_id(id)?).await?;
        Ok(ApiResponse::new(
            "Movie status has successfully updated",
            MOVIES.singular,
            doc.to_json(),
        ))
    }

    pub async fn toggle_featured(
        &self,
        principal: &Principal,
        id: &str,
    ) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let doc = self.movies.toggle_flag(parse_id(id)?, "isFeatured").await?;
        Ok(ApiResponse::new(
            "Movie status has successfully updated",
            MOVIES.singular,
            doc.to_json(),
        ))
    }

    /// Movies ranked by number of comments, most discussed first.
    pub async fn comment_stats(&self) -> AppResult<ApiResponse> {
        let projection = Projection::Only(STATS_FIELDS.iter().map(|s| s.to_string()).collect());
        let rows = self
            .movies
            .ranked_by_references(&COMMENTS, MOVIE_FIELD, "comments_count", &projection)
            .await?;
        Ok(ApiResponse::new(
            "Movie Stats retrieved successfully",
            "stats",
            Value::Array(rows),
        ))
    }

    /// Recompute one movie's rating aggregate from its comments.
    pub async fn recompute_rating(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.ratings.recompute(id).await?.is_some())
    }

    /// Ids of every movie, for bulk maintenance.
    pub async fn all_ids(&self) -> AppResult<Vec<Uuid>> {
        Ok(self
            .movies
            .find_all(Vec::new())
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect())
    }

    /// The category and every actor a movie names must exist.
    async fn check_references(&self, fields: &Map<String, Value>) -> AppResult<()> {
        if let Some(category) = fields.get("category").and_then(Value::as_str) {
            self.categories.get(parse_id(category)?).await?;
        }
        if let Some(actors) = fields.get("actor").and_then(Value::as_array) {
            for actor in actors.iter().filter_map(Value::as_str) {
                self.actors.get(parse_id(actor)?).await?;
            }
        }
        Ok(())
    }
}
