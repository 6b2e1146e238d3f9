//! Actors and movie categories.

use serde_json::Value;

use super::collection::Collection;
use crate::error::AppResult;
use crate::models::actor::{self, ACTORS};
use crate::models::category::{self, CATEGORIES};
use crate::models::movie::MOVIES;
use crate::models::{Mode, Principal, body_object, parse_id};
use crate::query::{ParamBag, Projection};
use crate::response::ApiResponse;
use crate::store::DocumentUpdate;

const MOVIES_COUNT: &str = "movies_count";

#[derive(Clone)]
pub struct ActorService {
    actors: Collection,
}

impl ActorService {
    pub fn new(actors: Collection) -> Self {
        Self { actors }
    }

    pub async fn list(&self, params: &ParamBag) -> AppResult<ApiResponse> {
        let rows = self.actors.query(params, Vec::new()).await?;
        Ok(ApiResponse::new(
            "Actors retrieved successfully",
            ACTORS.plural,
            Value::Array(rows),
        ))
    }

    pub async fn get(&self, id: &str) -> AppResult<ApiResponse> {
        let doc = self.actors.get(parse_id(id)?).await?;
        Ok(ApiResponse::new(
            "Actor retrieved successfully",
            ACTORS.singular,
            doc.to_json(),
        ))
    }

    pub async fn create(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let fields = actor::validate_create(body_object(body)?)?;
        let doc = self.actors.create(fields).await?;
        Ok(
            ApiResponse::new("Actor created successfully", ACTORS.singular, doc.to_json())
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
        let fields = actor::validate_update(body_object(body)?)?;
        let doc = self.actors.update(id, DocumentUpdate::merge(fields)).await?;
        Ok(ApiResponse::new(
            "Actor updated successfully",
            ACTORS.singular,
            doc.to_json(),
        ))
    }

    /// Movies keep the dangling id; it renders as `null` when expanded.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        self.actors.delete(parse_id(id)?).await?;
        Ok(ApiResponse::message_only("Actor deleted successfully"))
    }

    /// Actors ranked by the number of movies they appear in.
    pub async fn stats(&self) -> AppResult<ApiResponse> {
        let rows = self
            .actors
            .ranked_by_references(&MOVIES, "actor", MOVIES_COUNT, &Projection::Default)
            .await?;
        Ok(ApiResponse::new(
            "Stats retrieved successfully",
            "stats",
            Value::Array(rows),
        ))
    }
}

#[derive(Clone)]
pub struct CategoryService {
    categories: Collection,
}

impl CategoryService {
    pub fn new(categories: Collection) -> Self {
        Self { categories }
    }

    pub async fn list(&self, params: &ParamBag) -> AppResult<ApiResponse> {
        let rows = self.categories.query(params, Vec::new()).await?;
        Ok(ApiResponse::new(
            "Categories retrieved",
            CATEGORIES.plural,
            Value::Array(rows),
        ))
    }

    pub async fn get(&self, id: &str) -> AppResult<ApiResponse> {
        let doc = self.categories.get(parse_id(id)?).await?;
        Ok(ApiResponse::new(
            "Category retrieved",
            CATEGORIES.singular,
            doc.to_json(),
        ))
    }

    pub async fn create(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let fields = category::validate(body_object(body)?, Mode::Create)?;
        let doc = self.categories.create(fields).await?;
        Ok(ApiResponse::new(
            "Category created successfully",
            CATEGORIES.singular,
            doc.to_json(),
        )
        .created())
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        body: &Value,
    ) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let id = parse_id(id)?;
        let fields = category::validate(body_object(body)?, Mode::Update)?;
        let doc = self
            .categories
            .update(id, DocumentUpdate::merge(fields))
            .await?;
        Ok(ApiResponse::new(
            "Category updated successfully",
            CATEGORIES.singular,
            doc.to_json(),
        ))
    }

    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        self.categories.delete(parse_id(id)?).await?;
        Ok(ApiResponse::message_only("Category deleted successfully"))
    }

    pub async fn deactivate(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let doc = self
            .categories
            .update(parse_id(id)?, DocumentUpdate::new().active(false))
            .await?;
        Ok(ApiResponse::new(
            "Category deactivated successfully",
            CATEGORIES.singular,
            doc.to_json(),
        ))
    }

    pub async fn toggle_active(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let doc = self.categories.toggle_active(parse_id(id)?).await?;
        Ok(ApiResponse::new(
            "Category status updated successfully",
            CATEGORIES.singular,
            doc.to_json(),
        ))
    }

    /// Categories ranked by the number of movies filed under them.
    pub async fn stats(&self) -> AppResult<ApiResponse> {
        let rows = self
            .categories
            .ranked_by_references(&MOVIES, "category", MOVIES_COUNT, &Projection::Default)
            .await?;
        Ok(ApiResponse::new(
            "Category stats retrieved successfully",
            "stats",
            Value::Array(rows),
        ))
    }
}
