//! User profiles.

use serde_json::Value;
use tracing::info;

use super::collection::Collection;
use crate::error::AppResult;
use crate::models::comment::COMMENTS;
use crate::models::follower::{FOLLOWER_FIELD, USER_FIELD};
use crate::models::user::{self, USERS};
use crate::models::{Principal, body_object, parse_id};
use crate::query::{ParamBag, Projection};
use crate::response::ApiResponse;
use crate::store::DocumentUpdate;

const STATS_FIELDS: &[&str] = &["first_name", "last_name", "username"];

#[derive(Clone)]
pub struct UserService {
    users: Collection,
    followers: Collection,
}

impl UserService {
    pub fn new(users: Collection, followers: Collection) -> Self {
        Self { users, followers }
    }

    pub async fn list(&self, params: &ParamBag) -> AppResult<ApiResponse> {
        let rows = self.users.query(params, Vec::new()).await?;
        Ok(ApiResponse::new(
            "Users retrieved successfully",
            USERS.plural,
            Value::Array(rows),
        ))
    }

    pub async fn get(&self, id: &str) -> AppResult<ApiResponse> {
        let doc = self.users.get(parse_id(id)?).await?;
        Ok(ApiResponse::new("User retrieved", USERS.singular, doc.to_json()))
    }

    /// The caller's own profile.
    pub async fn me(&self, principal: &Principal) -> AppResult<ApiResponse> {
        let doc = self.users.get(principal.id).await?;
        Ok(ApiResponse::new("User retrieved", USERS.singular, doc.to_json()))
    }

    /// Create a profile. Accounts with credentials are created by the auth
    /// collaborator; this is the admin path for profile-only records.
    pub async fn create(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let fields = user::validate_create(body_object(body)?)?;
        let doc = self.users.create(fields).await?;
        Ok(ApiResponse::new("User created successfully", USERS.singular, doc.to_json()).created())
    }

    /// Update the caller's own profile.
    pub async fn update_me(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        let fields = user::validate_update_me(body_object(body)?)?;
        let doc = self
            .users
            .update(principal.id, DocumentUpdate::merge(fields))
            .await?;
        Ok(ApiResponse::new(
            "Data updated successfully",
            USERS.singular,
            doc.to_json(),
        ))
    }

    /// Delete a user and every follow edge they take part in.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let id = parse_id(id)?;
        self.users.delete(id).await?;

        let mut edges = 0;
        for field in [USER_FIELD, FOLLOWER_FIELD] {
            edges += self.followers.delete_referencing(field, id).await?;
        }
        info!(user = %id, edges, "user removed");

        Ok(ApiResponse::message_only("User deleted successfully"))
    }

    /// Users ranked by how many comments they have written.
    pub async fn comment_stats(&self) -> AppResult<ApiResponse> {
        let projection = Projection::Only(STATS_FIELDS.iter().map(|s| s.to_string()).collect());
        let rows = self
            .users
            .ranked_by_references(&COMMENTS, "user", "user_comments_count", &projection)
            .await?;
        Ok(ApiResponse::new(
            "Stats retrieved successfully",
            "stats",
            Value::Array(rows),
        ))
    }
}
