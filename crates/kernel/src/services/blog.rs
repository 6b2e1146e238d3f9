//! Blog categories, posts and post comments.

use serde_json::{Map, Value};
use tracing::info;

use super::collection::Collection;
use super::comment::COMMENT_AUTHOR;
use crate::error::AppResult;
use crate::models::blog_category::{self, BLOG_CATEGORIES};
use crate::models::blog_comment::{self, BLOG_COMMENTS, BLOG_FIELD};
use crate::models::blog_post::{self, BLOG_POSTS};
use crate::models::{Mode, Principal, body_object, parse_id};
use crate::query::{ParamBag, Predicate, Projection};
use crate::response::ApiResponse;
use crate::store::DocumentUpdate;

/// Fields shown per post in the comment ranking.
const STATS_FIELDS: &[&str] = &["title", "body", "coverImage", "createdAt"];

#[derive(Clone)]
pub struct BlogCategoryService {
    categories: Collection,
}

impl BlogCategoryService {
    pub fn new(categories: Collection) -> Self {
        Self { categories }
    }

    pub async fn list(&self, params: &ParamBag) -> AppResult<ApiResponse> {
        let rows = self.categories.query(params, Vec::new()).await?;
        Ok(ApiResponse::new(
            "Blog categories retrieved",
            BLOG_CATEGORIES.plural,
            Value::Array(rows),
        ))
    }

    pub async fn get(&self, id: &str) -> AppResult<ApiResponse> {
        let doc = self.categories.get(parse_id(id)?).await?;
        Ok(ApiResponse::new(
            "Category retrieved",
            "category",
            doc.to_json(),
        ))
    }

    pub async fn create(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let fields = blog_category::validate(body_object(body)?, Mode::Create)?;
        let doc = self.categories.create(fields).await?;
        Ok(ApiResponse::new("Category created successfully", "category", doc.to_json()).created())
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        body: &Value,
    ) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let id = parse_id(id)?;
        let fields = blog_category::validate(body_object(body)?, Mode::Update)?;
        let doc = self
            .categories
            .update(id, DocumentUpdate::merge(fields))
            .await?;
        Ok(ApiResponse::new(
            "Blog category updated successfully",
            "category",
            doc.to_json(),
        ))
    }

    /// Posts keep the dangling category id.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        self.categories.delete(parse_id(id)?).await?;
        Ok(ApiResponse::message_only("Blog category deleted successfully"))
    }

    pub async fn toggle_active(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let doc = self.categories.toggle_active(parse_id(id)?).await?;
        Ok(ApiResponse::new(
            "Category active status updated successfully",
            "category",
            doc.to_json(),
        ))
    }
}

#[derive(Clone)]
pub struct BlogPostService {
    posts: Collection,
    comments: Collection,
    categories: Collection,
}

impl BlogPostService {
    pub fn new(posts: Collection, comments: Collection, categories: Collection) -> Self {
        Self {
            posts,
            comments,
            categories,
        }
    }

    pub async fn list(&self, params: &ParamBag) -> AppResult<ApiResponse> {
        let rows = self.posts.query(params, Vec::new()).await?;
        Ok(ApiResponse::new(
            "Blog posts retrieved",
            BLOG_POSTS.plural,
            Value::Array(rows),
        ))
    }

    /// One post with its comments embedded.
    pub async fn get(&self, id: &str) -> AppResult<ApiResponse> {
        let id = parse_id(id)?;
        let doc = self.posts.get(id).await?;
        let mut row = doc.to_json();

        let mut comments = Vec::new();
        for comment in self
            .comments
            .find_all(vec![Predicate::field_eq(BLOG_FIELD, id.to_string())])
            .await?
        {
            let mut rendered = comment.to_json();
            self.comments.populate(&mut rendered, &[COMMENT_AUTHOR]).await?;
            comments.push(rendered);
        }
        if let Some(obj) = row.as_object_mut() {
            obj.insert(BLOG_COMMENTS.plural.to_string(), Value::Array(comments));
        }

        Ok(ApiResponse::new(
            "Post retrieved successfully",
            BLOG_POSTS.singular,
            row,
        ))
    }

    pub async fn create(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let fields = blog_post::validate(body_object(body)?, Mode::Create)?;
        self.check_category(&fields).await?;
        let doc = self.posts.create(fields).await?;
        Ok(
            ApiResponse::new("Post created successfully", BLOG_POSTS.singular, doc.to_json())
                .created(),
        )
    }

    /// A new `tags` list replaces the old one.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        body: &Value,
    ) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let id = parse_id(id)?;
        let fields = blog_post::validate(body_object(body)?, Mode::Update)?;
        self.check_category(&fields).await?;
        let doc = self.posts.update(id, DocumentUpdate::merge(fields)).await?;
        Ok(ApiResponse::new(
            "Post updated successfully",
            BLOG_POSTS.singular,
            doc.to_json(),
        ))
    }

    /// Delete a post with its comments.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let id = parse_id(id)?;
        self.posts.delete(id).await?;
        let comments = self.comments.delete_referencing(BLOG_FIELD, id).await?;
        info!(post = %id, comments, "post removed");
        Ok(ApiResponse::message_only("Post deleted successfully"))
    }

    pub async fn toggle_active(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let doc = self.posts.toggle_active(parse_id(id)?).await?;
        Ok(ApiResponse::new(
            "Post active status updated successfully",
            BLOG_POSTS.singular,
            doc.to_json(),
        ))
    }

    pub async fn toggle_featured(
        &self,
        principal: &Principal,
        id: &str,
    ) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let doc = self.posts.toggle_flag(parse_id(id)?, "isFeatured").await?;
        Ok(ApiResponse::new(
            "Post featured status updated successfully",
            BLOG_POSTS.singular,
            doc.to_json(),
        ))
    }

    /// Posts ranked by number of comments, most discussed first.
    pub async fn comment_stats(&self) -> AppResult<ApiResponse> {
        let projection = Projection::Only(STATS_FIELDS.iter().map(|s| s.to_string()).collect());
        let rows = self
            .posts
            .ranked_by_references(&BLOG_COMMENTS, BLOG_FIELD, "comments_count", &projection)
            .await?;
        Ok(ApiResponse::new(
            "Blog Comments stats retrieved successfully",
            "stats",
            Value::Array(rows),
        ))
    }

    async fn check_category(&self, fields: &Map<String, Value>) -> AppResult<()> {
        if let Some(category) = fields.get("category").and_then(Value::as_str) {
            self.categories.get(parse_id(category)?).await?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct BlogCommentService {
    comments: Collection,
    posts: Collection,
}

impl BlogCommentService {
    pub fn new(comments: Collection, posts: Collection) -> Self {
        Self { comments, posts }
    }

    pub async fn list(&self, params: &ParamBag) -> AppResult<ApiResponse> {
        let mut rows = self.comments.query(params, Vec::new()).await?;
        for row in &mut rows {
            self.comments.populate(row, &[COMMENT_AUTHOR]).await?;
        }
        Ok(ApiResponse::new(
            "Comments retrieved successfully",
            BLOG_COMMENTS.plural,
            Value::Array(rows),
        ))
    }

    pub async fn get(&self, id: &str) -> AppResult<ApiResponse> {
        let doc = self.comments.get(parse_id(id)?).await?;
        let mut row = doc.to_json();
        self.comments.populate(&mut row, &[COMMENT_AUTHOR]).await?;
        Ok(ApiResponse::new(
            "Comment retrieved successfully",
            BLOG_COMMENTS.singular,
            row,
        ))
    }

    /// Comment on an existing post as the caller.
    pub async fn create(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        let mut fields = blog_comment::validate_create(body_object(body)?)?;
        if let Some(blog) = fields.get(BLOG_FIELD).and_then(Value::as_str) {
            self.posts.get(parse_id(blog)?).await?;
        }
        fields.insert("user".to_string(), Value::String(principal.id.to_string()));

        let doc = self.comments.create(fields).await?;
        Ok(ApiResponse::new(
            "Comment created successfully",
            BLOG_COMMENTS.singular,
            doc.to_json(),
        )
        .created())
    }

    /// Author or admin only.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        body: &Value,
    ) -> AppResult<ApiResponse> {
        let id = parse_id(id)?;
        let fields = blog_comment::validate_update(body_object(body)?)?;
        let existing = self.comments.get(id).await?;
        principal.require_owner_or_admin(existing.get_uuid("user"))?;

        let doc = self.comments.update(id, DocumentUpdate::merge(fields)).await?;
        Ok(ApiResponse::new(
            "Comment updated successfully",
            BLOG_COMMENTS.singular,
            doc.to_json(),
        ))
    }

    /// Author or admin only.
    pub async fn delete(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        let id = parse_id(id)?;
        let existing = self.comments.get(id).await?;
        principal.require_owner_or_admin(existing.get_uuid("user"))?;
        self.comments.delete(id).await?;
        Ok(ApiResponse::message_only("Comment deleted successfully"))
    }

    /// Hide or show a comment. Admin only.
    pub async fn toggle_active(&self, principal: &Principal, id: &str) -> AppResult<ApiResponse> {
        principal.require_admin()?;
        let doc = self.comments.toggle_active(parse_id(id)?).await?;
        Ok(ApiResponse::new(
            "Comment status changed successfully",
            BLOG_COMMENTS.singular,
            doc.to_json(),
        ))
    }
}
