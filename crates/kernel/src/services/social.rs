//! Follow edges and the activity feed built on them.

use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use super::collection::{Collection, Populate};
use crate::error::{AppError, AppResult};
use crate::models::activity::ACTIVITIES;
use crate::models::follower::{FOLLOWER_FIELD, FOLLOWERS, USER_FIELD};
use crate::models::movie::MOVIES;
use crate::models::user::USERS;
use crate::models::{Principal, body_object, parse_id};
use crate::query::Predicate;
use crate::response::ApiResponse;

const PROFILE: &[&str] = &["first_name", "last_name", "username"];

const FOLLOWER_PROFILE: Populate = Populate {
    key: FOLLOWER_FIELD,
    schema: &USERS,
    select: PROFILE,
};

const FOLLOWED_PROFILE: Populate = Populate {
    key: USER_FIELD,
    schema: &USERS,
    select: PROFILE,
};

const ACTIVITY_REFS: &[Populate] = &[
    FOLLOWED_PROFILE,
    Populate {
        key: "movie",
        schema: &MOVIES,
        select: &["name", "summary"],
    },
];

#[derive(Clone)]
pub struct SocialService {
    followers: Collection,
    users: Collection,
    activities: Collection,
    feed_max_items: u64,
}

impl SocialService {
    pub fn new(
        followers: Collection,
        users: Collection,
        activities: Collection,
        feed_max_items: u64,
    ) -> Self {
        Self {
            followers,
            users,
            activities,
            feed_max_items,
        }
    }

    /// Follow the user named by `{ "user": <id> }`.
    pub async fn follow(&self, principal: &Principal, body: &Value) -> AppResult<ApiResponse> {
        let target = body_object(body)?
            .get(USER_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::invalid("A user to follow is required"))?;
        let target = parse_id(target)?;

        if target == principal.id {
            return Err(AppError::Forbidden("You can not follow yourself".to_string()));
        }
        self.users.get(target).await?;
        if self.edge(target, principal.id).await?.is_some() {
            return Err(AppError::Conflict(
                "You are already following this user".to_string(),
            ));
        }

        let mut fields = Map::new();
        fields.insert(USER_FIELD.to_string(), Value::String(target.to_string()));
        fields.insert(
            FOLLOWER_FIELD.to_string(),
            Value::String(principal.id.to_string()),
        );
        let doc = self.followers.create(fields).await?;

        Ok(ApiResponse::new(
            "You are following user, cheers",
            FOLLOWERS.singular,
            doc.to_json(),
        )
        .created())
    }

    pub async fn unfollow(&self, principal: &Principal, user_id: &str) -> AppResult<ApiResponse> {
        let target = parse_id(user_id)?;
        let edge = self
            .edge(target, principal.id)
            .await?
            .ok_or_else(|| AppError::Missing("You are not following this user".to_string()))?;
        self.followers.delete(edge).await?;
        info!(user = %target, follower = %principal.id, "unfollowed");
        Ok(ApiResponse::message_only(
            "You have successfully unfollowed user",
        ))
    }

    /// Users following the caller.
    pub async fn followers(&self, principal: &Principal) -> AppResult<ApiResponse> {
        let rows = self
            .edges(USER_FIELD, principal.id, &[FOLLOWER_PROFILE])
            .await?;
        Ok(
            ApiResponse::new("Followers retrieved", "followersLength", Value::from(rows.len()))
                .with(FOLLOWERS.plural, Value::Array(rows)),
        )
    }

    /// Users the caller follows.
    pub async fn following(&self, principal: &Principal) -> AppResult<ApiResponse> {
        let rows = self
            .edges(
                FOLLOWER_FIELD,
                principal.id,
                &[FOLLOWED_PROFILE, FOLLOWER_PROFILE],
            )
            .await?;
        Ok(
            ApiResponse::new("Followings retrieved", "followingLength", Value::from(rows.len()))
                .with("following", Value::Array(rows)),
        )
    }

    /// Activities of everyone the caller follows, newest first.
    pub async fn feed(&self, principal: &Principal) -> AppResult<ApiResponse> {
        let followed = self
            .followers
            .find_all(vec![Predicate::field_eq(
                FOLLOWER_FIELD,
                principal.id.to_string(),
            )])
            .await?;

        let mut entries = Vec::new();
        for edge in &followed {
            let Some(user) = edge.get_uuid(USER_FIELD) else {
                continue;
            };
            entries.extend(
                self.activities
                    .find_newest(
                        vec![Predicate::field_eq("user", user.to_string())],
                        self.feed_max_items,
                    )
                    .await?,
            );
        }
        entries.sort_by(|a, b| b.created.cmp(&a.created).then(a.id.cmp(&b.id)));
        entries.truncate(usize::try_from(self.feed_max_items).unwrap_or(usize::MAX));

        let mut rows = Vec::with_capacity(entries.len());
        for entry in &entries {
            let mut row = entry.to_json();
            self.activities.populate(&mut row, ACTIVITY_REFS).await?;
            rows.push(row);
        }

        Ok(ApiResponse::new(
            "Activity retrieved",
            ACTIVITIES.plural,
            Value::Array(rows),
        ))
    }

    /// Id of the edge where `follower` follows `user`.
    async fn edge(&self, user: Uuid, follower: Uuid) -> AppResult<Option<Uuid>> {
        Ok(self
            .followers
            .find_one(vec![
                Predicate::field_eq(USER_FIELD, user.to_string()),
                Predicate::field_eq(FOLLOWER_FIELD, follower.to_string()),
            ])
            .await?
            .map(|doc| doc.id))
    }

    async fn edges(&self, field: &str, id: Uuid, refs: &[Populate]) -> AppResult<Vec<Value>> {
        let mut rows = Vec::new();
        for doc in self
            .followers
            .find_all(vec![Predicate::field_eq(field, id.to_string())])
            .await?
        {
            let mut row = doc.to_json();
            self.followers.populate(&mut row, refs).await?;
            rows.push(row);
        }
        Ok(rows)
    }
}
