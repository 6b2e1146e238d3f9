//! User profiles and the authenticated principal.
//!
//! Accounts here are profiles only. Password handling lives with the auth
//! collaborator and is rejected on every profile write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::resource::{Length, Validator};
use crate::error::{AppError, AppResult};
use crate::query::{CollectionSchema, FieldKind, FieldSpec};

pub const USERS: CollectionSchema = CollectionSchema {
    collection: "users",
    plural: "users",
    singular: "user",
    label: "User",
    fields: &[
        FieldSpec::new("first_name", FieldKind::Text),
        FieldSpec::new("last_name", FieldKind::Text),
        FieldSpec::new("middle_name", FieldKind::Text),
        FieldSpec::new("email", FieldKind::Text),
        FieldSpec::new("username", FieldKind::Text),
        FieldSpec::new("role", FieldKind::Text),
    ],
};

pub const DEFAULT_AVATAR: &str = "default.jpg";

const USERNAME: Length = Length::new(
    3,
    30,
    "Username must have at least 3 characters",
    "Username can not be more than 30 characters",
);

const PASSWORD_FIELDS: &[&str] = &["password", "confirm_password"];

/// Account role as supplied by the auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn user(id: Uuid) -> Self {
        Self { id, role: Role::User }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Gate for admin-only operations.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::admin_only())
        }
    }

    /// Gate for operations on a record owned by `owner`.
    pub fn require_owner_or_admin(&self, owner: Option<Uuid>) -> AppResult<()> {
        if self.is_admin() || owner == Some(self.id) {
            Ok(())
        } else {
            Err(AppError::admin_only())
        }
    }
}

/// Clean fields for a new profile.
pub fn validate_create(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    Validator::create(input)
        .forbid(
            PASSWORD_FIELDS,
            "Passwords are managed by the authentication service",
        )
        .text("first_name", Some("First name is required"), None)
        .text("last_name", Some("Last name is required"), None)
        .text("middle_name", None, None)
        .email("email", Some("Email is required"), "Please provide a valid Email Address")
        .text("username", Some("Username is required"), Some(USERNAME))
        .text("avatar", None, None)
        .one_of("role", &["user", "admin"], "You can only be an admin or a user")
        .default_value("middle_name", Value::Null)
        .default_value("avatar", DEFAULT_AVATAR)
        .default_value("role", Role::User.as_str())
        .finish()
}

/// Fields a user may change on their own profile.
pub fn validate_update_me(input: &Map<String, Value>) -> AppResult<Map<String, Value>> {
    Validator::update(input)
        .forbid(
            PASSWORD_FIELDS,
            "You can not update password with this request",
        )
        .text("first_name", Some("First name is required"), None)
        .text("last_name", Some("Last name is required"), None)
        .text("middle_name", None, None)
        .email("email", Some("Email is required"), "Please provide a valid Email Address")
        .text("username", Some("Username is required"), Some(USERNAME))
        .text("avatar", None, None)
        .finish()
}
