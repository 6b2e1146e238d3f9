//! Application error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Application errors.
///
/// Every variant carries enough classification for the boundary layer to
/// pick an HTTP status; the kernel itself never talks HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// A missing relation rather than a missing record.
    #[error("{0}")]
    Missing(String),

    #[error("{0}")]
    MalformedQuery(String),

    #[error("Invalid input data: {}", .0.join(". "))]
    ValidationFailed(Vec<String>),

    #[error("Duplicate field value: {value}. Please use another value")]
    Duplicate { field: String, value: String },

    /// A uniqueness rule enforced by a service rather than an index.
    #[error("{0}")]
    Conflict(String),

    #[error("You are not logged in! Please log in to get access")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("database error")]
    Database(#[source] sqlx::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a missing record.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a single validation message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationFailed(vec![message.into()])
    }

    /// The admin-only gate used by catalog writes.
    pub fn admin_only() -> Self {
        Self::Forbidden("You do not have permission to perform this action".to_string())
    }

    /// HTTP status the boundary layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } | AppError::Missing(_) => StatusCode::NOT_FOUND,
            AppError::MalformedQuery(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Duplicate { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the message is safe to show to clients as-is.
    pub fn is_operational(&self) -> bool {
        !matches!(self, AppError::Database(_) | AppError::Internal(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // 23505 = unique_violation
        if let sqlx::Error::Database(ref db) = err
            && db.code().as_deref() == Some("23505")
        {
            // Unique indexes are named uq_<collection>_<field>.
            let field = db
                .constraint()
                .and_then(|c| c.rsplit('_').next())
                .unwrap_or("unique")
                .to_string();
            // Detail reads "Key (expr)=(value) already exists."
            let value = db
                .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                .and_then(|pg| pg.detail())
                .and_then(|d| d.split_once(")=(").map(|(_, rest)| rest))
                .and_then(|rest| rest.split_once(") already").map(|(v, _)| v.to_string()))
                .unwrap_or_else(|| field.clone());
            return AppError::Duplicate { field, value };
        }
        AppError::Database(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (label, message) = if self.is_operational() {
            ("fail", self.to_string())
        } else {
            match &self {
                AppError::Internal(e) => tracing::error!(error = %e, "internal server error"),
                AppError::Database(e) => tracing::error!(error = %e, "database error"),
                _ => {}
            }
            ("error", "Something went very wrong".to_string())
        };

        (status, Json(json!({ "status": label, "message": message }))).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
