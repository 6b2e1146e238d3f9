//! Uniform response envelope: `{ message, data: { <resource>: ... } }`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,

    #[serde(skip)]
    pub status: u16,
}

impl ApiResponse {
    /// `{ message, data: { key: value } }` with status 200.
    pub fn new(message: impl Into<String>, key: &str, value: Value) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), value);
        Self {
            message: message.into(),
            data: Some(data),
            status: 200,
        }
    }

    /// Body without a data section.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            status: 200,
        }
    }

    /// Add another entry to the data section.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value);
        self
    }

    /// Mark as a 201 Created response.
    pub fn created(mut self) -> Self {
        self.status = 201;
        self
    }

    /// Fetch an entry of the data section.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}
