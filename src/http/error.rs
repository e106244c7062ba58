//! Error responses for the HTTP handlers
//!
//! Bodies are plain text; clients of the ingestion endpoint match on the
//! status code and show the message as is.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

const INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// Handler error carrying the status and the client-facing message
#[derive(Debug, Error)]
#[error("[{}] {}", .status.as_u16(), .message)]
pub struct ApiError {
    status: StatusCode,
    message: String,

    /// Logged for 5xx responses, never sent to the client
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach the underlying error for the server log
    #[must_use]
    pub fn with_source(mut self, source: impl fmt::Display) -> Self {
        self.detail = Some(source.to_string());
        self
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 Internal Server Error with the generic message
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                message = %self.message,
                error = self.detail.as_deref().unwrap_or("none"),
                "Internal server error"
            );
        }

        (self.status, self.message).into_response()
    }
}
