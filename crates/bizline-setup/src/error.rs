//! Error types for the account-linking server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, SetupError>;

/// Errors that end a linking handshake.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// The loopback listener could not be bound.
    #[error("Failed to bind setup server: {0}")]
    Bind(#[source] std::io::Error),

    /// A linking page template failed to render.
    #[error("Failed to render setup page: {0}")]
    Render(#[from] minijinja::Error),

    /// The HTTP server stopped on its own.
    #[error("Setup server error: {0}")]
    Server(String),

    /// The caller cancelled the handshake.
    #[error("account setup cancelled")]
    Cancelled,

    /// The browser finished without a saved account.
    #[error("account setup was closed before an account was saved")]
    Aborted,
}

impl SetupError {
    /// Whether the handshake was abandoned rather than broken.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SetupError::Cancelled | SetupError::Aborted)
    }
}

/// Request-level rejections.
///
/// Only these use a non-200 status; application failures travel in the
/// response body as `{success: false, error}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body or missing field.
    #[error("{0}")]
    Validation(String),

    /// Handshake token missing or wrong.
    #[error("invalid or missing setup token")]
    Forbidden,

    /// Page rendering failed.
    #[error("{0}")]
    Internal(String),

    /// The server stopped while the request was in flight.
    #[error("setup server is shutting down")]
    Unavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
