//! Error types for Repogate
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse`. Failures in the interactive
//! login flow never surface to the browser as error pages; they
//! resolve to a redirect back to the home route.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// OAuth `state` parameter did not match the browser's state cookie
    #[error("state mismatch")]
    StateMismatch,

    /// No authenticated session on a protected route
    #[error("authentication required")]
    Unauthorized,

    /// Upstream answered but the response was unusable
    #[error("upstream error: {0}")]
    Upstream(String),

    /// HTTP client error reaching the provider
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Auth-flow failures (state mismatch, missing token, upstream
    /// trouble) redirect to `/`; the user retries by logging in again.
    /// Everything else is a generic 500 with no detail leaked.
    fn into_response(self) -> Response {
        use axum::Json;

        match &self {
            AppError::StateMismatch | AppError::Unauthorized => {
                tracing::debug!(error = %self, "redirecting to home");
                Redirect::to("/").into_response()
            }
            AppError::Upstream(_) | AppError::HttpClient(_) => {
                tracing::error!(error = %self, "upstream call failed; redirecting to home");
                Redirect::to("/").into_response()
            }
            AppError::Config(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "internal error");
                let body = Json(serde_json::json!({
                    "error": "internal server error",
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
