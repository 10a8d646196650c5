//! Domain-specific error types for promptgate

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Main error type for the promptgate pipeline.
///
/// Business-rule denials (no module, score too low, plan required) are NOT
/// errors; they are typed values returned by the export controller. Only
/// caller mistakes and internal failures land here.
#[derive(Error, Debug)]
pub enum PromptGateError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Catalog error: {message}")]
    Catalog { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PromptGateError {
    /// Stable machine-readable code for the wire. Business denials have their
    /// own code family (see `pipeline::export`); these are the failure codes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::Catalog { .. } => "CatalogError",
            Self::Validation { .. } => "ValidationError",
            Self::NotFound { .. } => "NotFound",
            Self::Render { .. } => "RenderError",
            Self::Storage { .. } => "StorageError",
            Self::Serialization { .. } => "SerializationError",
            Self::Internal { .. } => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Config { .. }
            | Self::Catalog { .. }
            | Self::Render { .. }
            | Self::Storage { .. }
            | Self::Serialization { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for PromptGateError {
    fn from(err: anyhow::Error) -> Self {
        PromptGateError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PromptGateError {
    fn from(err: serde_json::Error) -> Self {
        PromptGateError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for PromptGateError {
    fn from(err: toml::de::Error) -> Self {
        PromptGateError::Catalog {
            message: err.to_string(),
        }
    }
}

/// Convert PromptGateError to an HTTP response with a structured body
impl IntoResponse for PromptGateError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        }
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for promptgate operations
pub type Result<T> = std::result::Result<T, PromptGateError>;
