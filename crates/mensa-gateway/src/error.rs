//! Error types for the Gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mensa_core::FetchError;
use thiserror::Error;

/// Gateway error type
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Turn did not finish within {0}s")]
    TurnTimeout(u64),

    #[error("Provider client error: {0}")]
    Provider(#[from] FetchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::TurnTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Provider(_) => StatusCode::BAD_GATEWAY,
            GatewayError::InvalidConfig(_)
            | GatewayError::Io(_)
            | GatewayError::Serialization(_)
            | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Result type for Gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
