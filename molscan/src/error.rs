use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ApiResponse;

/// Crate error type.
///
/// Cloneable so one failed recognition can be handed to every caller that
/// waited on it; foreign error sources are kept behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum MolscanError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No image data submitted!")]
    NoImageData,

    #[error("Unsupported image encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Unknown data encoding: {0}")]
    UnknownEncoding(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Image fetch failed: {0}")]
    Fetch(#[source] Arc<reqwest::Error>),

    #[error("JSON error: {0}")]
    Json(#[source] Arc<serde_json::Error>),

    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("Recognition failed: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl MolscanError {
    /// True for errors caused by the submitted data rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MolscanError::NotFound(_)
                | MolscanError::Validation(_)
                | MolscanError::NoImageData
                | MolscanError::UnsupportedEncoding(_)
                | MolscanError::UnknownEncoding(_)
                | MolscanError::InvalidBase64(_)
        )
    }
}

impl From<reqwest::Error> for MolscanError {
    fn from(e: reqwest::Error) -> Self {
        MolscanError::Fetch(Arc::new(e))
    }
}

impl From<serde_json::Error> for MolscanError {
    fn from(e: serde_json::Error) -> Self {
        MolscanError::Json(Arc::new(e))
    }
}

impl From<std::io::Error> for MolscanError {
    fn from(e: std::io::Error) -> Self {
        MolscanError::Io(Arc::new(e))
    }
}

impl IntoResponse for MolscanError {
    fn into_response(self) -> Response {
        ApiResponse::<()>::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, MolscanError>;
