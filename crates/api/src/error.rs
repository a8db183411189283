//! Request error types and their HTTP mapping

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use image_classifier::ClassifierError;
use pixel_tensor::DecodeError;
use thiserror::Error;
use tracing::{error, warn};

/// Body returned when the request carries no image file
pub const MISSING_IMAGE_MESSAGE: &str = "No image uploaded.";

/// Body of every 5xx response; the cause is only logged
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Errors while handling a describe-image request
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image uploaded.")]
    MissingInput,

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Could not decode image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Classification failed: {0}")]
    Classification(#[from] ClassifierError),

    #[error("Upload I/O failed: {0}")]
    Upload(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingInput => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Classification(_) | ApiError::Upload(_) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Metric label for the failure kind
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::MissingInput => "missing_input",
            ApiError::Multipart(_) => "bad_multipart",
            ApiError::Decode(_) => "decode_error",
            ApiError::Classification(_) => "classification_error",
            ApiError::Upload(_) => "upload_error",
            ApiError::Task(_) => "task_error",
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Task(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
            return (status, INTERNAL_ERROR_MESSAGE).into_response();
        }
        warn!("{}", self);
        (status, self.to_string()).into_response()
    }
}
