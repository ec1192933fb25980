use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::assistant::AssistantError;
use crate::classifier::ClassifierError;

/// Body of every error response: `{"message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Failure of a request handler, mapped onto an HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error("{message}")]
    Upload { status: StatusCode, message: String },
    /// The request body is not the JSON document the endpoint expects
    #[error("{message}")]
    Json { status: StatusCode, message: String },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Classifier(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Classifier(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Assistant(AssistantError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Assistant(AssistantError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            Self::Assistant(_) => StatusCode::BAD_GATEWAY,
            Self::Upload { status, .. } | Self::Json { status, .. } => *status,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        Self::Upload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        Self::Json {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed with {}: {}", status, self);
        } else {
            log::warn!("Request rejected with {}: {}", status, self);
        }
        (status, Json(ErrorBody { message: self.to_string() })).into_response()
    }
}
