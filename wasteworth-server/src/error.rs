use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};
use wasteworth_core::{DirectoryError, ServiceError};

#[derive(Error, Debug)]
pub(crate) enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedPayload(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::MalformedPayload(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_) | Self::Service(ServiceError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(ServiceError::LookupFailed(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Service(ServiceError::CollectorInactive(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Service(ServiceError::Directory(directory)) => match directory {
                DirectoryError::CollectorNotFound(_) | DirectoryError::RequestNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                DirectoryError::InvalidTransition { .. } => StatusCode::CONFLICT,
                DirectoryError::Timeout | DirectoryError::Unavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                DirectoryError::Network(_) => StatusCode::BAD_GATEWAY,
                DirectoryError::InvalidSeed(_)
                | DirectoryError::UnsupportedBackend
                | DirectoryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
