//! Error types for the HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cloudsync_integrations::IntegrationError;
use cloudsync_storage_core::StorageError;
use serde::Serialize;
use tracing::error;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or invalid x-user-id header")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Integration not found: {0}")]
    IntegrationNotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::IntegrationNotFound(_) => (StatusCode::NOT_FOUND, "INTEGRATION_NOT_FOUND"),
            ApiError::Storage(e) => match e {
                StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                StorageError::InvalidChecksum(_) => (StatusCode::BAD_REQUEST, "INVALID_CHECKSUM"),
                StorageError::InvalidRootHash(_) => (StatusCode::BAD_REQUEST, "INVALID_ROOT_HASH"),
                StorageError::UnsupportedOperation(_) => {
                    (StatusCode::NOT_IMPLEMENTED, "UNSUPPORTED_OPERATION")
                }
                StorageError::Conflict { .. } => {
                    (StatusCode::PRECONDITION_FAILED, "GENERATION_CONFLICT")
                }
                StorageError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                StorageError::Backend(_) => (StatusCode::BAD_GATEWAY, "BACKEND_ERROR"),
                StorageError::Serialization(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR")
                }
            },
            ApiError::Integration(e) => match e {
                IntegrationError::NotConfigured => (StatusCode::NOT_ACCEPTABLE, "NOT_CONFIGURED"),
                IntegrationError::StateMismatch => (StatusCode::BAD_REQUEST, "STATE_MISMATCH"),
                IntegrationError::ExchangeFailure(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "EXCHANGE_FAILURE")
                }
                IntegrationError::PersistenceFailure(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILURE")
                }
                IntegrationError::InvalidCredential(_) => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIAL")
                }
                IntegrationError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
            code: &'static str,
        }

        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("{} ({})", self, code);
        }

        let body = ErrorBody {
            error: self.to_string(),
            code,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(StorageError::NotFound("x".into())), StatusCode::NOT_FOUND),
            (
                ApiError::from(StorageError::InvalidChecksum("md5".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(StorageError::InvalidRootHash("short".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(StorageError::Conflict {
                    expected: 1,
                    actual: 2,
                }),
                StatusCode::PRECONDITION_FAILED,
            ),
            (
                ApiError::from(IntegrationError::NotConfigured),
                StatusCode::NOT_ACCEPTABLE,
            ),
            (
                ApiError::from(IntegrationError::StateMismatch),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(IntegrationError::Upstream("500".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_state_mismatch_message() {
        assert_eq!(
            ApiError::from(IntegrationError::StateMismatch).to_string(),
            "Authentication request expired"
        );
    }
}
