use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use super::hub::HubError;
use crate::client::ClientError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token check could not reach the backend
    #[error("Auth backend unavailable: {0}")]
    AuthUnavailable(#[source] ClientError),

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RelayError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            RelayError::AuthUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "AUTH_UNAVAILABLE"),
            RelayError::Hub(HubError::TooManyConnections(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "TOO_MANY_CONNECTIONS")
            }
            RelayError::Hub(_) => (StatusCode::INTERNAL_SERVER_ERROR, "HUB_ERROR"),
            RelayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            RelayError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        };

        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(request_id = %request_id, error_code = %code, error_message = %self, "Relay error");
        } else {
            tracing::debug!(request_id = %request_id, error_code = %code, error_message = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
