use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::RoomError};

/// Failures raised by room commands, skill lookups and the session lifecycle.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The member store answered with an error.
    #[error("member store unavailable")]
    Unavailable(#[source] StorageError),
    /// No member store is installed.
    #[error("member store unavailable (degraded mode)")]
    Degraded,
    /// The request carries an unusable value.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The room or session is not in a state that accepts the command.
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<RoomError> for ServiceError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::Validation(message) => ServiceError::InvalidInput(message),
            RoomError::Busy(_) | RoomError::Conflict(_) => {
                ServiceError::InvalidState(err.to_string())
            }
            RoomError::NotFound(message) => ServiceError::NotFound(message),
        }
    }
}

/// Errors surfaced to the gateway as HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Missing or wrong gateway token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// The command was rejected by the room or session state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The member store is down.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {err}"))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            message: self.to_string(),
        });
        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_rejections_map_to_http_classes() {
        let busy: AppError = ServiceError::from(RoomError::Busy(2)).into();
        assert!(matches!(busy, AppError::Conflict(ref message) if message.contains("room 2")));
        assert_eq!(busy.status(), StatusCode::CONFLICT);

        let missing: AppError = ServiceError::from(RoomError::not_found("no topic")).into();
        assert!(matches!(missing, AppError::NotFound(ref message) if message == "no topic"));

        let invalid: AppError =
            ServiceError::from(RoomError::Validation("too long".into())).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn degraded_store_maps_to_service_unavailable() {
        let degraded: AppError = ServiceError::Degraded.into();
        assert_eq!(degraded.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            AppError::Unauthorized("invalid gateway token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
