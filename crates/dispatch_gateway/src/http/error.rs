//! HTTP error envelope

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dispatch_core::DispatchError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid identity header: {0}")]
    Unauthenticated(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            ApiError::Worker(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::Dispatch(err) => {
                let status = match err {
                    DispatchError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                    DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
                    DispatchError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
                    DispatchError::InvalidState { .. }
                    | DispatchError::RideUnavailable { .. }
                    | DispatchError::DriverOffline { .. } => StatusCode::CONFLICT,
                    DispatchError::PickupCodeLocked { .. } => StatusCode::TOO_MANY_REQUESTS,
                    DispatchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            ApiError::Dispatch(DispatchError::Storage(detail)) => {
                tracing::error!("Storage error: {}", detail);
                "Internal server error".to_string()
            }
            ApiError::Worker(detail) => {
                tracing::error!("Worker task failed: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use dispatch_core::ride::{RideId, RideStatus};

    use super::*;

    #[test]
    fn dispatch_errors_map_to_statuses() {
        let ride_id = RideId::new();
        let cases = [
            (DispatchError::invalid_input("bad"), StatusCode::BAD_REQUEST),
            (DispatchError::ride_not_found(ride_id), StatusCode::NOT_FOUND),
            (DispatchError::not_authorized("no"), StatusCode::FORBIDDEN),
            (
                DispatchError::InvalidState {
                    ride_id,
                    status: RideStatus::Completed,
                    operation: "accept",
                },
                StatusCode::CONFLICT,
            ),
            (DispatchError::RideUnavailable { ride_id }, StatusCode::CONFLICT),
            (
                DispatchError::DriverOffline {
                    driver_id: "d1".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                DispatchError::PickupCodeLocked { ride_id, attempts: 5 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                DispatchError::Storage("disk".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn worker_failure_is_an_opaque_server_error() {
        let response = ApiError::Worker("task panicked".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let response = ApiError::Unauthenticated("x-user-id".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
