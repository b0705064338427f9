use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use matching_core::models::matching::responses::ErrorResponse;
use matching_core::services::errors::matching_service_errors::MatchingServiceError;
use matching_core::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error(transparent)]
    MatchingService(#[from] MatchingServiceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::MatchingService(MatchingServiceError::ValidationError(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MatchingService(MatchingServiceError::MatchNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::MatchingService(MatchingServiceError::StoreError(StoreError::Timeout(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::MatchingService(MatchingServiceError::StoreError(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
