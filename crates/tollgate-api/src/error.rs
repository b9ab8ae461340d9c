//! Error-to-response mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tollgate_core::QuotaError;

/// HTTP-facing wrapper around [`QuotaError`]
#[derive(Debug)]
pub struct ApiError(pub QuotaError);

impl From<QuotaError> for ApiError {
    fn from(e: QuotaError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            QuotaError::UnknownTier(_)
            | QuotaError::UnknownFeature(_)
            | QuotaError::UnknownSubscriber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            QuotaError::InvalidId(_) => StatusCode::BAD_REQUEST,
            QuotaError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
            QuotaError::PolicyLoad(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
