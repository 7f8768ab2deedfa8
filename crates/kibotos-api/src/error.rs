//! Converts the domain error taxonomy into the wire `ErrorBody` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kibotos_types::{ErrorBody, KibotosError};
use uuid::Uuid;

use crate::middleware::RequestId;

/// Wraps a [`KibotosError`] with the request id it should be reported
/// under, so `IntoResponse` never has to synthesize one.
pub struct ApiError {
    pub error: KibotosError,
    pub request_id: Uuid,
}

impl ApiError {
    pub fn new(error: KibotosError, request_id: RequestId) -> Self {
        Self {
            error,
            request_id: request_id.0,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            code: self.error.code().to_string(),
            message: self.error.to_string(),
            request_id: self.request_id,
        };
        (status, Json(body)).into_response()
    }
}
