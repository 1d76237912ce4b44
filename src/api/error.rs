use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::BazaarError;
use crate::api::ErrorResponse;

/// converts `BazaarError` into appropriate HTTP responses
#[derive(Debug)]
pub struct AppError(pub BazaarError);

impl From<BazaarError> for AppError {
    fn from(err: BazaarError) -> Self {
        Self(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BazaarError::Unauthorized | BazaarError::SessionInvalid | BazaarError::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            BazaarError::Validation(_) => StatusCode::BAD_REQUEST,
            BazaarError::Forbidden => StatusCode::FORBIDDEN,
            BazaarError::NotFound => StatusCode::NOT_FOUND,
            BazaarError::AlreadyActive => StatusCode::CONFLICT,
            BazaarError::Store(_) | BazaarError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            BazaarError::Configuration(_)
            | BazaarError::Serialization(_)
            | BazaarError::MissingEndpoint
            | BazaarError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!(target: "bazaar::http", "msg=\"request failed\" status={} error=\"{}\"", status.as_u16(), self.0);
        }
        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}
