use serde::{Deserialize, Serialize};

use crate::BazaarError;
use crate::session::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct PrincipalResponse {
    pub role: Role,
    pub identity: String,
}

/// Body of `POST /api/session/establish`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EstablishSessionRequest {
    pub role: Role,
    pub identity: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<BazaarError> for ErrorResponse {
    fn from(err: BazaarError) -> Self {
        let code = match &err {
            BazaarError::Configuration(_) => "CONFIGURATION_ERROR",
            BazaarError::Store(_) => "STORE_UNAVAILABLE",
            BazaarError::Serialization(_) => "SERIALIZATION_ERROR",
            BazaarError::Validation(_) => "VALIDATION_ERROR",
            BazaarError::SessionInvalid => "SESSION_INVALID",
            BazaarError::SessionExpired => "SESSION_EXPIRED",
            BazaarError::Unauthorized => "UNAUTHORIZED",
            BazaarError::Forbidden => "FORBIDDEN",
            BazaarError::NotFound => "NOT_FOUND",
            BazaarError::MissingEndpoint => "MISSING_ENDPOINT",
            BazaarError::AlreadyActive => "ALREADY_ACTIVE",
            BazaarError::Connection(_) => "CONNECTION_ERROR",
            BazaarError::Io(_) => "IO_ERROR",
        };

        ErrorResponse {
            error: err.to_string(),
            code: code.to_owned(),
        }
    }
}
