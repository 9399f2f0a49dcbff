//! HTTP error type for lexi-import

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::wizard::{WizardError, AUTH_REQUIRED_MESSAGE};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Step gating or terminal wizard (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rejected import file (422)
    #[error("Unprocessable file: {0}")]
    Unprocessable(String),

    /// No CMS credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// CMS call failed (502)
    #[error("Upstream error: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Parse(e) => ApiError::Unprocessable(e.to_string()),
            WizardError::Navigation(e) => ApiError::Conflict(e.to_string()),
            WizardError::InvalidOperation(msg) => ApiError::BadRequest(msg),
            WizardError::Structure(e) => ApiError::BadRequest(e.to_string()),
            WizardError::Remote(e) => ApiError::BadGateway(e.to_string()),
            WizardError::Submission(msg) if msg == AUTH_REQUIRED_MESSAGE => {
                ApiError::Unauthorized(msg)
            }
            WizardError::Submission(msg) => ApiError::BadGateway(msg),
            WizardError::Export(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_ERROR", msg)
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "REMOTE_ERROR", msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ParseError;
    use crate::wizard::NavigationError;
    use crate::models::WizardStep;

    #[test]
    fn test_wizard_error_status_codes() {
        let cases = vec![
            (WizardError::Parse(ParseError::Empty), StatusCode::UNPROCESSABLE_ENTITY),
            (
                WizardError::Navigation(NavigationError::Blocked(WizardStep::Structure)),
                StatusCode::CONFLICT,
            ),
            (
                WizardError::Submission(AUTH_REQUIRED_MESSAGE.to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                WizardError::Submission("API error 500: boom".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
