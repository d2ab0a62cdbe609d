use std::fmt;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::ConnectorError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ConnectorError> for ApiError {
    fn from(err: ConnectorError) -> Self {
        tracing::error!("Connector error: {}", err);
        Self::bad_gateway(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Reject text fields outside 1..=1000 characters.
pub(crate) fn validate_text(field: &str, value: &str) -> Result<(), ApiError> {
    let length = value.chars().count();
    if !(1..=MAX_TEXT_CHARS).contains(&length) {
        return Err(ApiError::bad_request(format!(
            "`{field}` must be between 1 and {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(())
}

const MAX_TEXT_CHARS: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_length_is_bounded() {
        assert!(validate_text("query", "a").is_ok());
        assert!(validate_text("query", &"é".repeat(1000)).is_ok());
        assert!(validate_text("query", "").is_err());
        assert!(validate_text("query", &"a".repeat(1001)).is_err());
    }

    #[test]
    fn connector_errors_are_bad_gateway() {
        let err: ApiError = ConnectorError::Upstream {
            status: 503,
            message: "busy".into(),
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }
}
