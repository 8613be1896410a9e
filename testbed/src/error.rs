//! API errors returned by handlers.
//!
//! An [`Error`] converts into a JSON response. The response also carries
//! the error itself as an extension so that the application's permanent
//! `errorHandler` can re-render it with the trace id of the request.
//!
//! ```rust
//! use testbed::error::Error;
//!
//! let err = Error::bad_request("validation failed")
//!     .with_details(serde_json::json!({"field": "email"}));
//! assert_eq!(err.status, 400);
//! ```

use std::fmt;

use http::{Response, StatusCode};
use serde::Serialize;

use crate::response::{BoxBody, IntoResponse, with_body};

/// The JSON structure returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// The error details.
    pub error: ErrorDetail,
    /// Unique identifier for request tracing.
    pub trace_id: String,
}

/// Detailed error information in the response body.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// An error reply produced by a handler or by the application itself.
#[derive(Debug, Clone)]
pub struct Error {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error details.
    pub details: Option<serde_json::Value>,
    /// Trace id, filled in by the error handler when absent.
    pub trace_id: Option<String>,
}

impl Error {
    /// Creates a new error with the given status code, code, and message.
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            trace_id: None,
        }
    }

    /// Adds additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the trace ID for this error.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, "CONFLICT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, "INTERNAL_ERROR", message)
    }

    /// Returns the status as a [`StatusCode`], falling back to 500 for
    /// values outside the valid range.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Converts this error to an ErrorResponse with the given trace ID.
    pub fn to_response(&self, trace_id: String) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.code.clone(),
                message: self.message.clone(),
                details: self.details.clone(),
            },
            trace_id,
        }
    }

    /// Renders the JSON body without attaching the error as an extension.
    pub(crate) fn render(&self) -> Response<BoxBody> {
        let trace_id = self
            .trace_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let body = serde_json::to_vec(&self.to_response(trace_id)).unwrap_or_default();
        with_body(self.status_code(), "application/json", body)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response<BoxBody> {
        let mut response = self.render();
        response.extensions_mut().insert(self);
        response
    }
}

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_error_new() {
        let err = Error::new(500, "TEST_ERROR", "test message");
        assert_eq!(err.status, 500);
        assert_eq!(err.code, "TEST_ERROR");
        assert_eq!(err.message, "test message");
        assert!(err.details.is_none());
        assert!(err.trace_id.is_none());
    }

    #[test]
    fn test_error_constructors() {
        assert_eq!(Error::bad_request("x").status, 400);
        assert_eq!(Error::unauthorized("x").status, 401);
        assert_eq!(Error::forbidden("x").status, 403);
        assert_eq!(Error::not_found("x").code, "NOT_FOUND");
        assert_eq!(Error::conflict("x").code, "CONFLICT");
        assert_eq!(Error::internal("x").code, "INTERNAL_ERROR");
    }

    #[test]
    fn test_status_code_out_of_range() {
        let err = Error::new(42, "ODD", "odd status");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_display() {
        let err = Error::not_found("user not found");
        assert_eq!(err.to_string(), "NOT_FOUND: user not found");
    }

    #[test]
    fn test_into_response_carries_error_extension() {
        let response = Error::conflict("taken").into_response();
        let carried = response.extensions().get::<Error>().unwrap();
        assert_eq!(carried.code, "CONFLICT");
    }

    #[tokio::test]
    async fn test_into_response_json_body() {
        let response = Error::bad_request("invalid input")
            .with_details(serde_json::json!({"field": "name"}))
            .with_trace_id("trace-1")
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert_eq!(json["error"]["message"], "invalid input");
        assert_eq!(json["error"]["details"]["field"], "name");
        assert_eq!(json["trace_id"], "trace-1");
    }

    #[tokio::test]
    async fn test_details_omitted_when_absent() {
        let response = Error::internal("boom").render();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].get("details").is_none());
        assert_eq!(json["trace_id"].as_str().unwrap().len(), 36);
    }
}
