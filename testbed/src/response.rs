//! Response types and conversion traits.
//!
//! Handlers mounted on an [`App`](crate::app::App) or a
//! [`Router`](crate::router::Router) return anything implementing
//! [`IntoResponse`]: status codes, strings, [`Json`] payloads, or
//! [`Error`](crate::error::Error) values.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// The body type used for HTTP responses.
pub type BoxBody = Full<Bytes>;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Trait for types that can be converted into an HTTP response.
///
/// # Examples
///
/// ```
/// use testbed::response::{BoxBody, IntoResponse};
/// use http::Response;
///
/// struct Greeting(&'static str);
///
/// impl IntoResponse for Greeting {
///     fn into_response(self) -> Response<BoxBody> {
///         self.0.into_response()
///     }
/// }
/// ```
pub trait IntoResponse {
    /// Converts this type into an HTTP response.
    fn into_response(self) -> Response<BoxBody>;
}

/// Builds a response with the given status, content type and body.
pub(crate) fn with_body(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<BoxBody> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

impl IntoResponse for Response<BoxBody> {
    fn into_response(self) -> Response<BoxBody> {
        self
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response<BoxBody> {
        with_body(StatusCode::OK, TEXT_PLAIN, self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response<BoxBody> {
        with_body(StatusCode::OK, TEXT_PLAIN, self)
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response<BoxBody> {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = self;
        response
    }
}

impl IntoResponse for (StatusCode, String) {
    fn into_response(self) -> Response<BoxBody> {
        with_body(self.0, TEXT_PLAIN, self.1)
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for std::result::Result<T, E> {
    fn into_response(self) -> Response<BoxBody> {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// A JSON response payload.
///
/// Replies `200 OK` by default; pair it with a status code for anything
/// else:
///
/// ```
/// use testbed::response::{IntoResponse, Json};
/// use http::StatusCode;
///
/// let response = (StatusCode::CREATED, Json(serde_json::json!({"id": 1}))).into_response();
/// assert_eq!(response.status(), StatusCode::CREATED);
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response<BoxBody> {
        (StatusCode::OK, self).into_response()
    }
}

impl<T: Serialize> IntoResponse for (StatusCode, Json<T>) {
    fn into_response(self) -> Response<BoxBody> {
        match serde_json::to_vec(&self.1.0) {
            Ok(body) => with_body(self.0, APPLICATION_JSON, body),
            Err(e) => crate::error::Error::internal(format!("failed to serialize response: {e}"))
                .into_response(),
        }
    }
}
