//! Test client for integration testing an [`App`].

use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::{Serialize, de::DeserializeOwned};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::app::App;
use crate::config::HarnessConfig;
use crate::server;

use super::download::{DownloadOptions, DownloadParser};
use super::multipart::{self, MultipartBody, MultipartError};

const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid header `{0}`")]
    InvalidHeader(String),
    #[error("failed to serialize JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to encode form: {0}")]
    Form(#[from] serde_urlencoded::ser::Error),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("invalid request: {0}")]
    Request(#[from] http::Error),
    #[error("request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),
    #[error("failed to read response body: {0}")]
    Body(#[from] hyper::Error),
}

/// A client for making HTTP requests to an [`App`] served on a random
/// local port.
///
/// The server stops when the client is dropped.
///
/// # Examples
///
/// ```ignore
/// use testbed::prelude::*;
/// use testbed::testing::TestClient;
///
/// #[tokio::test]
/// async fn test_hello() {
///     let app = App::new();
///     app.get("/", |_, _| async { "Hello!" });
///
///     let client = TestClient::new(app).await.unwrap();
///     let response = client.get("/").send().await;
///
///     assert_eq!(response.status(), StatusCode::OK);
///     assert_eq!(response.text(), "Hello!");
/// }
/// ```
pub struct TestClient {
    addr: SocketAddr,
    client: Client<HttpConnector, Full<Bytes>>,
    _shutdown: oneshot::Sender<()>,
}

impl TestClient {
    /// Serves `app` on `127.0.0.1:0`.
    pub async fn new(app: App) -> std::io::Result<Self> {
        Self::with_config(app, &HarnessConfig::default()).await
    }

    /// Serves `app` on the configured bind address.
    pub async fn with_config(app: App, config: &HarnessConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        server::spawn(listener, app, shutdown_rx);

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            addr,
            client,
            _shutdown: shutdown_tx,
        })
    }

    /// Creates a GET request builder.
    pub fn get(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::GET, path)
    }

    /// Creates a POST request builder.
    pub fn post(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::POST, path)
    }

    /// Creates a PUT request builder.
    pub fn put(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::PUT, path)
    }

    /// Creates a PATCH request builder.
    pub fn patch(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::PATCH, path)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::DELETE, path)
    }

    /// Creates a HEAD request builder.
    pub fn head(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::HEAD, path)
    }

    /// Creates an OPTIONS request builder.
    pub fn options(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::OPTIONS, path)
    }

    /// Creates a request builder with no default headers.
    pub fn request(&self, method: Method, path: &str) -> TestRequestBuilder<'_> {
        TestRequestBuilder::new(self, method, path)
    }

    /// Creates a request that accepts and declares JSON. Methods that
    /// carry a body start with `{}`.
    pub fn json_request(&self, method: Method, path: &str) -> TestRequestBuilder<'_> {
        let with_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);
        let builder = self
            .request(method, path)
            .header(ACCEPT.as_str(), APPLICATION_JSON)
            .header(CONTENT_TYPE.as_str(), APPLICATION_JSON);

        if with_body {
            builder.body(Bytes::from_static(b"{}"))
        } else {
            builder
        }
    }

    /// Returns the address the test server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

enum Payload {
    Bytes(Bytes),
    Multipart(MultipartBody),
}

/// Builder for constructing test requests.
pub struct TestRequestBuilder<'a> {
    client: &'a TestClient,
    method: Method,
    path: String,
    headers: HeaderMap,
    payload: Payload,
    download: Option<DownloadOptions>,
    error: Option<ClientError>,
}

impl<'a> TestRequestBuilder<'a> {
    fn new(client: &'a TestClient, method: Method, path: &str) -> Self {
        Self {
            client,
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            payload: Payload::Bytes(Bytes::new()),
            download: None,
            error: None,
        }
    }

    fn fail(mut self, error: ClientError) -> Self {
        self.error.get_or_insert(error);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Adds a header to the request, replacing any previous value.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
                self
            }
            _ => self.fail(ClientError::InvalidHeader(key.to_string())),
        }
    }

    /// Sets a JSON body on the request.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                self.payload = Payload::Bytes(Bytes::from(bytes));
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
                self
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Sets a form body on the request.
    pub fn form<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_urlencoded::to_string(body) {
            Ok(encoded) => {
                self.payload = Payload::Bytes(Bytes::from(encoded));
                self.headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
                self
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Appends a query string to the path.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        match serde_urlencoded::to_string(query) {
            Ok(encoded) if encoded.is_empty() => self,
            Ok(encoded) => {
                let sep = if self.path.contains('?') { '&' } else { '?' };
                self.path.push(sep);
                self.path.push_str(&encoded);
                self
            }
            Err(e) => self.fail(e.into()),
        }
    }

    /// Sets raw body bytes.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.payload = Payload::Bytes(body.into());
        self
    }

    /// Sends a `multipart/form-data` body; files are read on send.
    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.headers.remove(CONTENT_TYPE);
        self.payload = Payload::Multipart(body);
        self
    }

    /// Parses the response body as a download with `options`.
    pub fn download(mut self, options: DownloadOptions) -> Self {
        self.download = Some(options);
        self
    }

    /// Sends the request and returns the response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the exchange fails; HTTP
    /// error statuses are ordinary responses.
    pub async fn send(self) -> TestResponse {
        let method = self.method.clone();
        let path = self.path.clone();
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("{method} {path} failed: {e}"),
        }
    }

    /// Sends the request, surfacing build and transport failures.
    pub async fn try_send(self) -> Result<TestResponse, ClientError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let uri = format!("http://{}{}", self.client.addr, self.path);
        let mut builder = Request::builder().method(self.method).uri(&uri);

        for (key, value) in self.headers.iter() {
            builder = builder.header(key, value);
        }

        let body = match self.payload {
            Payload::Bytes(bytes) => bytes,
            Payload::Multipart(form) => {
                let boundary = multipart::boundary();
                builder = builder.header(
                    CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                );
                form.encode(&boundary).await?
            }
        };

        let request = builder.body(Full::new(body))?;
        let response = self.client.client.request(request).await?;

        let status = response.status();
        let headers = response.headers().clone();

        let body = match self.download {
            Some(options) => {
                let mut parser = DownloadParser::new(options);
                let mut body = response.into_body();
                while let Some(frame) = body.frame().await {
                    if let Some(chunk) = frame?.data_ref() {
                        parser.push(chunk);
                    }
                }
                parser.finish()
            }
            None => response.into_body().collect().await?.to_bytes(),
        };

        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }
}

/// Response from a test request.
#[derive(Debug, Clone)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the response body as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Returns the response body as raw bytes. For downloads this is the
    /// assembled payload.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the response body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> T {
        match self.try_json() {
            Ok(value) => value,
            Err(e) => panic!("response body is not the expected JSON: {e}: {}", self.text()),
        }
    }

    /// Attempts to deserialize the response body as JSON.
    pub fn try_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Asserts the status code.
    #[track_caller]
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "unexpected status, body: {}",
            self.text()
        );
        self
    }

    /// Asserts that header `name` equals `expected`.
    #[track_caller]
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        assert_eq!(self.header(name), Some(expected), "header `{name}`");
        self
    }

    #[track_caller]
    pub fn assert_text(&self, expected: &str) -> &Self {
        assert_eq!(self.text(), expected);
        self
    }

    /// Asserts the body equals `expected` once both are parsed as JSON.
    #[track_caller]
    pub fn assert_json<T: Serialize + ?Sized>(&self, expected: &T) -> &Self {
        let actual: serde_json::Value = self.json();
        let expected = serde_json::to_value(expected).unwrap_or(serde_json::Value::Null);
        assert_eq!(actual, expected);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Json;

    async fn client(app: App) -> TestClient {
        TestClient::new(app).await.unwrap()
    }

    #[tokio::test]
    async fn test_client_get() {
        let app = App::new();
        app.get("/", |_, _| async { "Hello!" });

        let client = client(app).await;
        let response = client.get("/").send().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), "Hello!");
    }

    #[tokio::test]
    async fn test_client_post_json() {
        let app = App::new();
        app.post("/echo", |req, _| async move {
            let body = req.into_body().collect().await.unwrap().to_bytes();
            String::from_utf8_lossy(&body).to_string()
        });

        let client = client(app).await;
        let response = client
            .post("/echo")
            .json(&serde_json::json!({"name": "test"}))
            .send()
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), r#"{"name":"test"}"#);
    }

    #[tokio::test]
    async fn test_client_with_headers() {
        let app = App::new();
        app.get("/headers", |req, _| async move {
            req.headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        });

        let client = client(app).await;
        let response = client
            .get("/headers")
            .header("authorization", "Bearer token123")
            .send()
            .await;

        assert_eq!(response.text(), "Bearer token123");
    }

    #[tokio::test]
    async fn test_invalid_header_surfaces_on_send() {
        let client = client(App::new()).await;
        let err = client
            .get("/")
            .header("bad header", "x")
            .try_send()
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::InvalidHeader(name) if name == "bad header"));
    }

    #[tokio::test]
    async fn test_json_request_defaults() {
        let app = App::new();
        app.post("/inspect", |req, _| async move {
            let accept = req.headers().get("accept").cloned();
            let content_type = req.headers().get("content-type").cloned();
            let body = req.into_body().collect().await.unwrap().to_bytes();
            Json(serde_json::json!({
                "accept": accept.and_then(|v| v.to_str().ok().map(String::from)),
                "content_type": content_type.and_then(|v| v.to_str().ok().map(String::from)),
                "body": String::from_utf8_lossy(&body),
            }))
        });

        let client = client(app).await;
        client
            .json_request(Method::POST, "/inspect")
            .send()
            .await
            .assert_status(StatusCode::OK)
            .assert_json(&serde_json::json!({
                "accept": "application/json",
                "content_type": "application/json",
                "body": "{}",
            }));
    }

    #[tokio::test]
    async fn test_query_appends_encoded_pairs() {
        let app = App::new();
        app.get("/search", |req, _| async move {
            req.uri().query().unwrap_or("").to_string()
        });

        let client = client(app).await;
        let response = client
            .get("/search")
            .query(&[("q", "a b"), ("page", "2")])
            .send()
            .await;

        assert_eq!(response.text(), "q=a+b&page=2");
    }

    #[tokio::test]
    async fn test_client_not_found() {
        let client = client(App::new()).await;
        let response = client.get("/nonexistent").send().await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_head_uses_get_route() {
        let app = App::new();
        app.get("/users", |_, _| async { "listing" });

        let client = client(app).await;
        let response = client.head("/users").send().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.bytes().is_empty());
    }

    #[tokio::test]
    async fn test_client_addr() {
        let client = client(App::new()).await;
        let addr = client.addr();

        assert!(addr.port() > 0);
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
    }
}
