//! The test harness: one application, one client, and the helpers that
//! tie them together.

use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::debug;

use crate::app::App;
use crate::config::HarnessConfig;
use crate::middleware::Middleware;
use crate::resource::{ResourceOptions, RouterHelpers};
use crate::router::Router;
use crate::template::TemplateError;

use super::client::{TestClient, TestRequestBuilder};
use super::download::DownloadOptions;
use super::multipart::MultipartBody;

/// An application served on a random local port, plus request helpers.
///
/// Every test creates its own harness, so routes never leak between
/// tests; [`TestHarness::clear`] resets the stack when one harness is
/// shared across cases.
///
/// ```ignore
/// use testbed::prelude::*;
///
/// #[tokio::test]
/// async fn lists_users() {
///     let harness = TestHarness::new().await.unwrap();
///     let router = Router::new()
///         .version("1.0.0")
///         .get("/users", |_, _| async { StatusCode::OK });
///
///     let users = harness.test_router("users", router).unwrap();
///     users.test_get(()).unwrap().send().await.assert_status(StatusCode::OK);
/// }
/// ```
pub struct TestHarness {
    app: App,
    client: TestClient,
}

impl TestHarness {
    /// Builds a harness from [`HarnessConfig::from_env`].
    pub async fn new() -> Result<Self, HarnessError> {
        let config = HarnessConfig::from_env()?;
        Self::with_config(&config).await
    }

    pub async fn with_config(config: &HarnessConfig) -> Result<Self, HarnessError> {
        Self::with_app(App::with_config(config), config).await
    }

    /// Serves an existing application.
    pub async fn with_app(app: App, config: &HarnessConfig) -> Result<Self, HarnessError> {
        let client = TestClient::with_config(app.clone(), config).await?;
        debug!(addr = %client.addr(), "test harness ready");
        Ok(Self { app, client })
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn client(&self) -> &TestClient {
        &self.client
    }

    pub fn mount(&self, router: Router) {
        self.app.mount(router);
    }

    /// Removes mounted routers and routes; see [`App::clear`].
    pub fn clear(&self) {
        self.app.clear();
    }

    /// A raw request with no default headers.
    pub fn test_request(&self, method: Method, path: &str) -> TestRequestBuilder<'_> {
        self.client.request(method, path)
    }

    /// Creates an OPTIONS request builder.
    pub fn test_option(&self, path: &str) -> TestRequestBuilder<'_> {
        self.client.json_request(Method::OPTIONS, path)
    }

    /// Creates a HEAD request builder.
    pub fn test_head(&self, path: &str) -> TestRequestBuilder<'_> {
        self.client.json_request(Method::HEAD, path)
    }

    /// Creates a GET request builder.
    pub fn test_get(&self, path: &str) -> TestRequestBuilder<'_> {
        self.client.json_request(Method::GET, path)
    }

    /// `POST` with a `{}` body; replace it with `.json(&body)`.
    pub fn test_post(&self, path: &str) -> TestRequestBuilder<'_> {
        self.client.json_request(Method::POST, path)
    }

    /// Creates a PATCH request builder with a `{}` body.
    pub fn test_patch(&self, path: &str) -> TestRequestBuilder<'_> {
        self.client.json_request(Method::PATCH, path)
    }

    /// Creates a PUT request builder with a `{}` body.
    pub fn test_put(&self, path: &str) -> TestRequestBuilder<'_> {
        self.client.json_request(Method::PUT, path)
    }

    /// Creates a DELETE request builder.
    pub fn test_delete(&self, path: &str) -> TestRequestBuilder<'_> {
        self.client.json_request(Method::DELETE, path)
    }

    /// `POST` of a `multipart/form-data` body.
    pub fn test_upload(&self, path: &str, body: MultipartBody) -> TestRequestBuilder<'_> {
        self.client.post(path).multipart(body)
    }

    /// `GET` whose body is collected with the download parser.
    pub fn test_download(&self, path: &str, options: DownloadOptions) -> TestRequestBuilder<'_> {
        self.client.get(path).download(options)
    }

    /// Same as [`TestHarness::test_download`].
    pub fn test_stream(&self, path: &str, options: DownloadOptions) -> TestRequestBuilder<'_> {
        self.test_download(path, options)
    }

    /// Mounts one middleware; see [`TestHarness::test_middlewares`].
    pub fn test_middleware<M: Middleware>(&self, middleware: M) -> MiddlewareHelpers<'_> {
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        self.test_middlewares(vec![middleware])
    }

    /// Mounts `middlewares` on a fresh random path for every method,
    /// ending in a `200 OK` reply.
    pub fn test_middlewares(&self, middlewares: Vec<Arc<dyn Middleware>>) -> MiddlewareHelpers<'_> {
        let path = format!("/{}", uuid::Uuid::new_v4());
        debug!(path = %path, count = middlewares.len(), "mounting test middleware");

        self.app
            .all(&path, middlewares, |_, _| async { StatusCode::OK });

        MiddlewareHelpers {
            client: &self.client,
            path,
        }
    }

    /// Compiles the resource templates under the router's version, mounts
    /// the router, and returns builders bound to those templates. Purposes
    /// without a template fail only when their builder is called.
    pub fn test_router(
        &self,
        options: impl Into<ResourceOptions>,
        router: Router,
    ) -> Result<RouterHelpers<'_>, TemplateError> {
        let paths = options.into().resolve(router.version_str())?;
        self.app.mount(router);
        Ok(RouterHelpers::new(&self.client, paths))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    #[error("failed to start test server: {0}")]
    Io(#[from] std::io::Error),
}

/// Request builders bound to the path of one [`TestHarness::test_middleware`] call.
pub struct MiddlewareHelpers<'a> {
    client: &'a TestClient,
    path: String,
}

impl<'a> MiddlewareHelpers<'a> {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Creates an OPTIONS request builder.
    pub fn test_option(&self) -> TestRequestBuilder<'a> {
        self.client.json_request(Method::OPTIONS, &self.path)
    }

    /// Creates a HEAD request builder.
    pub fn test_head(&self) -> TestRequestBuilder<'a> {
        self.client.json_request(Method::HEAD, &self.path)
    }

    /// Creates a GET request builder.
    pub fn test_get(&self) -> TestRequestBuilder<'a> {
        self.client.json_request(Method::GET, &self.path)
    }

    /// Creates a POST request builder with a `{}` body.
    pub fn test_post(&self) -> TestRequestBuilder<'a> {
        self.client.json_request(Method::POST, &self.path)
    }

    /// Creates a PATCH request builder with a `{}` body.
    pub fn test_patch(&self) -> TestRequestBuilder<'a> {
        self.client.json_request(Method::PATCH, &self.path)
    }

    /// Creates a PUT request builder with a `{}` body.
    pub fn test_put(&self) -> TestRequestBuilder<'a> {
        self.client.json_request(Method::PUT, &self.path)
    }

    /// Creates a DELETE request builder.
    pub fn test_delete(&self) -> TestRequestBuilder<'a> {
        self.client.json_request(Method::DELETE, &self.path)
    }
}
