//! Routes and routers.
//!
//! A [`Router`] is a bundle of routes that can be mounted on an
//! [`App`](crate::app::App) as a unit, optionally under a version prefix.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use http::{Method, Request};
use hyper::body::Incoming;
use percent_encoding::percent_decode_str;

use crate::middleware::{BoxFuture, Middleware};
use crate::response::{BoxBody, IntoResponse};

/// Path parameters captured from `:name` segments.
pub type PathParams = HashMap<String, String>;

pub(crate) type HandlerFn = Box<
    dyn Fn(Request<Incoming>, PathParams) -> BoxFuture<'static, http::Response<BoxBody>>
        + Send
        + Sync,
>;

/// Which request methods a route answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Only(Method),
    Any,
}

impl MethodFilter {
    /// `GET` routes also answer `HEAD`.
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(m) => m == method || (*m == Method::GET && method == Method::HEAD),
        }
    }
}

pub(crate) struct Route {
    pub(crate) method: MethodFilter,
    pub(crate) pattern: String,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    handler: HandlerFn,
}

impl Route {
    pub(crate) fn new<F, Fut, Out>(
        method: MethodFilter,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: F,
    ) -> Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        let handler = Box::new(move |req: Request<Incoming>, params: PathParams| {
            let handler = handler.clone();
            Box::pin(async move { handler(req, params).await.into_response() })
                as BoxFuture<'static, http::Response<BoxBody>>
        });

        Self {
            method,
            pattern: pattern.to_string(),
            middlewares,
            handler,
        }
    }

    pub(crate) fn matches(&self, method: &Method, path: &str) -> Option<PathParams> {
        if !self.method.allows(method) {
            return None;
        }
        extract_path_params(&self.pattern, path)
    }

    pub(crate) fn call(
        &self,
        req: Request<Incoming>,
        params: PathParams,
    ) -> BoxFuture<'static, http::Response<BoxBody>> {
        (self.handler)(req, params)
    }
}

/// Matches `path` against a `:param` pattern, returning the decoded
/// parameters on success.
pub fn extract_path_params(pattern: &str, path: &str) -> Option<PathParams> {
    let pattern_parts: Vec<&str> = pattern.split('/').collect();
    let path_parts: Vec<&str> = path.split('/').collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            if path_part.is_empty() {
                return None;
            }
            let value = percent_decode_str(path_part).decode_utf8_lossy();
            params.insert(param_name.to_string(), value.into_owned());
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

/// A bundle of routes mounted on an application as one unit.
///
/// Routes are matched in the order they are added. A versioned router
/// only answers paths under `/{version}`.
///
/// # Examples
///
/// ```
/// use testbed::prelude::*;
///
/// let router = Router::new()
///     .version("1.0.0")
///     .get("/users", |_, _| async { StatusCode::OK })
///     .get("/users/:id", |_, _| async { StatusCode::OK })
///     .post("/users", |_, _| async { StatusCode::CREATED });
///
/// assert_eq!(router.version_str(), Some("1.0.0"));
/// ```
#[derive(Clone, Default)]
pub struct Router {
    pub(crate) routes: Vec<Arc<Route>>,
    version: Option<String>,
}

impl Router {
    /// Creates a new empty, unversioned router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves every route of this router under `/{version}`.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn version_str(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Adds a route with the given HTTP method and pattern.
    pub fn route<F, Fut, Out>(mut self, method: Method, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        let route = Route::new(MethodFilter::Only(method), pattern, Vec::new(), handler);
        self.routes.push(Arc::new(route));
        self
    }

    /// Adds a GET route.
    pub fn get<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    /// Adds a POST route.
    pub fn post<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    /// Adds a PUT route.
    pub fn put<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    /// Adds a PATCH route.
    pub fn patch<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Adds a DELETE route.
    pub fn delete<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Finds the first route answering `method` on `path`.
    pub(crate) fn find(&self, method: &Method, path: &str) -> Option<(&Route, PathParams)> {
        let path = match &self.version {
            Some(version) => {
                let rest = path.strip_prefix('/')?.strip_prefix(version.as_str())?;
                if !rest.starts_with('/') {
                    return None;
                }
                rest
            }
            None => path,
        };

        self.routes.iter().find_map(|route| {
            route
                .matches(method, path)
                .map(|params| (route.as_ref(), params))
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn users_router() -> Router {
        Router::new()
            .get("/users", |_req, _params| async { StatusCode::OK })
            .get("/users/:id", |_req, _params| async { StatusCode::OK })
            .post("/users", |_req, _params| async { StatusCode::CREATED })
            .delete("/users/:id", |_req, _params| async { StatusCode::NO_CONTENT })
    }

    #[test]
    fn test_router_new() {
        let router = Router::new();
        assert!(router.is_empty());
        assert!(router.version_str().is_none());
    }

    #[test]
    fn test_router_preserves_route_order() {
        let router = users_router();
        assert_eq!(router.len(), 4);
        assert_eq!(router.routes[0].pattern, "/users");
        assert_eq!(router.routes[1].pattern, "/users/:id");
        assert_eq!(router.routes[2].method, MethodFilter::Only(Method::POST));
        assert_eq!(router.routes[3].method, MethodFilter::Only(Method::DELETE));
    }

    #[test]
    fn test_find_unversioned() {
        let router = users_router();

        let (route, params) = router.find(&Method::GET, "/users/42").unwrap();
        assert_eq!(route.pattern, "/users/:id");
        assert_eq!(params.get("id").unwrap(), "42");

        assert!(router.find(&Method::PUT, "/users/42").is_none());
        assert!(router.find(&Method::GET, "/accounts").is_none());
    }

    #[test]
    fn test_find_versioned() {
        let router = users_router().version("1.0.0");

        assert!(router.find(&Method::GET, "/1.0.0/users").is_some());
        assert!(router.find(&Method::GET, "/users").is_none());
        assert!(router.find(&Method::GET, "/1.0.0").is_none());
        assert!(router.find(&Method::GET, "/1.0.0users").is_none());
    }

    #[test]
    fn test_get_route_answers_head() {
        let router = users_router();
        assert!(router.find(&Method::HEAD, "/users").is_some());
        assert!(!MethodFilter::Only(Method::POST).allows(&Method::HEAD));
        assert!(MethodFilter::Any.allows(&Method::OPTIONS));
    }

    #[test]
    fn test_extract_path_params_decodes_values() {
        let params = extract_path_params("/files/:name", "/files/a%20b.txt").unwrap();
        assert_eq!(params.get("name").unwrap(), "a b.txt");
    }

    #[test]
    fn test_extract_path_params_rejects_empty_segment() {
        assert!(extract_path_params("/users/:id", "/users/").is_none());
        assert!(extract_path_params("/users/:id", "/users").is_none());
    }

    #[test]
    fn test_router_clone_shares_routes() {
        let router = users_router();
        let cloned = router.clone();
        assert!(Arc::ptr_eq(&router.routes[0], &cloned.routes[0]));
    }
}
