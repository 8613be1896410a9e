//! The shared application: one ordered stack of layers.
//!
//! An [`App`] is a cheap handle; clones share the same stack, so routes
//! mounted through one handle are visible to the server holding another.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use http::header::HeaderName;
use http::{Method, Request, Response};
use hyper::body::Incoming;
use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::context::RequestContext;
use crate::error::Error;
use crate::middleware::{CorsMiddleware, Middleware, Next, RequestLogMiddleware, TraceIdMiddleware};
use crate::response::{BoxBody, IntoResponse};
use crate::router::{MethodFilter, PathParams, Route, Router};

/// Name of the permanent fallback layer.
pub const NOT_FOUND: &str = "notFound";
/// Name of the permanent error rendering layer.
pub const ERROR_HANDLER: &str = "errorHandler";

pub type NotFoundFn = Arc<dyn Fn(&Method, &str) -> Response<BoxBody> + Send + Sync>;
pub type ErrorHandlerFn = Arc<dyn Fn(Error, &RequestContext) -> Response<BoxBody> + Send + Sync>;

pub(crate) enum Layer {
    Middleware {
        name: String,
        middleware: Arc<dyn Middleware>,
    },
    Route(Arc<Route>),
    Router(Router),
    NotFound(NotFoundFn),
    ErrorHandler(ErrorHandlerFn),
}

impl Layer {
    fn name(&self) -> &str {
        match self {
            Layer::Middleware { name, .. } => name,
            Layer::Route(_) => "route",
            Layer::Router(_) => "router",
            Layer::NotFound(_) => NOT_FOUND,
            Layer::ErrorHandler(_) => ERROR_HANDLER,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, Layer::NotFound(_) | Layer::ErrorHandler(_))
    }

    /// Routes and routers are owned by the test lifecycle; everything
    /// else survives [`App::clear`].
    fn is_mounted(&self) -> bool {
        matches!(self, Layer::Route(_) | Layer::Router(_))
    }
}

fn default_not_found(method: &Method, path: &str) -> Response<BoxBody> {
    Error::not_found(format!("cannot {method} {path}")).into_response()
}

fn default_error_handler(error: Error, ctx: &RequestContext) -> Response<BoxBody> {
    if error.status >= 500 {
        warn!(trace_id = %ctx.trace_id, code = %error.code, message = %error.message, "request failed");
    } else {
        debug!(trace_id = %ctx.trace_id, code = %error.code, status = error.status, "request rejected");
    }

    let error = match error.trace_id {
        Some(_) => error,
        None => error.with_trace_id(ctx.trace_id.clone()),
    };
    error.render()
}

/// The application every helper mounts on and every request goes through.
///
/// # Examples
///
/// ```
/// use testbed::prelude::*;
///
/// let app = App::new();
/// app.get("/health", |_, _| async { "ok" });
/// app.mount(Router::new().version("1.0.0").get("/users", |_, _| async { StatusCode::OK }));
///
/// assert_eq!(app.layer_names(), vec!["route", "router", "notFound", "errorHandler"]);
///
/// app.clear();
/// assert_eq!(app.layer_names(), vec!["notFound", "errorHandler"]);
/// ```
#[derive(Clone)]
pub struct App {
    stack: Arc<RwLock<Vec<Arc<Layer>>>>,
}

impl App {
    /// Creates an application holding only the permanent handlers.
    pub fn new() -> Self {
        let stack = vec![
            Arc::new(Layer::NotFound(Arc::new(default_not_found))),
            Arc::new(Layer::ErrorHandler(Arc::new(default_error_handler))),
        ];
        Self {
            stack: Arc::new(RwLock::new(stack)),
        }
    }

    /// Creates an application with the default middleware enabled by
    /// `config`, followed by CORS preflight handling.
    pub fn with_config(config: &HarnessConfig) -> Self {
        let app = Self::new();
        if config.trace_id {
            app.use_middleware("traceId", TraceIdMiddleware::new());
        }
        if config.request_log {
            app.use_middleware("requestLog", RequestLogMiddleware::new());
        }
        app.use_middleware("cors", CorsMiddleware::new());
        app
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Layer>>> {
        self.stack.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<Layer>>> {
        self.stack.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts a layer ahead of the permanent handlers.
    fn push(&self, layer: Layer) {
        let mut stack = self.write();
        let at = stack
            .iter()
            .position(|l| l.is_terminal())
            .unwrap_or(stack.len());
        stack.insert(at, Arc::new(layer));
    }

    /// Adds a named generic middleware. Generic middleware is not removed
    /// by [`App::clear`].
    pub fn use_middleware<M: Middleware>(&self, name: impl Into<String>, middleware: M) -> &Self {
        self.push(Layer::Middleware {
            name: name.into(),
            middleware: Arc::new(middleware),
        });
        self
    }

    /// Mounts every route of `router`, under its version prefix if it has one.
    pub fn mount(&self, router: Router) -> &Self {
        debug!(
            version = router.version_str().unwrap_or(""),
            routes = router.len(),
            "mounting router"
        );
        self.push(Layer::Router(router));
        self
    }

    /// Adds a plain route.
    pub fn route<F, Fut, Out>(&self, method: Method, pattern: &str, handler: F) -> &Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        let route = Route::new(MethodFilter::Only(method), pattern, Vec::new(), handler);
        self.push(Layer::Route(Arc::new(route)));
        self
    }

    /// Adds a route answering every method, running `middlewares` in order
    /// before `handler`.
    pub fn all<F, Fut, Out>(
        &self,
        pattern: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        handler: F,
    ) -> &Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        let route = Route::new(MethodFilter::Any, pattern, middlewares, handler);
        self.push(Layer::Route(Arc::new(route)));
        self
    }

    /// Adds a GET route.
    pub fn get<F, Fut, Out>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    /// Adds a POST route.
    pub fn post<F, Fut, Out>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    /// Adds a PUT route.
    pub fn put<F, Fut, Out>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    /// Adds a PATCH route.
    pub fn patch<F, Fut, Out>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Adds a DELETE route.
    pub fn delete<F, Fut, Out>(&self, pattern: &str, handler: F) -> &Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Replaces the permanent `notFound` handler in place.
    pub fn not_found<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Method, &str) -> Response<BoxBody> + Send + Sync + 'static,
    {
        let mut stack = self.write();
        if let Some(slot) = stack.iter_mut().find(|l| matches!(l.as_ref(), Layer::NotFound(_))) {
            *slot = Arc::new(Layer::NotFound(Arc::new(handler)));
        }
        self
    }

    /// Replaces the permanent `errorHandler` in place.
    pub fn error_handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(Error, &RequestContext) -> Response<BoxBody> + Send + Sync + 'static,
    {
        let mut stack = self.write();
        if let Some(slot) = stack
            .iter_mut()
            .find(|l| matches!(l.as_ref(), Layer::ErrorHandler(_)))
        {
            *slot = Arc::new(Layer::ErrorHandler(Arc::new(handler)));
        }
        self
    }

    /// Removes every mounted router and plain route, keeping generic
    /// middleware and the permanent `notFound` and `errorHandler` layers.
    pub fn clear(&self) {
        let mut stack = self.write();
        let before = stack.len();
        stack.retain(|layer| !layer.is_mounted());
        debug!(
            removed = before - stack.len(),
            remaining = stack.len(),
            "cleared mounted routes"
        );
    }

    /// Number of layers in the stack.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Layer names in dispatch order.
    pub fn layer_names(&self) -> Vec<String> {
        self.read().iter().map(|l| l.name().to_string()).collect()
    }

    /// Dispatches one request through the stack.
    pub async fn handle(&self, req: Request<Incoming>, ctx: &RequestContext) -> Response<BoxBody> {
        let layers: Vec<Arc<Layer>> = self.read().clone();

        let mut response = Next::stack(&layers, ctx).run(req).await;

        if let Some(error) = response.extensions_mut().remove::<Error>() {
            let handler = layers.iter().find_map(|l| match l.as_ref() {
                Layer::ErrorHandler(handler) => Some(handler.clone()),
                _ => None,
            });
            if let Some(handler) = handler {
                let mut rendered = handler(error, ctx);
                // Headers set by middleware on the way out survive re-rendering.
                let own: HashSet<HeaderName> = rendered.headers().keys().cloned().collect();
                for (name, value) in response.headers() {
                    if !own.contains(name) {
                        rendered.headers_mut().append(name.clone(), value.clone());
                    }
                }
                response = rendered;
            }
        }

        response
    }

    /// Serves this application on `addr` until the process exits.
    pub async fn listen(self, addr: &str) -> std::io::Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        crate::server::serve(self, addr).await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("layers", &self.layer_names())
            .finish()
    }
}
