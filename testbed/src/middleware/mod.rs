mod cors;
mod request_log;
mod trace_id;

pub use cors::CorsMiddleware;
pub use request_log::RequestLogMiddleware;
pub use trace_id::{TRACE_ID_HEADER, TraceIdMiddleware};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response};

use crate::app::Layer;
use crate::context::RequestContext;
use crate::response::{BoxBody, IntoResponse};
use crate::router::{PathParams, Route};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>>;
}

/// The remainder of the chain after the current middleware.
pub struct Next<'a> {
    chain: Chain<'a>,
    ctx: &'a RequestContext,
}

enum Chain<'a> {
    /// Remaining layers of the application stack.
    Stack(&'a [Arc<Layer>]),
    /// Remaining per-route middleware, then the route handler.
    Route {
        middlewares: &'a [Arc<dyn Middleware>],
        route: &'a Route,
        params: PathParams,
    },
}

impl<'a> Next<'a> {
    pub(crate) fn stack(layers: &'a [Arc<Layer>], ctx: &'a RequestContext) -> Self {
        Self {
            chain: Chain::Stack(layers),
            ctx,
        }
    }

    fn route(route: &'a Route, params: PathParams, ctx: &'a RequestContext) -> Self {
        Self {
            chain: Chain::Route {
                middlewares: &route.middlewares,
                route,
                params,
            },
            ctx,
        }
    }

    pub fn run(self, req: Request<Incoming>) -> BoxFuture<'a, Response<BoxBody>> {
        Box::pin(self.dispatch(req))
    }

    async fn dispatch(self, req: Request<Incoming>) -> Response<BoxBody> {
        match self.chain {
            Chain::Stack(layers) => run_stack(layers, self.ctx, req).await,
            Chain::Route {
                middlewares,
                route,
                params,
            } => {
                if let Some((current, rest)) = middlewares.split_first() {
                    let next = Next {
                        chain: Chain::Route {
                            middlewares: rest,
                            route,
                            params,
                        },
                        ctx: self.ctx,
                    };
                    current.handle(req, self.ctx, next).await
                } else {
                    route.call(req, params).await
                }
            }
        }
    }
}

async fn run_stack<'a>(
    layers: &'a [Arc<Layer>],
    ctx: &'a RequestContext,
    req: Request<Incoming>,
) -> Response<BoxBody> {
    let mut rest = layers;

    while let Some((layer, tail)) = rest.split_first() {
        match layer.as_ref() {
            Layer::Middleware { middleware, .. } => {
                return middleware.handle(req, ctx, Next::stack(tail, ctx)).await;
            }
            Layer::Route(route) => {
                if let Some(params) = route.matches(req.method(), req.uri().path()) {
                    return Next::route(route, params, ctx).run(req).await;
                }
            }
            Layer::Router(router) => {
                if let Some((route, params)) = router.find(req.method(), req.uri().path()) {
                    return Next::route(route, params, ctx).run(req).await;
                }
            }
            Layer::NotFound(handler) => return handler(req.method(), req.uri().path()),
            Layer::ErrorHandler(_) => {}
        }
        rest = tail;
    }

    crate::error::Error::not_found(format!("cannot {} {}", req.method(), req.uri().path()))
        .into_response()
}
