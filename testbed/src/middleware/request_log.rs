use hyper::body::Incoming;
use hyper::{Request, Response};
use tracing::{Instrument, info, info_span};

use crate::context::RequestContext;
use crate::response::BoxBody;

use super::{BoxFuture, Middleware, Next};

/// Logs one `request completed` event per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogMiddleware;

impl RequestLogMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLogMiddleware {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>> {
        let span = info_span!(
            "request",
            method = %ctx.method,
            path = %ctx.path,
            trace_id = %ctx.trace_id,
        );

        Box::pin(
            async move {
                let response = next.run(req).await;

                info!(
                    status = response.status().as_u16(),
                    duration_ms = ctx.elapsed().as_millis() as u64,
                    "request completed"
                );

                response
            }
            .instrument(span),
        )
    }
}
