use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::{Request, Response};

use crate::context::RequestContext;
use crate::response::BoxBody;

use super::{BoxFuture, Middleware, Next};

pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Echoes the request's trace id in the `x-trace-id` response header.
///
/// The id is taken from the incoming `x-trace-id` header when present,
/// otherwise generated per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceIdMiddleware;

impl TraceIdMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for TraceIdMiddleware {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>> {
        Box::pin(async move {
            let mut response = next.run(req).await;

            if let Ok(value) = HeaderValue::from_str(&ctx.trace_id) {
                response.headers_mut().insert(TRACE_ID_HEADER, value);
            }

            response
        })
    }
}
