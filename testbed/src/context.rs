use std::time::Instant;

use http::Method;

/// Per-request bookkeeping created by the server for every request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub method: Method,
    pub path: String,
    pub start_time: Instant,
}

impl RequestContext {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self::with_trace_id(uuid::Uuid::new_v4().to_string(), method, path)
    }

    pub fn with_trace_id(trace_id: String, method: Method, path: impl Into<String>) -> Self {
        Self {
            trace_id,
            method,
            path: path.into(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}
