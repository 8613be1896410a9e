//! Accept loop shared by [`App::listen`](crate::app::App::listen) and the
//! test client.

use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::app::App;
use crate::context::RequestContext;
use crate::middleware::TRACE_ID_HEADER;

/// Serves `app` on `addr` until the process exits.
pub async fn serve(app: App, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, _) = listener.accept().await?;
        serve_connection(stream, app.clone());
    }
}

/// Serves `app` on an already bound listener until `shutdown` fires or
/// is dropped.
pub(crate) fn spawn(listener: TcpListener, app: App, mut shutdown: oneshot::Receiver<()>) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => serve_connection(stream, app.clone()),
                        Err(e) => {
                            debug!(error = %e, "accept failed, stopping test server");
                            break;
                        }
                    }
                }
                _ = &mut shutdown => break,
            }
        }
    });
}

fn serve_connection(stream: TcpStream, app: App) {
    let io = TokioIo::new(stream);

    tokio::spawn(async move {
        let service = service_fn(move |mut req: Request<Incoming>| {
            let app = app.clone();
            let ctx = context_for(&req);
            req.extensions_mut().insert(ctx.clone());

            async move { Ok::<_, Infallible>(app.handle(req, &ctx).await) }
        });

        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
            debug!(error = %e, "connection closed with error");
        }
    });
}

/// A fresh context, keeping the caller's trace id when one is supplied.
fn context_for(req: &Request<Incoming>) -> RequestContext {
    let method = req.method().clone();
    let path = req.uri().path();
    match req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        Some(id) => RequestContext::with_trace_id(id.to_string(), method, path),
        None => RequestContext::new(method, path),
    }
}
