//! Helpers for testing HTTP applications built on hyper.
//!
//! A [`TestHarness`](testing::TestHarness) owns an [`App`](app::App), serves
//! it on a random local port and hands out pre-configured request
//! builders: JSON verb helpers, multipart uploads, downloads, middleware
//! probes and resource routers resolved from a name or path templates.
//!
//! No assertion, fake-data or spy utilities are re-exported. Responses
//! carry their own `assert_*` methods, and routes are mounted through
//! [`App`](app::App) or [`TestHarness::mount`](testing::TestHarness::mount).

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod params;
pub mod resource;
pub mod response;
pub mod router;
pub mod server;
pub mod template;
pub mod testing;

pub mod prelude {
    pub use crate::app::App;
    pub use crate::context::RequestContext;
    pub use crate::error::{Error, Result};
    pub use crate::middleware::{Middleware, Next};
    pub use crate::params::{ParamBag, Params};
    pub use crate::resource::ResourceOptions;
    pub use crate::response::{IntoResponse, Json};
    pub use crate::router::{PathParams, Router};
    pub use crate::testing::{
        Attachment, DownloadOptions, Encoding, MultipartBody, TestHarness, TestResponse,
    };

    pub use http::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
}
