//! Testing utilities: a client for an [`App`](crate::app::App) served on a
//! random port, and the helpers built on it.

mod client;
mod download;
mod harness;
mod multipart;

pub use client::{ClientError, TestClient, TestRequestBuilder, TestResponse};
pub use download::{DownloadOptions, DownloadParser, Encoding, UnknownEncoding};
pub use harness::{HarnessError, MiddlewareHelpers, TestHarness};
pub use multipart::{ATTACH_KEY, Attachment, MultipartBody, MultipartError};
