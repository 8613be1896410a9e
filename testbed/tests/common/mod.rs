//! Shared helpers for integration tests.

#![allow(dead_code)]

use testbed::config::HarnessConfig;
use testbed::observability::TracingConfig;
use testbed::testing::TestHarness;

pub const TEXT_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test.txt");
pub const BINARY_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/pixel.bin");

/// A harness with the default middleware, ignoring the environment.
pub async fn harness() -> TestHarness {
    TracingConfig::new().try_init();
    TestHarness::with_config(&HarnessConfig::default())
        .await
        .unwrap()
}

/// One part of a `multipart/form-data` body as a server sees it.
#[derive(Debug)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn quoted(header: &str, key: &str) -> Option<String> {
    let start = header.find(&format!("{key}=\""))? + key.len() + 2;
    let end = header[start..].find('"')? + start;
    Some(header[start..end].to_string())
}

/// Minimal parser for the bodies produced by the upload helper.
pub fn parse_multipart(content_type: &str, body: &[u8]) -> Vec<FormPart> {
    let boundary = content_type
        .split("boundary=")
        .nth(1)
        .expect("multipart boundary");
    let delimiter = format!("--{boundary}");

    let mut parts = Vec::new();
    let mut rest = body;

    while let Some(at) = find(rest, delimiter.as_bytes()) {
        rest = &rest[at + delimiter.len()..];
        if rest.starts_with(b"--") {
            break;
        }
        rest = rest.strip_prefix(b"\r\n").expect("CRLF after boundary");

        let head_end = find(rest, b"\r\n\r\n").expect("part headers");
        let head = String::from_utf8_lossy(&rest[..head_end]).to_string();
        rest = &rest[head_end + 4..];

        let data_end = find(rest, delimiter.as_bytes()).expect("closing boundary");
        let data = rest[..data_end]
            .strip_suffix(b"\r\n")
            .expect("CRLF before boundary")
            .to_vec();

        let mut part = FormPart {
            name: String::new(),
            file_name: None,
            content_type: None,
            data,
        };
        for line in head.split("\r\n") {
            if let Some(disposition) = line.strip_prefix("Content-Disposition: ") {
                part.name = quoted(disposition, "name").unwrap_or_default();
                part.file_name = quoted(disposition, "filename");
            } else if let Some(value) = line.strip_prefix("Content-Type: ") {
                part.content_type = Some(value.to_string());
            }
        }
        parts.push(part);
    }

    parts
}
