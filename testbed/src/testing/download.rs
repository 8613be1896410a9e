//! Response parsing for file downloads and streams.

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{Bytes, BytesMut};

/// How the raw response body is decoded before being re-assembled into
/// the final buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// One character per byte; lossless.
    #[default]
    Binary,
    /// UTF-8 text; invalid sequences become U+FFFD.
    Utf8,
    /// Base64 text; lossless.
    Base64,
}

impl Encoding {
    /// Decodes a complete body into text.
    pub fn decode(self, raw: &[u8]) -> String {
        match self {
            Encoding::Binary => raw.iter().map(|&b| char::from(b)).collect(),
            Encoding::Utf8 => String::from_utf8_lossy(raw).into_owned(),
            Encoding::Base64 => STANDARD.encode(raw),
        }
    }

    /// Turns text produced by [`Encoding::decode`] back into bytes.
    pub fn encode(self, text: &str) -> Bytes {
        match self {
            // Every char came from one byte, so the truncation is exact.
            Encoding::Binary => text.chars().map(|c| c as u32 as u8).collect(),
            Encoding::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            Encoding::Base64 => STANDARD.decode(text).map(Bytes::from).unwrap_or_default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown encoding `{0}`")]
pub struct UnknownEncoding(String);

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "latin1" => Ok(Encoding::Binary),
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "base64" => Ok(Encoding::Base64),
            _ => Err(UnknownEncoding(s.to_string())),
        }
    }
}

/// Options for download and stream requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    pub encoding: Encoding,
}

impl DownloadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Accumulates body chunks and yields the assembled payload at the end
/// of the response.
#[derive(Debug, Default)]
pub struct DownloadParser {
    encoding: Encoding,
    received: BytesMut,
}

impl DownloadParser {
    pub fn new(options: DownloadOptions) -> Self {
        Self {
            encoding: options.encoding,
            received: BytesMut::new(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.received.extend_from_slice(chunk);
    }

    /// Decodes everything received as one string, so multi-byte
    /// sequences split across chunks stay intact.
    pub fn finish(self) -> Bytes {
        let text = self.encoding.decode(&self.received);
        self.encoding.encode(&text)
    }
}
