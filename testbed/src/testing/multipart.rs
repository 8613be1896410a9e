//! `multipart/form-data` bodies for upload requests.
//!
//! A [`MultipartBody`] holds plain fields and file attachments. Files are
//! read from disk when the request is sent.
//!
//! ```
//! use testbed::testing::{Attachment, MultipartBody};
//!
//! let body = MultipartBody::new()
//!     .field("caption", "avatar")
//!     .attach("avatar", "tests/fixtures/test.txt")
//!     .attach_with(
//!         "report",
//!         Attachment::new("tests/fixtures/test.txt")
//!             .file_name("report.csv")
//!             .content_type("text/csv"),
//!     );
//! assert_eq!(body.fields().len(), 1);
//! assert_eq!(body.attachments().len(), 2);
//! ```

use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

/// Key holding the attachments in the record form accepted by
/// [`MultipartBody::from_value`].
pub const ATTACH_KEY: &str = "attach";

#[derive(Debug, thiserror::Error)]
pub enum MultipartError {
    #[error("multipart body must be a JSON object")]
    NotAnObject,
    #[error("`attach` must be an object of field name to file")]
    InvalidAttachments,
    #[error("attachment `{0}` needs a `file` path")]
    MissingFile(String),
    #[error("failed to read attachment `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One file part and its transport options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    path: PathBuf,
    file_name: Option<String>,
    content_type: Option<String>,
}

impl Attachment {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file_name: None,
            content_type: None,
        }
    }

    /// Overrides the file name sent to the server.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Overrides the guessed content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file name sent to the server: the override, else the last
    /// component of the path.
    pub fn resolved_file_name(&self) -> String {
        self.file_name.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// The content type sent to the server: the override, else a guess
    /// from the file extension.
    pub fn resolved_content_type(&self) -> String {
        self.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&self.path)
                .first_or_octet_stream()
                .to_string()
        })
    }
}

/// Plain fields plus file attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    fields: Vec<(String, String)>,
    attachments: Vec<(String, Attachment)>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Attaches the file at `path` with no extra options.
    pub fn attach(self, name: impl Into<String>, path: impl AsRef<Path>) -> Self {
        self.attach_with(name, Attachment::new(path))
    }

    pub fn attach_with(mut self, name: impl Into<String>, attachment: Attachment) -> Self {
        self.attachments.push((name.into(), attachment));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn attachments(&self) -> &[(String, Attachment)] {
        &self.attachments
    }

    /// Builds a body from a JSON record: every key except `attach` is a
    /// plain field; each `attach` entry is either a file path or an object
    /// with a `file` path and optional `filename` / `contentType`.
    ///
    /// ```
    /// use testbed::testing::MultipartBody;
    ///
    /// let body = MultipartBody::from_value(serde_json::json!({
    ///     "caption": "avatar",
    ///     "attach": { "avatar": "tests/fixtures/test.txt" }
    /// }))
    /// .unwrap();
    /// assert_eq!(body.attachments()[0].0, "avatar");
    /// ```
    pub fn from_value(value: Value) -> Result<Self, MultipartError> {
        let Value::Object(mut record) = value else {
            return Err(MultipartError::NotAnObject);
        };

        let mut body = Self::new();

        let attach = record.remove(ATTACH_KEY);
        for (name, value) in record {
            body = body.field(name, field_text(value));
        }

        match attach {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => {
                for (name, entry) in entries {
                    let attachment = match entry {
                        Value::Object(mut options) => {
                            let Some(Value::String(file)) = options.remove("file") else {
                                return Err(MultipartError::MissingFile(name));
                            };
                            let mut attachment = Attachment::new(file);
                            if let Some(Value::String(file_name)) = options.remove("filename") {
                                attachment = attachment.file_name(file_name);
                            }
                            if let Some(Value::String(content_type)) =
                                options.remove("contentType")
                            {
                                attachment = attachment.content_type(content_type);
                            }
                            attachment
                        }
                        Value::String(file) => Attachment::new(file),
                        _ => return Err(MultipartError::MissingFile(name)),
                    };
                    body = body.attach_with(name, attachment);
                }
            }
            Some(_) => return Err(MultipartError::InvalidAttachments),
        }

        Ok(body)
    }

    /// Reads every attachment and encodes the whole body.
    pub(crate) async fn encode(&self, boundary: &str) -> Result<Bytes, MultipartError> {
        let mut buf = BytesMut::new();

        for (name, value) in &self.fields {
            write_part_head(&mut buf, boundary, name, None, None);
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }

        for (name, attachment) in &self.attachments {
            let content = tokio::fs::read(&attachment.path)
                .await
                .map_err(|source| MultipartError::Read {
                    path: attachment.path.clone(),
                    source,
                })?;
            write_part_head(
                &mut buf,
                boundary,
                name,
                Some(&attachment.resolved_file_name()),
                Some(&attachment.resolved_content_type()),
            );
            buf.put_slice(&content);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        Ok(buf.freeze())
    }
}

/// A random boundary that will not appear in fixture content.
pub(crate) fn boundary() -> String {
    format!("----testbed{}", uuid::Uuid::new_v4().simple())
}

fn field_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn quote(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn write_part_head(
    buf: &mut BytesMut,
    boundary: &str,
    name: &str,
    file_name: Option<&str>,
    content_type: Option<&str>,
) {
    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
    buf.put_slice(quote(name).as_bytes());
    buf.put_slice(b"\"");
    if let Some(file_name) = file_name {
        buf.put_slice(b"; filename=\"");
        buf.put_slice(quote(file_name).as_bytes());
        buf.put_slice(b"\"");
    }
    if let Some(content_type) = content_type {
        buf.put_slice(b"\r\nContent-Type: ");
        buf.put_slice(content_type.as_bytes());
    }
    buf.put_slice(b"\r\n\r\n");
}
