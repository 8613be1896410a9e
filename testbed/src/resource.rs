//! Resource path resolution.
//!
//! A resource name expands into the conventional CRUD templates:
//!
//! | purpose  | default template          |
//! |----------|---------------------------|
//! | list     | `/{resource}`             |
//! | single   | `/{resource}/:id`         |
//! | schema   | `/{resource}/schema`      |
//! | export   | `/{resource}/export`      |
//! | upload   | `/{resource}/upload`      |
//! | download | `/{resource}/download`    |
//! | stream   | `/{resource}/stream`      |
//!
//! Any of them can be given explicitly, which is how nested resources
//! such as `/users/:user/comments/:id` are described. Without a resource
//! name only the explicit templates exist, and the helpers for the others
//! fail when called. A router version is prefixed to every template.

use http::Method;
use serde::Serialize;

use crate::params::Params;
use crate::template::{RouteTemplate, TemplateError};
use crate::testing::{DownloadOptions, MultipartBody, TestClient, TestRequestBuilder};

/// Resource name and explicit path templates.
///
/// ```
/// use testbed::resource::ResourceOptions;
///
/// let nested = ResourceOptions::new()
///     .path_list("/users/:user/comments")
///     .path_single("/users/:user/comments/:id")
///     .path_schema("/users/:user/comments/schema")
///     .resolve(Some("1.0.0"))
///     .unwrap();
/// assert_eq!(nested.single().unwrap().as_str(), "/1.0.0/users/:user/comments/:id");
/// assert!(nested.export().is_err());
///
/// let users = ResourceOptions::from("users").resolve(None).unwrap();
/// assert_eq!(users.export().unwrap().as_str(), "/users/export");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceOptions {
    resource: Option<String>,
    /// Default `/{resource}`.
    path_list: Option<String>,
    /// Default `/{resource}/:id`.
    path_single: Option<String>,
    /// Default `/{resource}/schema`.
    path_schema: Option<String>,
    /// Default `/{resource}/export`.
    path_export: Option<String>,
    /// Default `/{resource}/upload`.
    path_upload: Option<String>,
    /// Default `/{resource}/download`.
    path_download: Option<String>,
    /// Default `/{resource}/stream`.
    path_stream: Option<String>,
}

macro_rules! path_setter {
    ($($field:ident),* $(,)?) => {
        $(
            pub fn $field(mut self, template: impl Into<String>) -> Self {
                self.$field = Some(template.into());
                self
            }
        )*
    };
}

impl ResourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    path_setter!(
        path_list,
        path_single,
        path_schema,
        path_export,
        path_upload,
        path_download,
        path_stream,
    );

    /// The explicit template, else one derived from the resource name.
    fn template(&self, explicit: &Option<String>, suffix: &str) -> Option<String> {
        explicit.clone().or_else(|| {
            self.resource
                .as_ref()
                .map(|resource| format!("/{resource}{suffix}"))
        })
    }

    /// Compiles every template that is given or derivable, prefixed with
    /// `/{version}` when given. Templates that are neither stay absent.
    pub fn resolve(&self, version: Option<&str>) -> Result<ResourcePaths, TemplateError> {
        let compile = |explicit: &Option<String>, suffix: &str| {
            self.template(explicit, suffix)
                .map(|template| RouteTemplate::prefixed(version, &template))
                .transpose()
        };

        Ok(ResourcePaths {
            list: compile(&self.path_list, "")?,
            single: compile(&self.path_single, "/:id")?,
            schema: compile(&self.path_schema, "/schema")?,
            export: compile(&self.path_export, "/export")?,
            upload: compile(&self.path_upload, "/upload")?,
            download: compile(&self.path_download, "/download")?,
            stream: compile(&self.path_stream, "/stream")?,
        })
    }
}

impl From<&str> for ResourceOptions {
    fn from(resource: &str) -> Self {
        Self::new().resource(resource)
    }
}

impl From<String> for ResourceOptions {
    fn from(resource: String) -> Self {
        Self::new().resource(resource)
    }
}

/// Compiled templates for one resource; `None` where a purpose has no
/// template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    pub list: Option<RouteTemplate>,
    pub single: Option<RouteTemplate>,
    pub schema: Option<RouteTemplate>,
    pub export: Option<RouteTemplate>,
    pub upload: Option<RouteTemplate>,
    pub download: Option<RouteTemplate>,
    pub stream: Option<RouteTemplate>,
}

fn require<'t>(
    template: &'t Option<RouteTemplate>,
    purpose: &'static str,
) -> Result<&'t RouteTemplate, TemplateError> {
    template
        .as_ref()
        .ok_or(TemplateError::Unresolved { purpose })
}

impl ResourcePaths {
    pub fn list(&self) -> Result<&RouteTemplate, TemplateError> {
        require(&self.list, "list")
    }

    pub fn single(&self) -> Result<&RouteTemplate, TemplateError> {
        require(&self.single, "single")
    }

    pub fn schema(&self) -> Result<&RouteTemplate, TemplateError> {
        require(&self.schema, "schema")
    }

    pub fn export(&self) -> Result<&RouteTemplate, TemplateError> {
        require(&self.export, "export")
    }

    pub fn upload(&self) -> Result<&RouteTemplate, TemplateError> {
        require(&self.upload, "upload")
    }

    pub fn download(&self) -> Result<&RouteTemplate, TemplateError> {
        require(&self.download, "download")
    }

    pub fn stream(&self) -> Result<&RouteTemplate, TemplateError> {
        require(&self.stream, "stream")
    }

    /// The list path for list addresses, the single path otherwise.
    pub fn get(&self, params: &Params) -> Result<String, TemplateError> {
        let template = if params.is_single() {
            self.single()?
        } else {
            self.list()?
        };
        template.render(&params.to_bag())
    }
}

/// Request builders bound to one resource's paths.
///
/// Every builder renders its template first. It fails with
/// [`TemplateError::Unresolved`] when the resource has no template for
/// that purpose, and with [`TemplateError::MissingParameter`] when a
/// required parameter is missing.
pub struct RouterHelpers<'a> {
    client: &'a TestClient,
    paths: ResourcePaths,
}

impl<'a> RouterHelpers<'a> {
    pub(crate) fn new(client: &'a TestClient, paths: ResourcePaths) -> Self {
        Self { client, paths }
    }

    pub fn paths(&self) -> &ResourcePaths {
        &self.paths
    }

    fn json(
        &self,
        method: Method,
        template: Result<&RouteTemplate, TemplateError>,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        let path = template?.render(&params.into().to_bag())?;
        Ok(self.client.json_request(method, &path))
    }

    fn download(
        &self,
        template: Result<&RouteTemplate, TemplateError>,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        let path = template?.render(&params.into().to_bag())?;
        Ok(self
            .client
            .get(&path)
            .download(DownloadOptions::default()))
    }

    /// `OPTIONS` on the list path.
    pub fn test_option(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.json(Method::OPTIONS, self.paths.list(), params)
    }

    /// `HEAD` on the list path.
    pub fn test_head(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.json(Method::HEAD, self.paths.list(), params)
    }

    /// `GET` on the single path for single addresses, the list path
    /// otherwise.
    pub fn test_get(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        let path = self.paths.get(&params.into())?;
        Ok(self.client.json_request(Method::GET, &path))
    }

    /// `GET` on the schema path.
    pub fn test_get_schema(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.json(Method::GET, self.paths.schema(), params)
    }

    /// Download of the export path.
    pub fn test_get_export(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.download(self.paths.export(), params)
    }

    /// Same as [`RouterHelpers::test_get_export`].
    pub fn test_export(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.test_get_export(params)
    }

    /// Download of the download path.
    pub fn test_download(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.download(self.paths.download(), params)
    }

    /// Download of the stream path.
    pub fn test_stream(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.download(self.paths.stream(), params)
    }

    /// Multipart `POST` to the upload path.
    pub fn test_upload(
        &self,
        params: impl Into<Params>,
        body: MultipartBody,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        let path = self.paths.upload()?.render(&params.into().to_bag())?;
        Ok(self.client.post(&path).multipart(body))
    }

    /// `POST` to the list path; the body defaults to `{}`.
    pub fn test_post(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.json(Method::POST, self.paths.list(), params)
    }

    /// `PATCH` of `body` to the single path.
    pub fn test_patch<T: Serialize + ?Sized>(
        &self,
        params: impl Into<Params>,
        body: &T,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        Ok(self
            .json(Method::PATCH, self.paths.single(), params)?
            .json(body))
    }

    /// `PUT` of `body` to the single path.
    pub fn test_put<T: Serialize + ?Sized>(
        &self,
        params: impl Into<Params>,
        body: &T,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        Ok(self.json(Method::PUT, self.paths.single(), params)?.json(body))
    }

    /// `DELETE` on the single path.
    pub fn test_delete(
        &self,
        params: impl Into<Params>,
    ) -> Result<TestRequestBuilder<'a>, TemplateError> {
        self.json(Method::DELETE, self.paths.single(), params)
    }
}
