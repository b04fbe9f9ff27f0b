//! Outbound HTTP transport.
//!
//! [`Transport`] is the seam between the client's retry logic and the wire.
//! [`HttpTransport`] is the production implementation: a `reqwest` client
//! with a cookie jar, so session and refresh cookies set by the backend ride
//! along on every later call without this crate ever reading them.

use crate::{ApiError, ApiResult};
use async_trait::async_trait;
use backoffice_config::Config;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// HTTP methods the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Lowercase method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Patch => "patch",
            Method::Delete => "delete",
        }
    }

    /// Only `post`, `put` and `patch` carry a body.
    pub fn carries_body(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "put" => Ok(Method::Put),
            "patch" => Ok(Method::Patch),
            "delete" => Ok(Method::Delete),
            other => Err(ApiError::InvalidRequest(format!(
                "unsupported HTTP method: {other}"
            ))),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One outbound call: method, path relative to the base URL, query, body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    /// Attach a JSON body. Ignored for methods that do not carry one.
    pub fn with_body(mut self, body: Value) -> Self {
        if self.method.carries_body() {
            self.body = Some(body);
        } else {
            trace!(method = %self.method, path = %self.path, "Dropping body for bodiless method");
        }
        self
    }

    /// Attach an optional body; `None` leaves the request unchanged.
    pub fn with_optional_body(self, body: Option<Value>) -> Self {
        match body {
            Some(body) => self.with_body(body),
            None => self,
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// A response with any status. Interpreting the status is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: StatusCode,
    body: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body as JSON. An empty body (e.g. 204) decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        let raw = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        Ok(serde_json::from_str(raw)?)
    }

    /// Best human-readable message in an error body.
    ///
    /// Looks for the backend's `detail` or `error` fields and falls back to
    /// the raw body, or the status text when the body is empty.
    pub fn message(&self) -> String {
        #[derive(Deserialize)]
        struct ErrorBody {
            detail: Option<String>,
            error: Option<String>,
        }

        if let Ok(ErrorBody { detail, error }) = serde_json::from_str::<ErrorBody>(&self.body) {
            if let Some(message) = detail.or(error) {
                return message;
            }
        }

        let trimmed = self.body.trim();
        if trimmed.is_empty() {
            self.status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Sends one request and returns whatever the backend answered.
///
/// Implementations must return `Ok` for every HTTP response, including 4xx and
/// 5xx, and `Err` only when no response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse>;
}

/// Shared handle to a transport.
pub type TransportHandle = Arc<dyn Transport>;

/// `reqwest`-backed transport with a cookie jar.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport for `base_url`.
    ///
    /// The base URL may carry a path prefix; request paths are resolved
    /// beneath it.
    pub fn new(mut base_url: Url, timeout: Duration) -> ApiResult<Self> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Create a transport from the configured base URL and timeout.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::new(config.api_base_url()?, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path against the base URL.
    pub fn url_for(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let url = self.url_for(request.path())?;

        let mut builder = self
            .client
            .request(request.method().into(), url)
            .header(ACCEPT, "application/json");
        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else if e.is_connect() {
                ApiError::NetworkUnavailable
            } else {
                ApiError::Http(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(
            method = %request.method(),
            path = %request.path(),
            status = status.as_u16(),
            "Backend responded"
        );

        Ok(ApiResponse::new(status, body))
    }
}
