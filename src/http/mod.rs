//! Rate-limited, retrying outbound HTTP client
//!
//! [`RateLimitedClient`] is the single path every outbound integration uses.
//! Each attempt first takes a permit from the shared
//! [`FixedWindowLimiter`], then sends the request with a per-call timeout.
//! Non-2xx responses and transport failures are attempt failures; retryable
//! ones are retried with the configured backoff (see [`crate::retry`]), and the
//! last failure surfaces as [`Error::ExternalApi`].

mod url_template;

pub use url_template::render_url;

use crate::config::{HttpConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::rate_limiter::FixedWindowLimiter;
use crate::retry::with_retry;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use url::Url;

/// Description of one outbound request
#[derive(Clone, Debug)]
pub struct RequestSpec {
    /// HTTP method
    pub method: Method,
    /// URL with `{name}` placeholders
    pub url_template: String,
    /// Values for the template placeholders
    pub path_params: BTreeMap<String, String>,
    /// Query parameters, merged over those in the template
    pub query: BTreeMap<String, String>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<serde_json::Value>,
    /// Retries after the first attempt; None uses the client's [`RetryConfig`]
    pub max_retries: Option<u32>,
}

impl RequestSpec {
    /// A request with the given method and URL template
    pub fn new(method: Method, url_template: impl Into<String>) -> Self {
        Self {
            method,
            url_template: url_template.into(),
            path_params: BTreeMap::new(),
            query: BTreeMap::new(),
            headers: Vec::new(),
            body: None,
            max_retries: None,
        }
    }

    /// A GET request
    pub fn get(url_template: impl Into<String>) -> Self {
        Self::new(Method::GET, url_template)
    }

    /// A POST request
    pub fn post(url_template: impl Into<String>) -> Self {
        Self::new(Method::POST, url_template)
    }

    /// Set a path placeholder value
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Set a query parameter
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a request header
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send a JSON body
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the number of retries for this request
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Render the final URL
    pub fn url(&self) -> Result<Url> {
        render_url(&self.url_template, &self.path_params, &self.query)
    }
}

/// A successful (2xx) response
#[derive(Clone, Debug)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Vec<u8>,
    /// URL the request was sent to
    pub url: String,
}

impl RawResponse {
    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Value of the Content-Type header without parameters
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty())
    }
}

/// A downloaded file, not yet stored
#[derive(Clone, Debug)]
pub struct DownloadedFile {
    /// File name from Content-Disposition or the URL
    pub file_name: String,
    /// MIME type reported by the server
    pub content_type: Option<String>,
    /// File contents
    pub bytes: Vec<u8>,
}

/// HTTP client that rate limits and retries every call
#[derive(Clone)]
pub struct RateLimitedClient {
    http: reqwest::Client,
    limiter: FixedWindowLimiter,
    retry: RetryConfig,
}

impl RateLimitedClient {
    /// Build a client sharing the given limiter
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be created
    pub fn new(
        http_config: &HttpConfig,
        retry: RetryConfig,
        limiter: FixedWindowLimiter,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(http_config.timeout)
            .user_agent(http_config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            limiter,
            retry,
        })
    }

    /// The limiter shared by this client
    pub fn limiter(&self) -> &FixedWindowLimiter {
        &self.limiter
    }

    /// Send a request, rate limited and retried
    ///
    /// # Errors
    /// [`Error::InvalidUrl`] when the template cannot be rendered, otherwise
    /// [`Error::ExternalApi`] carrying the last status and body once retries are spent
    pub async fn call(&self, spec: &RequestSpec) -> Result<RawResponse> {
        let url = spec.url()?;

        let mut retry = self.retry.clone();
        if let Some(max_retries) = spec.max_retries {
            retry.max_attempts = max_retries;
        }

        tracing::debug!(method = %spec.method, url = %url, "outbound call");
        with_retry(&retry, || self.attempt(spec, url.clone())).await
    }

    /// Send a request and decode the JSON response
    pub async fn call_json<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T> {
        self.call(spec).await?.json()
    }

    /// Download a file
    pub async fn download(&self, spec: &RequestSpec) -> Result<DownloadedFile> {
        let response = self.call(spec).await?;
        let file_name = crate::utils::file_name_from_response(&response.headers, &response.url);
        let content_type = response.content_type();

        Ok(DownloadedFile {
            file_name,
            content_type,
            bytes: response.body,
        })
    }

    async fn attempt(&self, spec: &RequestSpec, url: Url) -> Result<RawResponse> {
        self.limiter.acquire().await;

        let url_string = url.to_string();
        let mut request = self.http.request(spec.method.clone(), url);
        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| Error::ExternalApi {
            status: e.status().map(|s| s.as_u16()),
            body: e.to_string(),
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| Error::ExternalApi {
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(Error::ExternalApi {
                status: Some(status.as_u16()),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            headers,
            body: body.to_vec(),
            url: url_string,
        })
    }
}
