//! Request Wrapper
//!
//! Single-attempt JSON requests against the configured base URL. Retries,
//! timeouts and cancellation are left to callers.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::response::{decode_response, Payload};
use crate::config::ApiConfig;
use crate::storage::LocalStore;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Characters escaped when an id is placed in a path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in query values
const QUERY: &AsciiSet = &SEGMENT.add(b'&').add(b'=').add(b'+');

pub(crate) fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

pub(crate) fn query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY).to_string()
}

/// Method, body and extra headers for one request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl From<Method> for RequestOptions {
    fn from(method: Method) -> Self {
        Self::new(method)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn json<B: Serialize + ?Sized>(method: Method, body: &B) -> ApiResult<Self> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        Ok(Self {
            body: Some(body),
            ..Self::new(method)
        })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
    store: Arc<LocalStore>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, store: Arc<LocalStore>) -> Self {
        Self::with_http_client(config, store, reqwest::Client::new())
    }

    /// Use a preconfigured `reqwest::Client` (proxy, TLS roots, ...)
    pub fn with_http_client(config: ApiConfig, store: Arc<LocalStore>, http: reqwest::Client) -> Self {
        Self {
            http,
            config: Arc::new(config),
            store,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    /// Issue one request and normalize the response.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResult<Payload<T>> {
        let url = self.config.endpoint_url(endpoint);
        let mut builder = self.http.request(options.method.clone(), &url);

        if self.config.is_own_url(&url) {
            if let Some(key) = &self.config.api_key {
                builder = builder.header(API_KEY_HEADER, key);
            }
            if let Some(token) = self.store.access_token() {
                builder = builder.bearer_auth(token);
            }
        } else {
            debug!(%url, "foreign url, sending without credentials");
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        debug!(method = %options.method, %url, "api request");
        let response = builder.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        let result = decode_response(status, content_type.as_deref(), &body);
        if let Err(err) = &result {
            warn!(method = %options.method, %url, status = status.as_u16(), "api request failed: {err}");
        }
        result
    }

    /// Like [`request`](Self::request) but a body is mandatory.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        self.request(endpoint, options).await?.into_json()
    }

    // ========================
    // Convenience Helpers
    // ========================

    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        self.request_json(endpoint, RequestOptions::new(Method::GET))
            .await
    }

    /// GET where an empty body means "nothing there"
    pub async fn get_optional<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<Option<T>> {
        Ok(self
            .request(endpoint, RequestOptions::new(Method::GET))
            .await?
            .into_option())
    }

    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(endpoint, RequestOptions::json(Method::POST, body)?)
            .await
    }

    pub async fn put_json<B, T>(&self, endpoint: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(endpoint, RequestOptions::json(Method::PUT, body)?)
            .await
    }

    pub async fn patch_json<B, T>(&self, endpoint: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json(endpoint, RequestOptions::json(Method::PATCH, body)?)
            .await
    }

    /// Fire a request whose response body is irrelevant
    pub async fn send(&self, method: Method, endpoint: &str) -> ApiResult<()> {
        self.request::<IgnoredAny>(endpoint, RequestOptions::new(method))
            .await
            .map(|_| ())
    }

    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> ApiResult<()> {
        self.request::<IgnoredAny>(endpoint, RequestOptions::json(method, body)?)
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, endpoint: &str) -> ApiResult<()> {
        self.send(Method::DELETE, endpoint).await
    }
}
