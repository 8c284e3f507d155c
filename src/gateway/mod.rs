//! Remote Data Gateway: the single chokepoint for outbound HTTP requests.
//!
//! Prefixes the API base path, merges default headers with caller headers,
//! attaches the CSRF token to mutating requests and the bearer token when one
//! is stored, keeps a cookie jar for session continuity, and normalizes every
//! failure into [`ApiError`]. Failures are also published on the [`ErrorBus`].
//! The gateway never retries.

mod events;
mod response;

pub use events::{ApiErrorEvent, ErrorBus};
pub use response::{parse_content_disposition_filename, ApiResponse, Download};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::Settings;
use crate::error::{ApiError, ApiResult};
use crate::storage::{KeyValueStore, AUTH_TOKEN_KEY};

/// Header carrying the CSRF token.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Request body variants.
pub enum RequestBody {
    Json(serde_json::Value),
    /// Multipart upload; the client sets its own Content-Type with boundary.
    Multipart(Form),
}

/// Per-request options.
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<RequestBody>,
    /// Caller headers; these win over the defaults.
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize>(mut self, body: &B) -> ApiResult<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    pub fn multipart(mut self, form: Form) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    fn is_mutating(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::DELETE)
    }
}

/// HTTP gateway shared by every feature.
#[derive(Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
    csrf_token: Arc<RwLock<Option<String>>>,
    store: Arc<dyn KeyValueStore>,
    errors: ErrorBus,
}

impl Gateway {
    /// Create a gateway from settings.
    pub fn new(settings: &Settings, store: Arc<dyn KeyValueStore>) -> ApiResult<Self> {
        Self::with_base_url(
            &settings.api_base(),
            &settings.user_agent,
            settings.request_timeout(),
            store,
        )
        .map(|gw| gw.with_csrf_token(settings.csrf_token.clone()))
    }

    /// Create a gateway for an explicit API base such as `http://host/api`.
    pub fn with_base_url(
        base_url: &str,
        user_agent: &str,
        timeout: Duration,
        store: Arc<dyn KeyValueStore>,
    ) -> ApiResult<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ApiError::Network(format!("invalid base URL {}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::Network(format!("invalid base URL {}", base_url)));
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            csrf_token: Arc::new(RwLock::new(None)),
            store,
            errors: ErrorBus::new(),
        })
    }

    pub fn with_csrf_token(self, token: Option<String>) -> Self {
        self.set_csrf_token(token);
        self
    }

    /// Replace the CSRF token (e.g. after reading it from a page).
    pub fn set_csrf_token(&self, token: Option<String>) {
        *self.csrf_token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn errors(&self) -> &ErrorBus {
        &self.errors
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Absolute URL for an endpoint, with or without a leading slash.
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Issue a request and decode the body by its declared content type.
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> ApiResult<ApiResponse> {
        let result: ApiResult<ApiResponse> = async {
            let response = self.execute(endpoint, options).await?;
            read_body(response).await
        }
        .await;
        self.report(endpoint, result)
    }

    /// Issue a request and decode a JSON body into `T`.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let result = match self.request(endpoint, options).await {
            Ok(body) => body.into_json(),
            Err(e) => return Err(e),
        };
        // Decode failures are failures too
        self.report(endpoint, result)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        self.request_json(endpoint, RequestOptions::get()).await
    }

    /// Issue a request whose body is ignored.
    pub async fn request_unit(&self, endpoint: &str, options: RequestOptions) -> ApiResult<()> {
        self.request(endpoint, options).await.map(|_| ())
    }

    /// Fetch a binary body.
    pub async fn download(&self, endpoint: &str) -> ApiResult<Download> {
        let options = RequestOptions::get().header(ACCEPT.as_str(), "*/*");
        let result: ApiResult<Download> = async {
            let response = self.execute(endpoint, options).await?;
            let headers = collect_headers(&response);
            let bytes = response.bytes().await?.to_vec();
            Ok(Download { headers, bytes })
        }
        .await;
        self.report(endpoint, result)
    }

    fn report<T>(&self, endpoint: &str, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(ref e) = result {
            error!("API error ({}): {}", endpoint, e);
            self.errors.publish(ApiErrorEvent::new(endpoint, e));
        }
        result
    }

    /// Send the request; non-success statuses become [`ApiError::Http`].
    async fn execute(&self, endpoint: &str, options: RequestOptions) -> ApiResult<Response> {
        let url = self.url(endpoint);
        let headers = self.build_headers(&options)?;
        let method = options.method.clone();

        let mut request = self.client.request(method.clone(), &url).headers(headers);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        request = match options.body {
            Some(RequestBody::Json(value)) => request.body(serde_json::to_vec(&value)?),
            Some(RequestBody::Multipart(form)) => request.multipart(form),
            None => request,
        };

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        debug!("{} {} -> {} in {:?}", method, url, status.as_u16(), start.elapsed());

        if status.is_success() {
            return Ok(response);
        }

        let body = read_body(response).await.ok();
        let message = body
            .as_ref()
            .and_then(response::error_message)
            .or_else(|| status.canonical_reason().map(|s| s.to_string()))
            .unwrap_or_else(|| "API request failed".to_string());
        let payload = body.map(|b| match b {
            ApiResponse::Json(v) => v,
            ApiResponse::Text(t) => serde_json::Value::String(t),
        });

        Err(ApiError::Http {
            status,
            message,
            payload,
        })
    }

    fn build_headers(&self, options: &RequestOptions) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if !matches!(options.body, Some(RequestBody::Multipart(_))) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::Network(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::Network(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        if options.is_mutating() {
            let csrf = self.csrf_token.read().unwrap_or_else(|e| e.into_inner()).clone();
            if let Some(token) = csrf {
                if let Ok(value) = HeaderValue::from_str(&token) {
                    headers.insert(HeaderName::from_static("x-csrf-token"), value);
                }
            }
        }

        if let Some(token) = self.auth_token() {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(headers)
    }

    fn auth_token(&self) -> Option<String> {
        match self.store.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Could not read auth token: {}", e);
                None
            }
        }
    }
}

async fn read_body(response: Response) -> ApiResult<ApiResponse> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    if is_json {
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(ApiResponse::Json(serde_json::Value::Null));
        }
        Ok(ApiResponse::Json(serde_json::from_slice(&bytes)?))
    } else {
        Ok(ApiResponse::Text(response.text().await?))
    }
}

fn collect_headers(response: &Response) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.to_string(), v.to_string());
        }
    }
    headers
}
