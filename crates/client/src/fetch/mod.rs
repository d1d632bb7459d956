//! HTTP fetch pipeline for intercepted resource requests.
//!
//! ### Transport caching
//! - The content store is the only cache: every request carries
//!   `Cache-Control: no-cache` and the client keeps no HTTP cache of its own.
//!
//! ### Request forwarding
//! - Method and headers from the descriptor are forwarded verbatim.
//! - Redirects follow reqwest's default policy.
//!
//! ### Results
//! - Any status the server returns is a successful fetch, including 4xx/5xx.
//! - Connect, DNS, timeout and protocol failures are `TransportError`s.
//! - Max body bytes: 25MB (configurable)

pub mod error;
pub mod media_type;

use bytes::Bytes;
use offcache_core::{AppConfig, CachedResponse, RequestDescriptor, ResponseSource};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use error::TransportError;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 25MB)
    pub max_bytes: usize,

    /// Overall request timeout (default: 20s)
    pub timeout: Duration,

    /// Connect timeout (default: 10s)
    pub connect_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offcache/0.1".to_string(),
            max_bytes: 25 * 1024 * 1024,
            timeout: Duration::from_millis(20_000),
            connect_timeout: Duration::from_millis(10_000),
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

/// Outcome of a single network round trip.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code
    pub status: u16,
    /// Canonical reason phrase for the status, empty if unknown
    pub reason_phrase: String,
    /// Resolved media type (declared or inferred from the URL)
    pub media_type: String,
    /// Declared charset or UTF-8
    pub encoding: String,
    /// Response headers, repeated values joined with ", "
    pub headers: Vec<(String, String)>,
    /// Response body bytes
    pub body: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResult {
    /// Whether this result may be written to the content store.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    pub fn into_response(self) -> CachedResponse {
        CachedResponse {
            status_code: self.status,
            reason_phrase: self.reason_phrase,
            media_type: self.media_type,
            encoding: self.encoding,
            headers: self.headers,
            body: self.body,
            source: ResponseSource::Network,
        }
    }
}

/// Performs one outbound request for an intercepted resource.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, descriptor: &RequestDescriptor) -> Result<FetchResult, TransportError>;
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }
}

fn request_headers(descriptor: &RequestDescriptor) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    for (name, value) in descriptor.headers() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header value for {name}: {e}")))?;
        headers.append(name, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(headers)
}

fn response_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), joined)
        })
        .collect()
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, descriptor: &RequestDescriptor) -> Result<FetchResult, TransportError> {
        let start = Instant::now();

        let url = url::Url::parse(descriptor.url())
            .map_err(|e| TransportError::InvalidRequest(format!("url {}: {e}", descriptor.url())))?;
        let method = Method::from_bytes(descriptor.method().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("method {}: {e}", descriptor.method())))?;

        let response = self
            .http
            .request(method, url)
            .headers(request_headers(descriptor)?)
            .send()
            .await?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(TransportError::TooLarge { size: len, limit: self.config.max_bytes });
        }

        let headers = response.headers().clone();
        let body = response.bytes().await?;

        if body.len() > self.config.max_bytes {
            return Err(TransportError::TooLarge { size: body.len() as u64, limit: self.config.max_bytes });
        }

        let declared = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
        let (media_type, encoding) = media_type::resolve(declared, descriptor.url());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            url = descriptor.url(),
            status = status.as_u16(),
            media_type = %media_type,
            bytes = body.len(),
            fetch_ms,
            "fetched resource"
        );

        Ok(FetchResult {
            status: status.as_u16(),
            reason_phrase: status.canonical_reason().unwrap_or_default().to_string(),
            media_type,
            encoding,
            headers: response_headers(&headers),
            body,
            fetch_ms,
        })
    }
}
