//! Request and response values exchanged between the host, the engine and the fetcher.

use bytes::Bytes;
use serde::Serialize;

/// An intercepted resource request.
///
/// Immutable once built. Only the URL takes part in cache identity; method and
/// headers are forwarded to the network but never hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    url: String,
    method: String,
    headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    /// Create a descriptor for the given method and URL with no headers.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { url: url.into(), method: method.into().to_ascii_uppercase(), headers: Vec::new() }
    }

    /// Shorthand for a `GET` request, the common case for page resources.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Append a request header. Order of insertion is preserved.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

/// Where a response handed back to the host came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
}

/// Response handed back to the host for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status_code: u16,
    pub reason_phrase: String,
    pub media_type: String,
    pub encoding: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl CachedResponse {
    /// Encoding reported for responses replayed from disk.
    pub const CACHED_ENCODING: &'static str = "UTF-8";

    /// Build a `200 OK` response from a stored entry.
    ///
    /// Stored entries keep only body and media type, so headers are empty.
    pub fn from_cache(body: Bytes, media_type: String) -> Self {
        Self {
            status_code: 200,
            reason_phrase: "OK".to_string(),
            media_type,
            encoding: Self::CACHED_ENCODING.to_string(),
            headers: Vec::new(),
            body,
            source: ResponseSource::Cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_preserves_header_order() {
        let descriptor = RequestDescriptor::get("https://docs.example.com/app.js")
            .with_header("Accept", "*/*")
            .with_header("X-Requested-With", "offcache")
            .with_header("Accept-Language", "en");

        let names: Vec<&str> = descriptor.headers().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["Accept", "X-Requested-With", "Accept-Language"]);
        assert_eq!(descriptor.method(), "GET");
    }

    #[test]
    fn test_descriptor_uppercases_method() {
        let descriptor = RequestDescriptor::new("post", "https://example.com/api");
        assert_eq!(descriptor.method(), "POST");
    }

    #[test]
    fn test_from_cache_defaults() {
        let response = CachedResponse::from_cache(Bytes::from_static(b"body{}"), "text/css".into());
        assert_eq!(response.status_code, 200);
        assert_eq!(response.reason_phrase, "OK");
        assert_eq!(response.encoding, "UTF-8");
        assert_eq!(response.source, ResponseSource::Cache);
        assert!(response.headers.is_empty());
    }
}
