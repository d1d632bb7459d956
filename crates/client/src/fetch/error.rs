//! Transport failure types.

use std::sync::Arc;

/// Failures during the network round trip.
///
/// Every variant is recoverable from the engine's point of view: it falls back
/// to the content store instead of surfacing the error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The descriptor could not be turned into an HTTP request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connect or overall request timeout expired.
    #[error("request timeout")]
    Timeout,

    /// DNS resolution or TCP/TLS connect failed.
    #[error("connect error: {0}")]
    Connect(Arc<reqwest::Error>),

    /// Any other protocol or I/O failure while talking to the server.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body exceeded the configured byte limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: usize },

    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(Arc::new(err))
        } else {
            TransportError::Network(Arc::new(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = TransportError::TooLarge { size: 2048, limit: 1024 };
        assert!(err.to_string().contains("2048"));
        assert!(err.to_string().contains("1024"));

        let err = TransportError::InvalidRequest("bad method".to_string());
        assert!(err.to_string().contains("invalid request"));
    }
}
