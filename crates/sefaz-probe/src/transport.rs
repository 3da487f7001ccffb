//! The network seam probes go through.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors raised by a transport. Probes turn these into unavailable results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid url {0:?}")]
    InvalidUrl(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("tls handshake failed: {0}")]
    Tls(String),

    #[error("http exchange failed: {0}")]
    Http(String),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// A status request ready to be sent.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub body: Bytes,
    pub content_type: &'static str,
    pub action: &'static str,
}

/// Raw reply from an endpoint.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends status requests and performs reachability checks.
///
/// Implementations do not enforce timeouts; [`crate::ProbeClient`] wraps
/// every call in its own deadline.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post a request and return the raw reply.
    async fn post(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Cheap liveness check: can a connection be opened to the URL's host?
    async fn reachable(&self, url: &str) -> Result<(), TransportError>;
}
