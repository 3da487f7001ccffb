//! Probe client — one status exchange, always answered with a result.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use crate::classify::classify;
use crate::envelope;
use crate::result::ProbeResult;
use crate::transport::{Transport, TransportError, TransportRequest};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REACHABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends status probes and reachability checks through a [`Transport`].
#[derive(Clone)]
pub struct ProbeClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    reachability_timeout: Duration,
}

impl ProbeClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
            reachability_timeout: DEFAULT_REACHABILITY_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, timeout: Duration, reachability_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.reachability_timeout = reachability_timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn reachability_timeout(&self) -> Duration {
        self.reachability_timeout
    }

    /// Probe `url` on behalf of the region with `numeric_id`.
    pub async fn probe(&self, url: &str, numeric_id: &str) -> ProbeResult {
        self.probe_with_timeout(url, numeric_id, self.timeout).await
    }

    /// Probe with an explicit hard deadline covering connect, send, and read.
    pub async fn probe_with_timeout(
        &self,
        url: &str,
        numeric_id: &str,
        timeout: Duration,
    ) -> ProbeResult {
        let started = Instant::now();
        let request = TransportRequest {
            url: url.to_string(),
            body: Bytes::from(envelope::build(numeric_id)),
            content_type: envelope::CONTENT_TYPE,
            action: envelope::SOAP_ACTION,
        };

        let result = match tokio::time::timeout(timeout, self.transport.post(&request)).await {
            Err(_) => {
                ProbeResult::transport_failure(TransportError::Timeout(timeout).to_string(), started)
            }
            Ok(Err(e)) => ProbeResult::transport_failure(e.to_string(), started),
            Ok(Ok(resp)) if !resp.is_success() => {
                ProbeResult::transport_status(resp.status, started)
            }
            Ok(Ok(resp)) => ProbeResult::classified(classify(&resp.body), started),
        };

        debug!(
            %url,
            available = result.available(),
            reason = result.reason_text(),
            latency_ms = result.latency_ms(),
            "status probe finished"
        );
        result
    }

    /// Cheap connectivity check, bounded by the reachability timeout.
    pub async fn check_reachable(&self, url: &str) -> Result<(), TransportError> {
        match tokio::time::timeout(self.reachability_timeout, self.transport.reachable(url)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout(self.reachability_timeout)),
        }
    }
}
