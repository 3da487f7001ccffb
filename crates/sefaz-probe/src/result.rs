//! Normalized probe outcome.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::classify::Classification;

/// Why a probe could not produce a classified answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Timeout, connection failure, or non-success HTTP status.
    Transport,
    /// The endpoint answered with something that is not a status reply.
    Unrecognized,
    /// The registry has no URL for the requested region/environment.
    NotConfigured,
    /// Neither the regional nor the national endpoint was reachable.
    NoActiveEndpoint,
}

/// Outcome of one status probe.
///
/// `available` is only ever computed from `reason_code`/`reason_text` by the
/// classifier, so the fields are private and results come from constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    available: bool,
    reason_code: Option<String>,
    reason_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureKind>,
    /// HTTP status of a non-success reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    simulated: bool,
    /// Unix timestamp (milliseconds) when the probe completed.
    received_at: u64,
    latency_ms: u64,
}

impl ProbeResult {
    /// Result of a reply that was parsed and classified.
    pub fn classified(classification: Classification, started: Instant) -> Self {
        let failure = (!classification.recognized).then_some(FailureKind::Unrecognized);
        Self {
            available: classification.available,
            reason_code: classification.reason_code,
            reason_text: classification.reason_text,
            failure,
            http_status: None,
            simulated: false,
            received_at: epoch_millis(),
            latency_ms: elapsed_millis(started),
        }
    }

    /// The exchange itself failed; `reason` is the transport error message.
    pub fn transport_failure(reason: impl Into<String>, started: Instant) -> Self {
        Self::unavailable(FailureKind::Transport, reason.into(), started)
    }

    /// The endpoint answered with a non-success HTTP status.
    pub fn transport_status(status: u16, started: Instant) -> Self {
        Self {
            http_status: Some(status),
            ..Self::transport_failure(format!("transport status {status}"), started)
        }
    }

    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self::unavailable(FailureKind::NotConfigured, reason.into(), Instant::now())
    }

    pub fn no_active_endpoint(reason: impl Into<String>) -> Self {
        Self::unavailable(FailureKind::NoActiveEndpoint, reason.into(), Instant::now())
    }

    /// Stand-in "in operation" answer used when mock-on-failure is enabled.
    ///
    /// Still goes through the classifier so `available` stays derived.
    pub fn simulated(started: Instant) -> Self {
        let classification = Classification::from_fields(
            Some(crate::classify::IN_OPERATION_CODE.to_string()),
            Some("Servico em Operacao (simulado)".to_string()),
        );
        Self {
            simulated: true,
            ..Self::classified(classification, started)
        }
    }

    fn unavailable(kind: FailureKind, reason_text: String, started: Instant) -> Self {
        Self {
            available: false,
            reason_code: None,
            reason_text,
            failure: Some(kind),
            http_status: None,
            simulated: false,
            received_at: epoch_millis(),
            latency_ms: elapsed_millis(started),
        }
    }

    pub fn available(&self) -> bool {
        self.available
    }

    pub fn reason_code(&self) -> Option<&str> {
        self.reason_code.as_deref()
    }

    pub fn reason_text(&self) -> &str {
        &self.reason_text
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    /// True when the endpoint could not be talked to at all.
    pub fn is_transport_failure(&self) -> bool {
        self.failure == Some(FailureKind::Transport)
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// True when the reply says the service no longer lives at this URL
    /// (404, 405 or 410), as opposed to being down or overloaded.
    pub fn is_retired_endpoint(&self) -> bool {
        self.is_transport_failure() && matches!(self.http_status, Some(404 | 405 | 410))
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    pub fn received_at(&self) -> u64 {
        self.received_at
    }

    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn elapsed_millis(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
