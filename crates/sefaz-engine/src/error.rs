//! Error types for the status engine.

use sefaz_core::{Environment, InputError, RegionCode};
use thiserror::Error;

/// Why no endpoint URL could be produced for a region.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The registry has no URL to try; no network call was made.
    #[error("no endpoint configured for {region}/{environment}")]
    NotConfigured {
        region: RegionCode,
        environment: Environment,
    },

    /// Every candidate failed its reachability check.
    #[error("no active endpoint for {region}/{environment}: {detail}")]
    NoEndpointAvailable {
        region: RegionCode,
        environment: Environment,
        detail: String,
    },
}

/// Errors returned to callers of the engine.
///
/// Anything about the remote service is reported inside the result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),
}
