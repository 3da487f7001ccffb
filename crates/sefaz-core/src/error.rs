//! Input validation errors shared by every layer.

use thiserror::Error;

/// A request argument that cannot be turned into a probe target.
///
/// These are the only failures that map to a client error; everything
/// about the remote service is reported as a result instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("invalid region: {0:?}")]
    InvalidRegion(String),

    #[error("invalid environment: {0:?} (expected \"production\" or \"homologation\")")]
    InvalidEnvironment(String),
}
