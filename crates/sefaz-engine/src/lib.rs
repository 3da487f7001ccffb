//! sefaz-engine — endpoint resolution and status aggregation.
//!
//! Given a region and environment, the engine decides which endpoint to
//! probe, probes the regional and national endpoints concurrently, and
//! returns both outcomes side by side.
//!
//! # Architecture
//!
//! ```text
//! StatusEngine::get_status(region, environment)
//!   ├── validate input (InvalidInput is the only error)
//!   ├── tokio::join!
//!   │   ├── regional side
//!   │   │   ├── Resolver::resolve()
//!   │   │   │   ├── EndpointCache hit → trust it
//!   │   │   │   ├── regional URL reachable? → cache + use
//!   │   │   │   └── national URL reachable? → cache under the region key
//!   │   │   ├── ProbeClient::probe()
//!   │   │   └── AutoHeal when a cached URL answers 404/405/410
//!   │   └── national side → ProbeClient::probe()
//!   └── AggregateStatus { regional, national }
//! ```
//!
//! # Self-Healing
//!
//! When a cached regional endpoint answers 404, 405 or 410, the heal rule
//! bumps the service version in its URL, persists the new URL to the
//! registry, and probes it exactly once. If that probe cannot get through
//! either, the previous URL is written back. Timeouts, 5xx replies and
//! classified "unavailable" answers never trigger a heal.

pub mod cache;
pub mod engine;
pub mod error;
pub mod heal;
pub mod resolver;
pub mod status;

pub use cache::{CachedEndpoint, EndpointCache};
pub use engine::{EnginePolicy, StatusEngine};
pub use error::{EngineError, ResolveError};
pub use heal::{AutoHeal, next_endpoint_version};
pub use resolver::{ResolvedEndpoint, Resolver};
pub use status::AggregateStatus;
