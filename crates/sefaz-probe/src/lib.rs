//! sefaz-probe — status probes against NF-e authority endpoints.
//!
//! A probe posts a fixed SOAP envelope (`nfeStatusServicoNF`) carrying the
//! region's numeric identifier, then classifies the reply into a
//! [`ProbeResult`]. Transport problems are ordinary outcomes here: they come
//! back as an unavailable result, never as an error.
//!
//! # Architecture
//!
//! ```text
//! ProbeClient
//!   ├── envelope::build()        → SOAP body + headers
//!   ├── dyn Transport            → HyperTransport (hyper + rustls)
//!   │                              ScriptedTransport (canned replies)
//!   └── classify::classify()     → Classification → ProbeResult
//! ```
//!
//! The classifier matches elements by local name only, since providers
//! disagree on namespaces.

pub mod classify;
pub mod client;
pub mod envelope;
pub mod hyper_transport;
pub mod result;
pub mod scripted;
pub mod transport;

pub use classify::{Classification, classify};
pub use client::ProbeClient;
pub use hyper_transport::HyperTransport;
pub use result::{FailureKind, ProbeResult};
pub use scripted::{ScriptedReply, ScriptedTransport};
pub use transport::{Transport, TransportError, TransportRequest, TransportResponse};
