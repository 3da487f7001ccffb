//! sefaz-registry — region registry for the SEFAZ status engine.
//!
//! Maps each region code (plus the reserved `NATIONAL` key) to its status
//! service URL per environment. The registry is read-mostly: resolution
//! reads it on every cache miss, and only auto-heal rewrites entries.
//!
//! # Persistence
//!
//! The backing file is a JSON document:
//!
//! ```text
//! {
//!   "SP":       { "production": "https://...", "homologation": "https://..." },
//!   "NATIONAL": { "production": "https://...", "homologation": "https://..." }
//! }
//! ```
//!
//! Every write goes to a temporary file in the same directory which is then
//! renamed over the original, so a crash never leaves a torn document.
//! In memory, an update swaps the whole document under a write lock, so a
//! reader never observes a partially written URL.

pub mod document;
pub mod error;
pub mod store;

pub use document::RegistryDocument;
pub use error::{RegistryError, RegistryResult};
pub use store::RegionRegistry;
