pub mod config;
pub mod error;
pub mod types;

pub use config::{parse_duration, SefazConfig};
pub use error::InputError;
pub use types::*;
