//! Client configuration with sensible defaults and RON persistence.

mod config;
mod error;

pub use config::{Config, DebugConfig, NetworkConfig};
pub use error::ConfigError;
