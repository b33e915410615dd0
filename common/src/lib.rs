//! Shared building blocks for the telemetry node and its collector: the error
//! taxonomy, configuration, the telemetry data model, Diffie-Hellman key
//! agreement and the AES-128-CBC envelope.

pub mod error;
pub mod types;
pub mod config;
pub mod encryption;
pub mod logging;

pub use error::{TelemetryError, Result};
pub use types::*;
pub use config::*;
