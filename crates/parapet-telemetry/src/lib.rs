//! Logging infrastructure for the Parapet rendering pipeline.
//!
//! This crate provides:
//! - Structured JSON or pretty logging through `tracing-subscriber`
//! - Standard event names shared by the pipeline and the server
//! - `log_*!` macros that stamp those event names on every record
//!
//! # Usage
//!
//! ```ignore
//! use parapet_telemetry::{LogFormat, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Pretty);
//!
//! parapet_telemetry::init_logging(&config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{events, init_logging};

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "parapet");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_config_builder() {
        let config = TelemetryConfig::new()
            .with_service_name("docs-site")
            .with_log_level("debug")
            .with_log_format(LogFormat::Pretty);

        assert_eq!(config.service_name, "docs-site");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_second_init_fails() {
        let config = TelemetryConfig::new().with_log_format(LogFormat::Pretty);
        // Whichever call installs the subscriber first wins; the next one must fail.
        let _ = init_logging(&config);
        let result = init_logging(&config);
        assert!(matches!(result, Err(TelemetryError::LoggingInit(_))));
    }
}
