//! Telemetry configuration.

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON output (production servers).
    #[default]
    Json,
    /// Human-readable pretty output (dev server, builds).
    Pretty,
}

impl LogFormat {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to startup events (default: "parapet").
    pub service_name: String,

    /// Log level filter (default: "info").
    /// `RUST_LOG` takes precedence when set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "parapet".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
        }
    }
}

impl TelemetryConfig {
    /// Create a new telemetry config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service name.
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }
}
