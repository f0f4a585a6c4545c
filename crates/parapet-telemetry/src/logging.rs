//! Structured logging for the rendering pipeline.
//!
//! JSON to stdout when serving, pretty output for the dev server.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

/// Initialize the logging subsystem.
///
/// Installs a tracing-subscriber registry with either JSON or pretty
/// output, filtered by `RUST_LOG` or the configured level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt_layer(config.log_format).with_filter(filter))
        .try_init()
        .map_err(|e: TryInitError| TelemetryError::LoggingInit(e.to_string()))?;

    crate::log_startup!(
        service = %config.service_name,
        log_level = %config.log_level,
        "logging initialized"
    );
    Ok(())
}

/// Output layer for a format: flattened JSON lines or multi-line pretty
/// records with source locations.
fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_target(true);
    match format {
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => layer
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    }
}

/// Standard log event names.
pub mod events {
    /// Server is starting up.
    pub const STARTUP: &str = "startup";

    /// Server is listening on a port.
    pub const LISTENING: &str = "listening";

    /// Request has been completed.
    pub const REQUEST_COMPLETED: &str = "request_completed";

    /// A route has been rendered by the pipeline.
    pub const ROUTE_RENDERED: &str = "route_rendered";

    /// An endpoint payload used a field that is ignored in SSR.
    pub const ENDPOINT_PAYLOAD_WARNING: &str = "endpoint_payload_warning";

    /// The development route cache was emptied.
    pub const ROUTE_CACHE_CLEARED: &str = "route_cache_cleared";

    /// Middleware answered without running its continuation.
    pub const MIDDLEWARE_SHORT_CIRCUIT: &str = "middleware_short_circuit";

    /// Rendering failed and was turned into an error response.
    pub const RENDER_ERROR: &str = "render_error";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::STARTUP,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::LISTENING,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_request_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::REQUEST_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_rendered {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::ROUTE_RENDERED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_endpoint_payload_warning {
    ($($field:tt)*) => {
        tracing::warn!(
            target: "ssr",
            event = $crate::logging::events::ENDPOINT_PAYLOAD_WARNING,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_cache_cleared {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::ROUTE_CACHE_CLEARED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_middleware_short_circuit {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::MIDDLEWARE_SHORT_CIRCUIT,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_render_error {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::RENDER_ERROR,
            $($field)*
        )
    };
}
