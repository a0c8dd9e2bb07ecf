//! Telecfg Common Library
//!
//! Shared types and utilities for the telemetry configuration provisioning tools:
//!
//! - [`config`] - Configuration loading (JSON5 format) and logging settings
//! - [`report`] - Provisioning outcome records published for dashboards
//! - [`serialization`] - JSON/CBOR encoding and decoding of report records
//! - [`session`] - Zenoh session management for the report sink
//! - [`keyexpr`] - Key expressions used for provisioning reports
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod keyexpr;
pub mod report;
pub mod serialization;
pub mod session;

// Re-export commonly used types at the crate root
pub use config::{LogFormat, LoggingConfig, ZenohConfig, ZenohMode, load_config, parse_config};
pub use error::{Error, Result};
pub use keyexpr::{REPORT_PREFIX, ReportKeys, sanitize_chunk};
pub use report::{BatchSummary, DeviceReport, ProvisionStatus, current_timestamp_millis};
pub use serialization::{Format, decode, encode};
pub use session::connect;

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level when it is set.
///
/// # Example
///
/// ```ignore
/// use telecfg_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "debug".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
    };

    result.map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))
}
