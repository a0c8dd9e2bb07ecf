//! Configuration traits and shared sections.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use telecfg_common::{Format, LoggingConfig, REPORT_PREFIX, ZenohConfig};
use telecfg_model::{ConfigurationTree, GroupSpec, SubscriptionSpec, ValidationError, reference};

use crate::error::{ProvisionError, Result};
use crate::protocol::{DEFAULT_APPLY_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};

/// Telemetry configuration to push, as written in the config file.
///
/// ```json5
/// telemetry: {
///     sensor_groups: [
///         { id: "SGROUP1", paths: ["openconfig-platform:components/component"] },
///     ],
///     subscriptions: [
///         { id: 100, sensor_group: "SGROUP1", sample_interval_ms: 30000 },
///     ],
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySpec {
    #[serde(default)]
    pub sensor_groups: Vec<GroupSpec>,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionSpec>,
}

impl TelemetrySpec {
    /// The built-in three-group, three-subscription configuration.
    pub fn reference() -> Self {
        Self {
            sensor_groups: reference::groups(),
            subscriptions: reference::subscriptions(),
        }
    }

    pub fn build(&self) -> std::result::Result<ConfigurationTree, ValidationError> {
        telecfg_model::build(&self.sensor_groups, &self.subscriptions)
    }
}

/// Session deadlines in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,
    #[serde(default = "default_apply_ms")]
    pub apply_ms: u64,
}

fn default_connect_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
}

fn default_apply_ms() -> u64 {
    DEFAULT_APPLY_TIMEOUT.as_millis() as u64
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_ms(),
            apply_ms: default_apply_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn apply(&self) -> Duration {
        Duration::from_millis(self.apply_ms)
    }
}

/// Where provisioning outcomes are published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub zenoh: ZenohConfig,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default)]
    pub format: Format,
}

fn default_key_prefix() -> String {
    REPORT_PREFIX.to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            zenoh: ZenohConfig::default(),
            key_prefix: default_key_prefix(),
            format: Format::default(),
        }
    }
}

/// Trait for provisioning tool configuration types.
///
/// Implement this for a tool's configuration struct to get loading,
/// validation and access to the shared sections.
///
/// # Example
///
/// ```ignore
/// use serde::Deserialize;
/// use telecfg_apply::{LoggingConfig, ProvisionConfig, TelemetrySpec};
///
/// #[derive(Debug, Default, Deserialize)]
/// pub struct MyToolConfig {
///     #[serde(default)]
///     pub logging: LoggingConfig,
///     pub telemetry: Option<TelemetrySpec>,
/// }
///
/// impl ProvisionConfig for MyToolConfig {
///     fn logging(&self) -> &LoggingConfig {
///         &self.logging
///     }
///
///     fn telemetry(&self) -> Option<&TelemetrySpec> {
///         self.telemetry.as_ref()
///     }
/// }
/// ```
pub trait ProvisionConfig: Sized + DeserializeOwned + Default {
    /// Get the logging configuration.
    fn logging(&self) -> &LoggingConfig;

    /// Telemetry configuration to push; `None` selects the built-in reference.
    fn telemetry(&self) -> Option<&TelemetrySpec> {
        None
    }

    fn timeouts(&self) -> TimeoutConfig {
        TimeoutConfig::default()
    }

    /// Devices worked on at the same time.
    fn max_concurrency(&self) -> usize {
        1
    }

    /// Report sink; `None` disables publishing.
    fn report(&self) -> Option<&ReportConfig> {
        None
    }

    /// Validate the configuration.
    ///
    /// Called automatically after loading. Implementations that override
    /// this should still call [`validate_common`].
    fn validate(&self) -> Result<()> {
        validate_common(self)
    }

    /// Load configuration from a file path.
    ///
    /// Supports JSON5 format. Calls [`validate`](Self::validate) after loading.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ProvisionError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;

        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from `path` when given, otherwise use the defaults.
    fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }
}

/// Checks shared by every tool configuration.
pub fn validate_common<C: ProvisionConfig>(config: &C) -> Result<()> {
    let timeouts = config.timeouts();
    if timeouts.connect_ms == 0 || timeouts.apply_ms == 0 {
        return Err(ProvisionError::validation("timeouts must be greater than zero"));
    }
    if config.max_concurrency() == 0 {
        return Err(ProvisionError::validation(
            "max_concurrency must be at least 1",
        ));
    }
    if let Some(report) = config.report() {
        if report.key_prefix.trim_matches('/').is_empty() {
            return Err(ProvisionError::validation("report key_prefix must not be empty"));
        }
    }
    if let Some(telemetry) = config.telemetry() {
        telemetry.build()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Default, Deserialize)]
    struct TestConfig {
        #[serde(default)]
        logging: LoggingConfig,
        telemetry: Option<TelemetrySpec>,
        #[serde(default)]
        timeouts: TimeoutConfig,
        report: Option<ReportConfig>,
    }

    impl ProvisionConfig for TestConfig {
        fn logging(&self) -> &LoggingConfig {
            &self.logging
        }

        fn telemetry(&self) -> Option<&TelemetrySpec> {
            self.telemetry.as_ref()
        }

        fn timeouts(&self) -> TimeoutConfig {
            self.timeouts
        }

        fn report(&self) -> Option<&ReportConfig> {
            self.report.as_ref()
        }
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_not_found() {
        let result = TestConfig::load("/nonexistent/path.json5");
        assert!(matches!(result, Err(ProvisionError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"{
                logging: { level: "debug" },
                telemetry: {
                    sensor_groups: [{ id: "G", paths: ["a/b", "c/d"] }],
                    subscriptions: [{ id: "Sub1", sensor_group: "G", sample_interval_ms: 500 }],
                },
                timeouts: { connect_ms: 2000 },
                report: { key_prefix: "lab/provision" },
            }"#,
        );

        let config = TestConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.timeouts.connect(), Duration::from_secs(2));
        assert_eq!(config.timeouts.apply(), DEFAULT_APPLY_TIMEOUT);
        assert_eq!(config.report.unwrap().format, Format::Json);

        let tree = config.telemetry.unwrap().build().unwrap();
        assert_eq!(tree.sensor_groups()[0].paths().len(), 2);
    }

    #[test]
    fn test_invalid_telemetry_rejected_at_load() {
        let file = write_config(
            r#"{
                telemetry: {
                    sensor_groups: [{ id: "G", paths: ["a"] }],
                    subscriptions: [{ id: 1, sensor_group: "H", sample_interval_ms: 500 }],
                },
            }"#,
        );
        let result = TestConfig::load(file.path());
        assert!(matches!(result, Err(ProvisionError::Validation(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let file = write_config(r#"{ timeouts: { apply_ms: 0 } }"#);
        let result = TestConfig::load(file.path());
        assert!(matches!(result, Err(ProvisionError::ConfigValidation(_))));
    }

    #[test]
    fn test_parse_error() {
        let file = write_config("{ logging: ");
        let result = TestConfig::load(file.path());
        assert!(matches!(result, Err(ProvisionError::ConfigParse(_))));
    }

    #[test]
    fn test_defaults_without_file() {
        let config = TestConfig::load_or_default(None).unwrap();
        assert!(config.telemetry().is_none());
        assert_eq!(config.max_concurrency(), 1);
    }

    #[test]
    fn test_reference_spec_builds() {
        let tree = TelemetrySpec::reference().build().unwrap();
        assert_eq!(tree.sensor_groups().len(), 3);
        assert_eq!(tree.subscriptions().len(), 3);
    }
}
