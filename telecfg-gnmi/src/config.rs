//! gNMI provisioning tool configuration

use serde::{Deserialize, Serialize};

use telecfg_apply::{
    LoggingConfig, ProvisionConfig, ProvisionError, ReportConfig, Result, TelemetrySpec,
    TimeoutConfig,
};

/// IANA-assigned gNMI port, used when an endpoint has none.
pub const DEFAULT_GNMI_PORT: u16 = 9339;

/// Top-level configuration for the gNMI provisioning tool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GnmiToolConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// gNMI session settings
    #[serde(default)]
    pub gnmi: GnmiSettings,

    /// Telemetry configuration to push (built-in reference when absent)
    #[serde(default)]
    pub telemetry: Option<TelemetrySpec>,

    /// Zenoh report sink (disabled when absent)
    #[serde(default)]
    pub report: Option<ReportConfig>,
}

/// gNMI-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GnmiSettings {
    /// TLS material for `grpcs://` and `https://` endpoints
    #[serde(default)]
    pub tls: TlsConfig,

    /// Session deadlines
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// How the configuration is written
    #[serde(default)]
    pub apply_mode: ApplyMode,

    /// Path origin of the Set request (e.g. "openconfig"); empty omits it
    #[serde(default)]
    pub origin: String,

    /// Port used when an endpoint has none
    #[serde(default = "default_port")]
    pub default_port: u16,

    /// Devices configured at the same time
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for GnmiSettings {
    fn default() -> Self {
        Self {
            tls: TlsConfig::default(),
            timeouts: TimeoutConfig::default(),
            apply_mode: ApplyMode::default(),
            origin: String::new(),
            default_port: default_port(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// TLS configuration
///
/// Native root certificates are trusted when no CA file is given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to CA certificate file (PEM)
    #[serde(default)]
    pub ca_cert: Option<String>,

    /// Path to client certificate file (PEM)
    #[serde(default)]
    pub client_cert: Option<String>,

    /// Path to client key file (PEM)
    #[serde(default)]
    pub client_key: Option<String>,

    /// Name to verify the server certificate against, instead of the host
    #[serde(default)]
    pub server_name: Option<String>,
}

/// gNMI Set operation used to write the configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// Merge into the running configuration; re-applying is harmless
    #[default]
    Update,

    /// Replace the whole telemetry-system container
    Replace,
}

fn default_port() -> u16 {
    DEFAULT_GNMI_PORT
}

fn default_max_concurrency() -> usize {
    1
}

impl ProvisionConfig for GnmiToolConfig {
    fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    fn telemetry(&self) -> Option<&TelemetrySpec> {
        self.telemetry.as_ref()
    }

    fn timeouts(&self) -> TimeoutConfig {
        self.gnmi.timeouts
    }

    fn max_concurrency(&self) -> usize {
        self.gnmi.max_concurrency
    }

    fn report(&self) -> Option<&ReportConfig> {
        self.report.as_ref()
    }

    fn validate(&self) -> Result<()> {
        telecfg_apply::validate_common(self)?;

        let tls = &self.gnmi.tls;
        if tls.client_cert.is_some() != tls.client_key.is_some() {
            return Err(ProvisionError::validation(
                "tls.client_cert and tls.client_key must be given together",
            ));
        }
        if self.gnmi.default_port == 0 {
            return Err(ProvisionError::validation("gnmi.default_port must not be 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use telecfg_apply::Format;

    #[test]
    fn test_parse_config() {
        let json5 = r#"
        {
            logging: { level: "debug", format: "json" },
            gnmi: {
                tls: { ca_cert: "/etc/telecfg/ca.pem", server_name: "router.lab" },
                timeouts: { connect_ms: 3000, apply_ms: 60000 },
                apply_mode: "replace",
                origin: "openconfig",
                max_concurrency: 8,
            },
            telemetry: {
                sensor_groups: [{ id: "SGROUP1", paths: ["openconfig-interfaces:interfaces"] }],
                subscriptions: [{ id: 100, sensor_group: "SGROUP1", sample_interval_ms: 10000 }],
            },
            report: {
                zenoh: { mode: "client", connect: ["tcp/localhost:7447"] },
                format: "cbor",
            },
        }
        "#;

        let config: GnmiToolConfig = json5::from_str(json5).unwrap();
        config.validate().unwrap();

        assert_eq!(config.gnmi.apply_mode, ApplyMode::Replace);
        assert_eq!(config.gnmi.origin, "openconfig");
        assert_eq!(config.gnmi.default_port, DEFAULT_GNMI_PORT);
        assert_eq!(config.max_concurrency(), 8);
        assert_eq!(config.timeouts().apply_ms, 60000);
        assert_eq!(config.gnmi.tls.server_name.as_deref(), Some("router.lab"));

        let report = config.report().unwrap();
        assert_eq!(report.format, Format::Cbor);
        assert_eq!(report.key_prefix, telecfg_apply::REPORT_PREFIX);
    }

    #[test]
    fn test_minimal_config() {
        let config: GnmiToolConfig = json5::from_str("{}").unwrap();
        config.validate().unwrap();

        assert_eq!(config.gnmi.apply_mode, ApplyMode::Update);
        assert_eq!(config.max_concurrency(), 1);
        assert!(config.telemetry().is_none());
        assert!(config.report().is_none());
    }

    #[test]
    fn test_client_identity_needs_both_files() {
        let config: GnmiToolConfig =
            json5::from_str(r#"{ gnmi: { tls: { client_cert: "/tmp/client.pem" } } }"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ProvisionError::ConfigValidation(_))
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config: GnmiToolConfig =
            json5::from_str(r#"{ gnmi: { max_concurrency: 0 } }"#).unwrap();
        assert!(config.validate().is_err());
    }
}
