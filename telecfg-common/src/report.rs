//! Provisioning outcome records.
//!
//! These are the records published to the report sink. They are plain data so
//! a dashboard can decode them without depending on the apply machinery.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Final status of one device in a provisioning batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionStatus {
    /// Configuration was accepted by the device.
    Applied,
    /// The device endpoint could not be parsed or is not supported.
    ConfigurationError,
    /// No session could be established.
    ConnectionError,
    /// The device rejected or did not acknowledge the configuration.
    ApplyError,
}

impl ProvisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStatus::Applied => "applied",
            ProvisionStatus::ConfigurationError => "configuration_error",
            ProvisionStatus::ConnectionError => "connection_error",
            ProvisionStatus::ApplyError => "apply_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProvisionStatus::Applied)
    }
}

impl std::fmt::Display for ProvisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for a single device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReport {
    /// Device endpoint with the password redacted.
    pub device: String,
    pub status: ProvisionStatus,
    /// Machine-readable failure cause (e.g. "authentication", "timeout").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Human-readable detail, including the device diagnostic if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Unix epoch milliseconds when the outcome was recorded.
    pub timestamp: i64,
}

impl DeviceReport {
    pub fn applied(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            status: ProvisionStatus::Applied,
            cause: None,
            detail: None,
            timestamp: current_timestamp_millis(),
        }
    }

    pub fn failed(
        device: impl Into<String>,
        status: ProvisionStatus,
        cause: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            status,
            cause: Some(cause.into()),
            detail: Some(detail.into()),
            timestamp: current_timestamp_millis(),
        }
    }
}

/// Summary of one provisioning batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub tool: String,
    pub version: String,
    pub devices_total: usize,
    pub devices_applied: usize,
    pub devices_failed: usize,
    /// Size of the configuration payload sent to every device.
    pub payload_bytes: usize,
    pub timestamp: i64,
}

impl BatchSummary {
    pub fn all_applied(&self) -> bool {
        self.devices_failed == 0
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch.
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(ProvisionStatus::Applied.to_string(), "applied");
        assert_eq!(
            serde_json::to_string(&ProvisionStatus::ConnectionError).unwrap(),
            "\"connection_error\""
        );
        assert!(ProvisionStatus::Applied.is_success());
        assert!(!ProvisionStatus::ApplyError.is_success());
    }

    #[test]
    fn test_applied_report_omits_failure_fields() {
        let report = DeviceReport::applied("grpc://admin@router01:57400");
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("cause"));
        assert!(!json.contains("detail"));
        assert!(report.timestamp > 0);
    }

    #[test]
    fn test_failed_report() {
        let report = DeviceReport::failed(
            "router02",
            ProvisionStatus::ApplyError,
            "rejected",
            "InvalidArgument: unknown sensor group",
        );
        assert_eq!(report.cause.as_deref(), Some("rejected"));
        assert!(report.detail.unwrap().contains("unknown sensor group"));
    }
}
