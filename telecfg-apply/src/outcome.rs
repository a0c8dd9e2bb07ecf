//! Per-device results.

use std::fmt;

use telecfg_common::{DeviceReport, ProvisionStatus};

use crate::error::{ApplyError, ConnectionError, TargetError};
use crate::protocol::SessionState;

/// What happened to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The device acknowledged the configuration.
    Applied,
    /// The endpoint could not be used; nothing was sent.
    ConfigurationError(TargetError),
    /// No session could be established.
    ConnectionError(ConnectionError),
    /// A session was open but the configuration was not accepted.
    ApplyError(ApplyError),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn status(&self) -> ProvisionStatus {
        match self {
            Outcome::Applied => ProvisionStatus::Applied,
            Outcome::ConfigurationError(_) => ProvisionStatus::ConfigurationError,
            Outcome::ConnectionError(_) => ProvisionStatus::ConnectionError,
            Outcome::ApplyError(_) => ProvisionStatus::ApplyError,
        }
    }

    /// Short machine-readable cause, e.g. `authentication` or `rejected`.
    pub fn cause(&self) -> Option<String> {
        match self {
            Outcome::Applied => None,
            Outcome::ConfigurationError(TargetError::UnsupportedScheme { .. }) => {
                Some("unsupported_scheme".to_string())
            }
            Outcome::ConfigurationError(_) => Some("invalid_endpoint".to_string()),
            Outcome::ConnectionError(e) => Some(e.cause.as_str().to_string()),
            Outcome::ApplyError(e) => Some(e.cause().to_string()),
        }
    }

    /// Human-readable detail, including any device diagnostic.
    pub fn detail(&self) -> Option<String> {
        match self {
            Outcome::Applied => None,
            Outcome::ConfigurationError(e) => Some(e.to_string()),
            Outcome::ConnectionError(e) => Some(e.to_string()),
            Outcome::ApplyError(e) => Some(e.to_string()),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{}: {}", self.status(), detail),
            None => write!(f, "{}", self.status()),
        }
    }
}

/// Outcome of one device in a batch, keyed by its redacted endpoint.
#[derive(Debug, Clone)]
pub struct DeviceOutcome {
    /// Endpoint as given, with the password masked.
    pub device: String,
    /// `host:port` when the endpoint parsed, otherwise the masked endpoint.
    pub label: String,
    pub outcome: Outcome,
    /// States visited; only `Disconnected` when the endpoint was rejected.
    pub states: Vec<SessionState>,
}

impl DeviceOutcome {
    pub fn to_report(&self) -> DeviceReport {
        match &self.outcome {
            Outcome::Applied => DeviceReport::applied(&self.device),
            failed => DeviceReport::failed(
                &self.device,
                failed.status(),
                failed.cause().unwrap_or_default(),
                failed.detail().unwrap_or_default(),
            ),
        }
    }
}
