//! gNMI provisioning for telecfg
//!
//! Pushes an openconfig telemetry configuration (sensor groups, subscriptions
//! and sensor profiles) to gNMI-enabled network devices with a `Set` RPC.

pub mod config;
pub mod gnmi;
pub mod request;
pub mod transport;

pub use config::{ApplyMode, DEFAULT_GNMI_PORT, GnmiSettings, GnmiToolConfig, TlsConfig};
pub use transport::{GnmiSession, GnmiTransport};
