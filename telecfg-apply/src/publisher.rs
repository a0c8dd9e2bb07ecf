//! Publishing provisioning outcomes to Zenoh.

use std::sync::Arc;

use telecfg_common::{BatchSummary, DeviceReport, Format, ReportKeys, encode};

use crate::batch::BatchReport;
use crate::error::{ProvisionError, Result};
use crate::outcome::DeviceOutcome;

/// Publishes device outcomes and the batch summary.
///
/// Device outcomes go to `<prefix>/<device>/@/provision`, the summary to
/// `<prefix>/@/status`.
#[derive(Clone, Debug)]
pub struct ReportPublisher {
    session: Arc<zenoh::Session>,
    keys: ReportKeys,
    format: Format,
}

impl ReportPublisher {
    pub fn new(session: Arc<zenoh::Session>, keys: ReportKeys, format: Format) -> Self {
        Self {
            session,
            keys,
            format,
        }
    }

    pub fn keys(&self) -> &ReportKeys {
        &self.keys
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Publish one device outcome under its redacted endpoint.
    pub async fn publish_device(&self, device: &str, report: &DeviceReport) -> Result<()> {
        let key = self.keys.device_key(device);
        self.put(&key, report).await
    }

    pub async fn publish_summary(&self, summary: &BatchSummary) -> Result<()> {
        let key = self.keys.status_key();
        self.put(&key, summary).await
    }

    /// Publish every device outcome and the summary.
    ///
    /// Failures are logged and counted, never propagated: the devices have
    /// already been configured by the time this runs.
    pub async fn publish_report(
        &self,
        report: &BatchReport,
        tool: &str,
        version: &str,
    ) -> PublishStats {
        let mut stats = PublishStats::default();

        for device in &report.outcomes {
            match self.publish_outcome(device).await {
                Ok(()) => stats.success += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(error = %e, "Failed to publish device outcome");
                }
            }
        }

        match self.publish_summary(&report.summary(tool, version)).await {
            Ok(()) => stats.success += 1,
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(error = %e, "Failed to publish batch summary");
            }
        }

        stats
    }

    // The redacted endpoint keeps scheme and user, so two endpoints that
    // share host:port still get distinct keys.
    async fn publish_outcome(&self, outcome: &DeviceOutcome) -> Result<()> {
        self.publish_device(&outcome.device, &outcome.to_report()).await
    }

    async fn put<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload =
            encode(value, self.format).map_err(|e| ProvisionError::Serialization(e.to_string()))?;

        self.session
            .put(key, payload)
            .await
            .map_err(|e| ProvisionError::Publish {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        tracing::trace!(key = %key, "Published report");
        Ok(())
    }
}

/// Statistics from publishing a batch report.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    pub success: usize,
    pub failed: usize,
}

impl PublishStats {
    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_stats() {
        let stats = PublishStats {
            success: 3,
            failed: 1,
        };
        assert_eq!(stats.total(), 4);
        assert_eq!(PublishStats::default().total(), 0);
    }

    #[test]
    fn test_endpoints_sharing_host_get_distinct_keys() {
        let keys = ReportKeys::default();
        let admin = keys.device_key("grpc://admin:***@r1:57400");
        let oper = keys.device_key("grpc://oper:***@r1:57400");
        let secure = keys.device_key("grpcs://admin:***@r1:57400");
        assert_ne!(admin, oper);
        assert_ne!(admin, secure);
        assert_ne!(oper, secure);
    }

    #[test]
    fn test_device_labels_map_to_single_chunks() {
        let keys = ReportKeys::new("lab/provision/");
        assert_eq!(
            keys.device_key("[2001:db8::1]:57400"),
            "lab/provision/[2001:db8::1]:57400/@/provision"
        );
        assert_eq!(
            keys.device_key("grpc://admin:***@r1"),
            "lab/provision/grpc:__admin:___@r1/@/provision"
        );
    }
}
