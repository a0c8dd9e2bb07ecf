//! Provisioning runner that wires configuration, logging and the batch driver.

use std::sync::Arc;

use telecfg_common::{ReportKeys, connect, init_tracing};
use telecfg_model::{ConfigurationTree, encode, encode_pretty};

use crate::ProvisionArgs;
use crate::batch::{BatchDriver, BatchReport};
use crate::config::{ProvisionConfig, ReportConfig, TelemetrySpec};
use crate::error::{ProvisionError, Result};
use crate::protocol::ApplyOptions;
use crate::publisher::ReportPublisher;
use crate::transport::Transport;

/// Runs one provisioning batch for a tool.
///
/// Handles:
/// - Logging initialization, with `-v` and `--log-level` overrides
/// - Building the telemetry tree (configured or built-in reference)
/// - Dry runs that print the encoded document
/// - Applying to every device through a [`BatchDriver`]
/// - Publishing outcomes to Zenoh when a report sink is configured
///
/// # Example
///
/// ```ignore
/// let args = ProvisionArgs::parse_for("my-tool");
/// let config = MyConfig::load_or_default(args.config.as_deref())?;
/// let runner = ProvisionRunner::new("my-tool", config, args)?;
/// let report = runner.run(MyTransport::new()).await?;
/// ```
pub struct ProvisionRunner<C: ProvisionConfig> {
    name: String,
    version: String,
    config: C,
    args: ProvisionArgs,
    tree: ConfigurationTree,
}

impl<C: ProvisionConfig> ProvisionRunner<C> {
    /// Create a runner and initialize logging.
    pub fn new(name: impl Into<String>, config: C, args: ProvisionArgs) -> Result<Self> {
        let runner = Self::without_logging(name, config, args)?;

        let log_config = runner
            .config
            .logging()
            .clone()
            .with_overrides(runner.args.log_level.as_deref(), runner.args.verbose);
        init_tracing(&log_config)?;

        tracing::info!(tool = %runner.name, version = %runner.version, "Starting");
        Ok(runner)
    }

    /// Create a runner without touching the global subscriber.
    pub fn without_logging(
        name: impl Into<String>,
        config: C,
        args: ProvisionArgs,
    ) -> Result<Self> {
        let tree = match config.telemetry() {
            Some(spec) => spec.build()?,
            None => TelemetrySpec::reference().build()?,
        };

        Ok(Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            config,
            args,
            tree,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    /// The tree that will be pushed.
    pub fn tree(&self) -> &ConfigurationTree {
        &self.tree
    }

    pub fn apply_options(&self) -> ApplyOptions {
        let timeouts = self.config.timeouts();
        ApplyOptions {
            connect_timeout: timeouts.connect(),
            apply_timeout: timeouts.apply(),
            log_payloads: self.args.verbose,
        }
    }

    /// Apply the tree to every device given on the command line.
    ///
    /// With `--dry-run`, prints the encoded document to stdout instead and
    /// returns an empty report.
    pub async fn run<T>(self, transport: T) -> Result<BatchReport>
    where
        T: Transport + 'static,
        T::Session: 'static,
    {
        if self.args.dry_run {
            let document = encode_pretty(&self.tree)?;
            println!("{}", document);
            return Ok(BatchReport::empty(encode(&self.tree)?.len()));
        }

        let publisher = match self.config.report() {
            Some(report) => connect_publisher(report).await,
            None => None,
        };

        let driver = BatchDriver::new(transport, self.apply_options())
            .with_max_concurrency(self.config.max_concurrency());
        let report = driver.run(&self.args.devices, &self.tree).await?;

        for device in &report.outcomes {
            match device.outcome.detail() {
                Some(detail) => tracing::warn!(
                    device = %device.device,
                    status = %device.outcome.status(),
                    detail = %detail,
                    "Device not configured"
                ),
                None => tracing::info!(device = %device.device, "Device configured"),
            }
        }

        if let Some((session, publisher)) = publisher {
            let stats = publisher
                .publish_report(&report, &self.name, &self.version)
                .await;
            tracing::info!(
                published = stats.success,
                failed = stats.failed,
                "Published provisioning report"
            );

            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "Error closing Zenoh session");
            }
        }

        Ok(report)
    }
}

// A sink that cannot be reached only costs the report, never the batch.
async fn connect_publisher(
    report: &ReportConfig,
) -> Option<(Arc<zenoh::Session>, ReportPublisher)> {
    match connect(&report.zenoh).await {
        Ok(session) => {
            let session = Arc::new(session);
            tracing::info!(zid = %session.zid(), "Connected to Zenoh");
            let publisher = ReportPublisher::new(
                Arc::clone(&session),
                ReportKeys::new(report.key_prefix.clone()),
                report.format,
            );
            Some((session, publisher))
        }
        Err(e) => {
            let e = ProvisionError::from(e);
            tracing::warn!(error = %e, "Report sink unavailable, outcomes will not be published");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeoutConfig;
    use crate::mock::MockTransport;
    use serde::Deserialize;
    use telecfg_common::LoggingConfig;

    #[derive(Debug, Default, Deserialize)]
    struct TestConfig {
        #[serde(default)]
        logging: LoggingConfig,
        telemetry: Option<TelemetrySpec>,
    }

    impl ProvisionConfig for TestConfig {
        fn logging(&self) -> &LoggingConfig {
            &self.logging
        }

        fn telemetry(&self) -> Option<&TelemetrySpec> {
            self.telemetry.as_ref()
        }

        fn timeouts(&self) -> TimeoutConfig {
            TimeoutConfig {
                connect_ms: 500,
                apply_ms: 1500,
            }
        }
    }

    fn args(devices: &[&str]) -> ProvisionArgs {
        ProvisionArgs {
            devices: devices.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_tree_is_default() {
        let runner =
            ProvisionRunner::without_logging("tool", TestConfig::default(), args(&[])).unwrap();
        assert_eq!(runner.tree().subscriptions().len(), 3);
        assert_eq!(
            runner.apply_options().apply_timeout,
            std::time::Duration::from_millis(1500)
        );
        assert!(!runner.apply_options().log_payloads);
    }

    #[tokio::test]
    async fn test_run_applies_to_every_device() {
        let transport = MockTransport::new();
        let runner = ProvisionRunner::without_logging(
            "tool",
            TestConfig::default(),
            args(&["mock://r1", "mock://r2"]),
        )
        .unwrap();

        let report = runner.run(transport.clone()).await.unwrap();
        assert!(report.all_applied());
        assert_eq!(transport.applied_payloads("r1"), transport.applied_payloads("r2"));
    }

    #[tokio::test]
    async fn test_dry_run_contacts_nobody() {
        let transport = MockTransport::new();
        let mut dry = args(&["mock://r1"]);
        dry.dry_run = true;

        let runner = ProvisionRunner::without_logging("tool", TestConfig::default(), dry).unwrap();
        let report = runner.run(transport.clone()).await.unwrap();
        assert!(report.outcomes.is_empty());
        assert!(report.payload_bytes > 0);
        assert!(transport.events().is_empty());
    }
}
