//! Applying one configuration to many devices.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use telecfg_common::{BatchSummary, current_timestamp_millis};
use telecfg_model::{ConfigurationTree, EncodeError, Payload, encode};

use crate::error::ApplyError;
use crate::outcome::{DeviceOutcome, Outcome};
use crate::protocol::{ApplyOptions, ApplyProtocol, ApplyRun, SessionState};
use crate::target::{DeviceTarget, redact_endpoint};
use crate::transport::Transport;

/// Applies one encoded tree to a list of devices.
///
/// The tree is encoded once and the same bytes go to every device. Each
/// device runs in its own task: a failure, timeout or panic for one device
/// never affects the others. Outcomes are reported in input order whatever
/// the concurrency.
pub struct BatchDriver<T> {
    transport: Arc<T>,
    options: ApplyOptions,
    max_concurrency: usize,
}

impl<T> BatchDriver<T>
where
    T: Transport + 'static,
    T::Session: 'static,
{
    pub fn new(transport: T, options: ApplyOptions) -> Self {
        Self::from_shared(Arc::new(transport), options)
    }

    pub fn from_shared(transport: Arc<T>, options: ApplyOptions) -> Self {
        Self {
            transport,
            options,
            max_concurrency: 1,
        }
    }

    /// Number of devices worked on at the same time. Defaults to one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn options(&self) -> &ApplyOptions {
        &self.options
    }

    /// Encode `tree` and apply it to every endpoint.
    ///
    /// Only an invalid tree fails the whole batch; every per-device problem
    /// is an [`Outcome`] in the report.
    pub async fn run<S: AsRef<str>>(
        &self,
        endpoints: &[S],
        tree: &ConfigurationTree,
    ) -> Result<BatchReport, EncodeError> {
        let payload = Arc::new(encode(tree)?);
        Ok(self.run_payload(endpoints, payload).await)
    }

    /// Apply an already encoded payload to every endpoint.
    pub async fn run_payload<S: AsRef<str>>(
        &self,
        endpoints: &[S],
        payload: Arc<Payload>,
    ) -> BatchReport {
        let started_at = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        tracing::info!(
            devices = endpoints.len(),
            payload_bytes = payload.len(),
            max_concurrency = self.max_concurrency,
            "Applying telemetry configuration"
        );

        let mut pending = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let device = redact_endpoint(endpoint.as_ref().trim());

            let target = match DeviceTarget::parse(endpoint.as_ref())
                .and_then(|target| self.transport.check_target(&target).map(|()| target))
            {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!(device = %device, error = %e, "Skipping device");
                    pending.push(Pending::Done(DeviceOutcome {
                        label: device.clone(),
                        device,
                        outcome: Outcome::ConfigurationError(e),
                        states: vec![SessionState::Disconnected],
                    }));
                    continue;
                }
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    pending.push(Pending::Done(aborted(device, target.label(), e.to_string())));
                    continue;
                }
            };

            let transport = Arc::clone(&self.transport);
            let options = self.options.clone();
            let payload = Arc::clone(&payload);
            let label = target.label();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                ApplyProtocol::new(transport.as_ref(), &options)
                    .execute(&target, &payload)
                    .await
            });

            pending.push(Pending::Running {
                device,
                label,
                handle,
            });
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for entry in pending {
            let outcome = match entry {
                Pending::Done(outcome) => outcome,
                Pending::Running {
                    device,
                    label,
                    handle,
                } => match handle.await {
                    Ok(ApplyRun { outcome, states }) => DeviceOutcome {
                        device,
                        label,
                        outcome,
                        states,
                    },
                    Err(e) => {
                        tracing::error!(device = %device, error = %e, "Device task ended abnormally");
                        aborted(device, label, e.to_string())
                    }
                },
            };

            if outcome.outcome.is_applied() {
                tracing::info!(device = %outcome.device, "Configuration applied");
            }
            outcomes.push(outcome);
        }

        let report = BatchReport {
            outcomes,
            payload_bytes: payload.len(),
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            applied = report.applied_count(),
            failed = report.failed_count(),
            elapsed_ms = report.elapsed().num_milliseconds(),
            "Batch complete"
        );

        report
    }
}

enum Pending {
    Done(DeviceOutcome),
    Running {
        device: String,
        label: String,
        handle: JoinHandle<ApplyRun>,
    },
}

fn aborted(device: String, label: String, reason: String) -> DeviceOutcome {
    DeviceOutcome {
        device,
        label,
        outcome: Outcome::ApplyError(ApplyError::Aborted(reason)),
        states: vec![SessionState::Disconnected, SessionState::Failed],
    }
}

/// Outcomes of one batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<DeviceOutcome>,
    /// Size of the payload sent to every device.
    pub payload_bytes: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    /// An empty report, used for dry runs.
    pub fn empty(payload_bytes: usize) -> Self {
        let now = Utc::now();
        Self {
            outcomes: Vec::new(),
            payload_bytes,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn all_applied(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_applied())
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_applied())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.applied_count()
    }

    pub fn elapsed(&self) -> TimeDelta {
        self.finished_at - self.started_at
    }

    /// Process exit status: success only when every device applied.
    pub fn exit_code(&self) -> ExitCode {
        if self.all_applied() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    pub fn summary(&self, tool: &str, version: &str) -> BatchSummary {
        BatchSummary {
            tool: tool.to_string(),
            version: version.to_string(),
            devices_total: self.outcomes.len(),
            devices_applied: self.applied_count(),
            devices_failed: self.failed_count(),
            payload_bytes: self.payload_bytes,
            timestamp: current_timestamp_millis(),
        }
    }

    /// One line per device, for the terminal.
    pub fn lines(&self) -> Vec<String> {
        let width = self
            .outcomes
            .iter()
            .map(|o| o.device.len())
            .max()
            .unwrap_or(0);

        self.outcomes
            .iter()
            .map(|o| match o.outcome.detail() {
                Some(detail) => format!(
                    "{:<width$}  {:<19}  {}",
                    o.device,
                    o.outcome.status(),
                    detail
                ),
                None => format!("{:<width$}  {}", o.device, o.outcome.status()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Behavior, MockTransport};
    use telecfg_model::TreeBuilder;

    fn tree() -> ConfigurationTree {
        TreeBuilder::new()
            .sensor_group("G", ["a/b"])
            .subscription(1, "G", 1000)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_outcomes_follow_input_order() {
        let transport = MockTransport::new().with_behavior("r2", Behavior::Unreachable);
        let driver = BatchDriver::new(transport, ApplyOptions::default());

        let report = driver
            .run(&["mock://r1", "not-a-uri", "mock://r2", "mock://r3"], &tree())
            .await
            .unwrap();

        let statuses: Vec<_> = report
            .outcomes
            .iter()
            .map(|o| o.outcome.status().as_str())
            .collect();
        assert_eq!(
            statuses,
            ["applied", "configuration_error", "connection_error", "applied"]
        );
        assert_eq!(report.applied_count(), 2);
        assert_eq!(report.failed_count(), 2);
        assert!(!report.all_applied());
    }

    #[tokio::test]
    async fn test_invalid_tree_fails_before_any_device() {
        let driver = BatchDriver::new(MockTransport::new(), ApplyOptions::default());
        let bad: ConfigurationTree =
            serde_json::from_str(r#"{"sensor_groups":[{"id":"","paths":["a"]}]}"#).unwrap();

        let result = driver.run(&["mock://r1"], &bad).await;
        assert!(matches!(result, Err(EncodeError::Invalid(_))));
        assert_eq!(driver.transport().opens("r1"), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_succeeds() {
        let driver = BatchDriver::new(MockTransport::new(), ApplyOptions::default());
        let report = driver.run::<&str>(&[], &tree()).await.unwrap();
        assert!(report.all_applied());
        assert!(report.lines().is_empty());
    }

    #[tokio::test]
    async fn test_summary_and_lines() {
        let transport = MockTransport::new().with_behavior("r2", Behavior::AuthFailure);
        let driver = BatchDriver::new(transport, ApplyOptions::default());
        let report = driver
            .run(&["mock://r1", "mock://admin:pw@r2"], &tree())
            .await
            .unwrap();

        let summary = report.summary("telecfg-gnmi", "0.2.0");
        assert_eq!(summary.devices_total, 2);
        assert_eq!(summary.devices_applied, 1);
        assert!(summary.payload_bytes > 0);

        let lines = report.lines();
        assert!(lines[0].starts_with("mock://r1"));
        assert!(lines[1].contains("connection_error"));
        assert!(lines[1].contains("mock://admin:***@r2"));
    }
}
