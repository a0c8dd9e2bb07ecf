//! One open/apply/close exchange with a device.
//!
//! ```text
//! Disconnected -> SessionOpen -> Applying -> Applied
//!      |              |             |
//!      +--------------+-------------+-----> Failed
//! ```
//!
//! Once [`Transport::open`] has produced a session, [`Session::close`] is
//! called exactly once, whatever the apply result, including a panic inside
//! [`Session::apply`]. An open that itself times out never yields a session,
//! so there is nothing to close.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::timeout;

use telecfg_model::Payload;

use crate::error::{ApplyError, ConnectionError};
use crate::outcome::Outcome;
use crate::target::DeviceTarget;
use crate::transport::{Session, Transport};

/// Default time allowed for connecting and authenticating.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed for the device to acknowledge the configuration.
pub const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    SessionOpen,
    Applying,
    Applied,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::SessionOpen => "session_open",
            SessionState::Applying => "applying",
            SessionState::Applied => "applied",
            SessionState::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Applied | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deadlines and logging switches for one exchange.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub connect_timeout: Duration,
    pub apply_timeout: Duration,
    /// Log the full payload at debug level before sending.
    pub log_payloads: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            apply_timeout: DEFAULT_APPLY_TIMEOUT,
            log_payloads: false,
        }
    }
}

/// Result of [`ApplyProtocol::execute`].
#[derive(Debug, Clone)]
pub struct ApplyRun {
    pub outcome: Outcome,
    /// Every state visited, starting with [`SessionState::Disconnected`].
    pub states: Vec<SessionState>,
}

/// Drives one device through the session state machine.
pub struct ApplyProtocol<'a, T> {
    transport: &'a T,
    options: &'a ApplyOptions,
}

impl<'a, T: Transport> ApplyProtocol<'a, T> {
    pub fn new(transport: &'a T, options: &'a ApplyOptions) -> Self {
        Self { transport, options }
    }

    /// Open a session, apply the payload, and close the session.
    pub async fn execute(&self, target: &DeviceTarget, payload: &Payload) -> ApplyRun {
        let mut tracker = StateTracker::new(target);

        let session = match self.open(target).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(device = %target, error = %e, "Failed to open session");
                tracker.enter(SessionState::Failed);
                return tracker.finish(Outcome::ConnectionError(e));
            }
        };
        tracker.enter(SessionState::SessionOpen);

        let result = self.apply(session, target, payload, &mut tracker).await;

        match result {
            Ok(()) => {
                tracker.enter(SessionState::Applied);
                tracker.finish(Outcome::Applied)
            }
            Err(e) => {
                tracing::warn!(device = %target, error = %e, "Configuration not applied");
                tracker.enter(SessionState::Failed);
                tracker.finish(Outcome::ApplyError(e))
            }
        }
    }

    async fn open(&self, target: &DeviceTarget) -> Result<T::Session, ConnectionError> {
        tracing::debug!(device = %target, "Opening session");
        match timeout(self.options.connect_timeout, self.transport.open(target)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::timeout(self.options.connect_timeout)),
        }
    }

    // Owns the session so that every path through here releases it.
    async fn apply(
        &self,
        mut session: T::Session,
        target: &DeviceTarget,
        payload: &Payload,
        tracker: &mut StateTracker<'_>,
    ) -> Result<(), ApplyError> {
        tracker.enter(SessionState::Applying);

        if self.options.log_payloads {
            tracing::debug!(device = %target, payload = %payload.as_text(), "Sending configuration");
        } else {
            tracing::debug!(device = %target, bytes = payload.len(), "Sending configuration");
        }

        let applying = timeout(self.options.apply_timeout, session.apply(payload));
        let result = match AssertUnwindSafe(applying).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ApplyError::Timeout(self.options.apply_timeout)),
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(device = %target, reason = %reason, "Session panicked while applying");
                Err(ApplyError::Aborted(reason))
            }
        };

        session.close().await;
        tracing::debug!(device = %target, "Session closed");

        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

struct StateTracker<'a> {
    target: &'a DeviceTarget,
    states: Vec<SessionState>,
}

impl<'a> StateTracker<'a> {
    fn new(target: &'a DeviceTarget) -> Self {
        Self {
            target,
            states: vec![SessionState::Disconnected],
        }
    }

    fn current(&self) -> SessionState {
        self.states
            .last()
            .copied()
            .unwrap_or(SessionState::Disconnected)
    }

    fn enter(&mut self, next: SessionState) {
        let from = self.current();
        debug_assert!(!from.is_terminal(), "transition out of terminal state {from}");
        tracing::trace!(device = %self.target, %from, to = %next, "Session state");
        self.states.push(next);
    }

    fn finish(self, outcome: Outcome) -> ApplyRun {
        ApplyRun {
            outcome,
            states: self.states,
        }
    }
}
