//! In-memory transport for tests and demos.
//!
//! Devices are addressed as `mock://[user[:password]@]host[:port]` and
//! behave according to the [`Behavior`] registered for their host. Every
//! open, apply and close is recorded so tests can check session handling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use telecfg_model::Payload;

use crate::error::{ApplyError, ConnectionError};
use crate::target::DeviceTarget;
use crate::transport::{Session, Transport};

/// How a mock device reacts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Behavior {
    /// Accept every configuration.
    #[default]
    Healthy,
    /// Accept after a delay.
    Slow(Duration),
    /// Refuse the connection.
    Unreachable,
    /// Refuse the credentials.
    AuthFailure,
    /// Never finish opening.
    HangOnOpen,
    /// Open, then never answer the apply.
    Hang,
    /// Reject every configuration with this diagnostic.
    Reject(String),
    /// Answer with something that is not an acknowledgement.
    Malformed,
    /// Accept the first configuration, reject any later one as already existing.
    RejectExisting,
    /// Panic while applying.
    Panic,
}

/// Kind of a recorded interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Open,
    Apply,
    Close,
}

/// One recorded interaction with a mock device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockEvent {
    pub host: String,
    pub kind: EventKind,
}

#[derive(Debug, Default)]
struct MockState {
    behaviors: HashMap<String, Behavior>,
    events: Vec<MockEvent>,
    /// Payloads accepted per host, oldest first.
    store: HashMap<String, Vec<Vec<u8>>>,
    active: usize,
    peak: usize,
}

/// Transport whose devices live in memory.
///
/// Clones share state, so a test can keep one handle while the batch driver
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the behavior of one host. Unlisted hosts are healthy.
    pub fn with_behavior(self, host: impl Into<String>, behavior: Behavior) -> Self {
        self.set_behavior(host, behavior);
        self
    }

    pub fn set_behavior(&self, host: impl Into<String>, behavior: Behavior) {
        self.lock().behaviors.insert(host.into(), behavior);
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.lock().events.clone()
    }

    pub fn opens(&self, host: &str) -> usize {
        self.count(host, EventKind::Open)
    }

    pub fn applies(&self, host: &str) -> usize {
        self.count(host, EventKind::Apply)
    }

    pub fn closes(&self, host: &str) -> usize {
        self.count(host, EventKind::Close)
    }

    /// Payloads a host has accepted.
    pub fn applied_payloads(&self, host: &str) -> Vec<Vec<u8>> {
        self.lock().store.get(host).cloned().unwrap_or_default()
    }

    /// Most sessions that were open at the same time.
    pub fn peak_sessions(&self) -> usize {
        self.lock().peak
    }

    fn count(&self, host: &str, kind: EventKind) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| e.host == host && e.kind == kind)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn record(state: &Mutex<MockState>, host: &str, kind: EventKind) -> Behavior {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.events.push(MockEvent {
        host: host.to_string(),
        kind,
    });
    state.behaviors.get(host).cloned().unwrap_or_default()
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn schemes(&self) -> &'static [&'static str] {
        &["mock"]
    }

    async fn open(&self, target: &DeviceTarget) -> Result<MockSession, ConnectionError> {
        let host = target.host().to_string();
        let behavior = record(&self.state, &host, EventKind::Open);

        match behavior {
            Behavior::Unreachable => {
                return Err(ConnectionError::unreachable(format!(
                    "{}: connection refused",
                    target.label()
                )));
            }
            Behavior::AuthFailure => {
                return Err(ConnectionError::authentication(format!(
                    "invalid credentials for user '{}'",
                    target.username().unwrap_or_default()
                )));
            }
            Behavior::HangOnOpen => std::future::pending::<()>().await,
            _ => {}
        }

        {
            let mut state = self.lock();
            state.active += 1;
            state.peak = state.peak.max(state.active);
        }

        Ok(MockSession {
            host,
            behavior,
            state: Arc::clone(&self.state),
        })
    }
}

/// Session to a mock device.
#[derive(Debug)]
pub struct MockSession {
    host: String,
    behavior: Behavior,
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    fn store(&self, payload: &Payload) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .store
            .entry(self.host.clone())
            .or_default()
            .push(payload.as_bytes().to_vec());
    }
}

impl Session for MockSession {
    async fn apply(&mut self, payload: &Payload) -> Result<(), ApplyError> {
        record(&self.state, &self.host, EventKind::Apply);

        match &self.behavior {
            Behavior::Healthy => {
                self.store(payload);
                Ok(())
            }
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                self.store(payload);
                Ok(())
            }
            Behavior::Hang => std::future::pending().await,
            Behavior::Reject(diagnostic) => {
                Err(ApplyError::rejected("InvalidArgument", diagnostic.clone()))
            }
            Behavior::Malformed => Err(ApplyError::Malformed(
                "reply carries no update result".to_string(),
            )),
            Behavior::RejectExisting => {
                let exists = {
                    let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.store.get(&self.host).is_some_and(|p| !p.is_empty())
                };
                if exists {
                    Err(ApplyError::rejected(
                        "AlreadyExists",
                        "subscription already exists",
                    ))
                } else {
                    self.store(payload);
                    Ok(())
                }
            }
            Behavior::Panic => panic!("mock device {} crashed", self.host),
            // Sessions are never handed out for these.
            Behavior::Unreachable | Behavior::AuthFailure | Behavior::HangOnOpen => Err(
                ApplyError::Transport("session should not exist".to_string()),
            ),
        }
    }

    async fn close(self) {
        record(&self.state, &self.host, EventKind::Close);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.active = state.active.saturating_sub(1);
    }
}
