//! Boundary between the apply protocol and a concrete management protocol.

use std::future::Future;

use telecfg_model::Payload;

use crate::error::{ApplyError, ConnectionError, TargetError};
use crate::target::DeviceTarget;

/// Opens management sessions to devices.
///
/// One transport is shared by every device of a batch, so implementations
/// hold only configuration (TLS material, timeouts, encoding choices) and
/// never per-device state.
pub trait Transport: Send + Sync {
    /// Session type produced by [`open`](Self::open).
    type Session: Session;

    /// Endpoint schemes this transport accepts, lowercase.
    fn schemes(&self) -> &'static [&'static str];

    /// Reject targets this transport cannot serve, before any network I/O.
    ///
    /// The default checks the scheme against [`schemes`](Self::schemes).
    fn check_target(&self, target: &DeviceTarget) -> Result<(), TargetError> {
        let schemes = self.schemes();
        if schemes.contains(&target.scheme()) {
            Ok(())
        } else {
            Err(TargetError::UnsupportedScheme {
                endpoint: target.to_string(),
                scheme: target.scheme().to_string(),
                supported: schemes.join(", "),
            })
        }
    }

    /// Connect and authenticate.
    fn open(
        &self,
        target: &DeviceTarget,
    ) -> impl Future<Output = Result<Self::Session, ConnectionError>> + Send;
}

/// An open, authenticated session to one device.
pub trait Session: Send {
    /// Send the payload as one atomic edit and wait for the acknowledgement.
    fn apply(&mut self, payload: &Payload) -> impl Future<Output = Result<(), ApplyError>> + Send;

    /// Release the session. Must not fail; problems are logged.
    fn close(self) -> impl Future<Output = ()> + Send;
}
