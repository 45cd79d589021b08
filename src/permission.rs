// SPDX-License-Identifier: GPL-3.0-only

//! Camera permission gate
//!
//! The platform prompt is asynchronous and answers exactly once per request.
//! Denial is terminal for the request cycle but user-correctable: the host
//! may call [`PermissionGate::request`] again.

use crate::errors::{BridgeError, BridgeResult};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, warn};

/// Platform permission subsystem
pub trait PermissionService: Send {
    /// Whether camera access was granted in an earlier session
    fn already_granted(&self) -> bool {
        false
    }

    /// Show the permission prompt; the answer arrives exactly once
    fn request(&mut self) -> oneshot::Receiver<bool>;
}

/// Outcome of the current permission request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// What [`PermissionGate::request`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Already granted; no prompt shown
    AlreadyGranted,
    /// Prompt shown, answer pending
    Prompted,
    /// A prompt is already waiting for the user
    InFlight,
}

/// Tracks whether camera access is granted
pub struct PermissionGate {
    service: Box<dyn PermissionService>,
    state: PermissionState,
    /// A request is outstanding and its result not yet applied
    awaiting: bool,
    responder: Option<oneshot::Receiver<bool>>,
}

impl PermissionGate {
    pub fn new(service: Box<dyn PermissionService>) -> Self {
        Self {
            service,
            state: PermissionState::Unknown,
            awaiting: false,
            responder: None,
        }
    }

    /// Ask for camera access
    pub fn request(&mut self) -> RequestOutcome {
        if self.state == PermissionState::Granted {
            return RequestOutcome::AlreadyGranted;
        }
        if self.awaiting {
            return RequestOutcome::InFlight;
        }
        if self.service.already_granted() {
            info!("Camera permission already granted");
            self.state = PermissionState::Granted;
            return RequestOutcome::AlreadyGranted;
        }

        info!("Requesting camera permission");
        self.state = PermissionState::Unknown;
        self.awaiting = true;
        self.responder = Some(self.service.request());
        RequestOutcome::Prompted
    }

    /// Apply the platform's answer
    ///
    /// An answer with no outstanding request is a protocol violation and
    /// leaves the state untouched.
    pub fn on_result(&mut self, granted: bool) -> BridgeResult<PermissionState> {
        if !self.awaiting {
            warn!(granted, "Permission result without an outstanding request");
            return Err(BridgeError::ProtocolViolation(
                "permission result without request".into(),
            ));
        }

        self.awaiting = false;
        self.responder = None;
        self.state = if granted {
            info!("Camera permission granted");
            PermissionState::Granted
        } else {
            info!("Camera permission denied");
            PermissionState::Denied
        };
        Ok(self.state)
    }

    /// Wait for the platform's answer to the outstanding request
    ///
    /// Pending forever when nothing is outstanding. A dropped responder
    /// counts as a denial. The answer is returned, not applied; pass it to
    /// [`on_result`](Self::on_result).
    pub async fn wait_result(&mut self) -> bool {
        let Some(responder) = self.responder.as_mut() else {
            return std::future::pending().await;
        };
        let granted = responder.await.unwrap_or(false);
        self.responder = None;
        granted
    }

    /// Non-blocking variant of [`wait_result`](Self::wait_result)
    pub fn try_result(&mut self) -> Option<bool> {
        let responder = self.responder.as_mut()?;
        let granted = match responder.try_recv() {
            Ok(granted) => granted,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Closed) => {
                debug!("Permission responder dropped, treating as denied");
                false
            }
        };
        self.responder = None;
        Some(granted)
    }

    /// True only once access has been granted
    pub fn is_granted(&self) -> bool {
        self.state == PermissionState::Granted
    }

    pub fn state(&self) -> PermissionState {
        self.state
    }
}

/// Permission service with a fixed answer
///
/// For headless sessions and tests where no prompt can be shown.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissionService {
    granted: bool,
}

impl StaticPermissionService {
    pub fn granting() -> Self {
        Self { granted: true }
    }

    pub fn denying() -> Self {
        Self { granted: false }
    }
}

impl PermissionService for StaticPermissionService {
    fn request(&mut self) -> oneshot::Receiver<bool> {
        let (responder, receiver) = oneshot::channel();
        let _ = responder.send(self.granted);
        receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PreviouslyGranted;

    impl PermissionService for PreviouslyGranted {
        fn already_granted(&self) -> bool {
            true
        }

        fn request(&mut self) -> oneshot::Receiver<bool> {
            panic!("must not prompt when already granted");
        }
    }

    #[test]
    fn test_grant_flow() {
        let mut gate = PermissionGate::new(Box::new(StaticPermissionService::granting()));
        assert!(!gate.is_granted());
        assert_eq!(gate.request(), RequestOutcome::Prompted);
        assert_eq!(gate.request(), RequestOutcome::InFlight);

        let granted = gate.try_result().unwrap();
        assert_eq!(gate.on_result(granted), Ok(PermissionState::Granted));
        assert!(gate.is_granted());
        assert_eq!(gate.request(), RequestOutcome::AlreadyGranted);
    }

    #[test]
    fn test_denial_is_user_correctable() {
        let mut gate = PermissionGate::new(Box::new(StaticPermissionService::denying()));
        gate.request();
        let granted = gate.try_result().unwrap();
        assert_eq!(gate.on_result(granted), Ok(PermissionState::Denied));
        assert!(!gate.is_granted());

        // A new request starts a new cycle
        assert_eq!(gate.request(), RequestOutcome::Prompted);
        assert_eq!(gate.state(), PermissionState::Unknown);
    }

    #[test]
    fn test_result_without_request_is_ignored() {
        let mut gate = PermissionGate::new(Box::new(StaticPermissionService::granting()));
        assert!(matches!(
            gate.on_result(true),
            Err(BridgeError::ProtocolViolation(_))
        ));
        assert_eq!(gate.state(), PermissionState::Unknown);
    }

    #[test]
    fn test_previously_granted_skips_prompt() {
        let mut gate = PermissionGate::new(Box::new(PreviouslyGranted));
        assert_eq!(gate.request(), RequestOutcome::AlreadyGranted);
        assert!(gate.is_granted());
        assert_eq!(gate.try_result(), None);
    }

    #[tokio::test]
    async fn test_dropped_responder_counts_as_denied() {
        struct Forgetful;
        impl PermissionService for Forgetful {
            fn request(&mut self) -> oneshot::Receiver<bool> {
                let (_responder, receiver) = oneshot::channel();
                receiver
            }
        }

        let mut gate = PermissionGate::new(Box::new(Forgetful));
        gate.request();
        let granted = gate.wait_result().await;
        assert!(!granted);
        assert_eq!(gate.on_result(granted), Ok(PermissionState::Denied));
    }
}
