//! Mirrors the identity provider's session stream into readable state.
//!
//! ARCHITECTURE
//! ============
//! The controller owns the provider [`Subscription`] and a `watch` channel
//! holding the latest [`SessionState`]. The provider callback is the only
//! writer; any number of [`SessionReader`]s clone the latest version.
//!
//! DESIGN
//! ======
//! Every replacement runs under a single gate mutex that also guards the
//! lifecycle phase and the start epoch. Each `start()` attempt hands the
//! provider a callback tagged with its epoch; only the current epoch may
//! write, and nothing is published until `subscribe` has returned `Ok`.
//! `stop()` flips the phase under the gate before releasing the
//! subscription, so once it returns no callback (in flight, or a stale
//! captured clone) can replace the state again.
//!
//! TRADE-OFFS
//! ==========
//! No timeout or retry lives here. A failed subscription setup leaves the
//! state at `Loading`; fallback policy belongs to the routing collaborator.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::state::{Principal, SessionState, Transition};
use crate::provider::{IdentityProvider, SessionCallback, Subscription, SubscriptionError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session controller already started")]
    AlreadyStarted,
    #[error("session controller stopped")]
    Stopped,
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Inside `provider.subscribe`; notifications are held in `pending`.
    Starting,
    Running,
    Stopped,
}

struct Gate {
    phase: Phase,
    /// Start attempt whose callback is allowed to write.
    epoch: u64,
    pending: Vec<Option<Principal>>,
    listeners: Vec<mpsc::UnboundedSender<Transition>>,
}

struct Shared {
    gate: Mutex<Gate>,
    state: watch::Sender<SessionState>,
}

impl Shared {
    fn gate(&self) -> std::sync::MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle one provider notification delivered to the callback of
    /// start attempt `epoch`. Stale epochs and stopped controllers are no-ops.
    fn notify(&self, epoch: u64, principal: Option<Principal>) {
        let mut gate = self.gate();
        if gate.epoch != epoch {
            debug!(epoch, current = gate.epoch, "stale session notification ignored");
            return;
        }
        match gate.phase {
            Phase::Starting => gate.pending.push(principal),
            Phase::Running => self.replace(&mut gate, principal),
            Phase::Idle | Phase::Stopped => debug!(phase = ?gate.phase, "session notification ignored"),
        }
    }

    fn replace(&self, gate: &mut Gate, principal: Option<Principal>) {
        let next = SessionState::from_notification(principal);
        let previous = self.state.send_replace(next.clone());
        debug!(from = %previous.status(), to = %next.status(), "session state replaced");

        if previous.status() != next.status() {
            let transition = Transition { from: previous.status(), to: next };
            gate.listeners.retain(|tx| tx.send(transition.clone()).is_ok());
        }
    }
}

// =============================================================================
// READER
// =============================================================================

/// Read-only handle to the latest session state.
#[derive(Clone)]
pub struct SessionReader {
    rx: watch::Receiver<SessionState>,
}

impl SessionReader {
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next replacement and return it. `None` once the
    /// controller is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Snapshot plus every later status transition.
pub struct TransitionFeed {
    pub initial: SessionState,
    pub rx: mpsc::UnboundedReceiver<Transition>,
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct SessionController {
    shared: Arc<Shared>,
    subscription: Option<Subscription>,
}

impl SessionController {
    #[must_use]
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(SessionState::Loading);
        Self {
            shared: Arc::new(Shared {
                gate: Mutex::new(Gate { phase: Phase::Idle, epoch: 0, pending: Vec::new(), listeners: Vec::new() }),
                state,
            }),
            subscription: None,
        }
    }

    /// Subscribe to the provider's session-change stream.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyStarted`] or [`SessionError::Stopped`] on
    /// lifecycle misuse; [`SessionError::Subscription`] when the provider
    /// cannot register the callback, in which case the state stays `Loading`.
    pub fn start(&mut self, provider: &dyn IdentityProvider) -> Result<(), SessionError> {
        let epoch = {
            let mut gate = self.shared.gate();
            match gate.phase {
                Phase::Starting | Phase::Running => return Err(SessionError::AlreadyStarted),
                Phase::Stopped => return Err(SessionError::Stopped),
                Phase::Idle => {}
            }
            gate.phase = Phase::Starting;
            gate.epoch += 1;
            gate.epoch
        };

        // Providers may deliver the first notification from inside
        // `subscribe`, so the gate must not be held here. Those
        // notifications wait in `pending` until setup succeeds.
        let shared = Arc::clone(&self.shared);
        let callback: SessionCallback = Arc::new(move |principal| shared.notify(epoch, principal));
        let result = provider.subscribe(callback);

        let mut gate = self.shared.gate();
        match result {
            Ok(subscription) => {
                gate.phase = Phase::Running;
                for principal in std::mem::take(&mut gate.pending) {
                    self.shared.replace(&mut gate, principal);
                }
                drop(gate);
                self.subscription = Some(subscription);
                info!(epoch, "session subscription started");
                Ok(())
            }
            Err(e) => {
                gate.phase = Phase::Idle;
                gate.epoch += 1;
                gate.pending.clear();
                drop(gate);
                warn!(error = %e, "session subscription setup failed; state stays loading");
                Err(e.into())
            }
        }
    }

    /// Release the subscription. Idempotent; later notifications are ignored.
    pub fn stop(&mut self) {
        {
            let mut gate = self.shared.gate();
            if gate.phase == Phase::Stopped {
                return;
            }
            gate.phase = Phase::Stopped;
            gate.pending.clear();
            gate.listeners.clear();
        }

        if let Some(subscription) = self.subscription.take() {
            subscription.release();
            info!("session subscription released");
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.gate().phase == Phase::Running
    }

    #[must_use]
    pub fn reader(&self) -> SessionReader {
        SessionReader { rx: self.shared.state.subscribe() }
    }

    /// Register for status transitions. The snapshot and registration are
    /// taken under the replacement gate. A stopped controller yields a feed
    /// that is already closed.
    #[must_use]
    pub fn transitions(&self) -> TransitionFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut gate = self.shared.gate();
        let initial = self.shared.state.borrow().clone();
        if gate.phase != Phase::Stopped {
            gate.listeners.push(tx);
        }
        TransitionFeed { initial, rx }
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
