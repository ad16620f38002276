//! Pause/resume gate
//!
//! A single process-wide switch consulted by every worker before it starts a
//! command. `stop()` holds back the next command of every worker; `release()`
//! lets all of them through at once. Commands already past the gate are not
//! affected.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Returned when a gate wait is interrupted by cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("worker cancelled while waiting at the gate")]
pub struct Cancelled;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct GateState {
    stopped: bool,
    /// Incremented by every `release()`
    epoch: u64,
}

/// Shared pause/resume gate
#[derive(Debug)]
pub struct PauseGate {
    state: watch::Sender<GateState>,
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseGate {
    /// Create an open gate
    pub fn new() -> Self {
        let (state, _) = watch::channel(GateState::default());
        Self { state }
    }

    /// Hold back the next command of every worker. Idempotent.
    pub fn stop(&self) {
        let changed = self.state.send_if_modified(|state| {
            let was_stopped = state.stopped;
            state.stopped = true;
            !was_stopped
        });

        if changed {
            info!("Client commands paused");
        } else {
            debug!("Gate already stopped");
        }
    }

    /// Open the gate and wake every waiting worker
    pub fn release(&self) {
        let was_stopped = self.state.borrow().stopped;
        self.state.send_modify(|state| {
            state.stopped = false;
            state.epoch = state.epoch.wrapping_add(1);
        });

        if was_stopped {
            info!("Client commands resumed");
        } else {
            debug!("Gate already open");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state.borrow().stopped
    }

    /// Wait until the gate is open, or until `cancel` fires
    ///
    /// A worker that starts waiting is let through by the next `release()`,
    /// even if `stop()` is called again before it gets to run.
    pub async fn wait_if_stopped(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let mut rx = self.state.subscribe();
        let entered = *rx.borrow_and_update();
        if !entered.stopped {
            return Ok(());
        }

        debug!("Waiting at gate");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            _ = rx.wait_for(|state| !state.stopped || state.epoch != entered.epoch) => Ok(()),
        }
    }
}
