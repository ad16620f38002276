//! Client Registry
//!
//! Tracks every live worker so the operator (or SIGINT) can cancel them all
//! at once. Registration also enters the shutdown barrier, and the returned
//! [`Registration`] guard undoes both when the worker exits by any path.
//!
//! The registry owns the accepting flag: once [`ClientRegistry::close`] has
//! run, no further worker can register.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::barrier::ShutdownBarrier;

/// Unique worker identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Create a WorkerId from a raw value (mainly for testing)
    #[cfg(test)]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    #[cfg(test)]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Worker({})", self.0)
    }
}

/// Entry for a live worker
#[derive(Debug)]
pub struct WorkerEntry {
    /// Cancels the worker at its current suspension point
    pub cancel: CancellationToken,
    /// Remote peer, for logging
    pub peer: String,
}

#[derive(Debug)]
struct RegistryState {
    accepting: bool,
    workers: HashMap<WorkerId, WorkerEntry>,
}

/// Registry of all live workers
///
/// One mutex guards both the worker map and the accepting flag. The only
/// other lock ever taken while it is held is the barrier's, inside
/// [`ClientRegistry::register`].
pub struct ClientRegistry {
    state: Mutex<RegistryState>,
    barrier: Arc<ShutdownBarrier>,
    next_worker_id: AtomicU64,
}

impl ClientRegistry {
    /// Create an empty, accepting registry reporting into `barrier`
    pub fn new(barrier: Arc<ShutdownBarrier>) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                accepting: true,
                workers: HashMap::new(),
            }),
            barrier,
            next_worker_id: AtomicU64::new(1),
        }
    }

    // ==================== Membership ====================

    /// Register a new worker
    ///
    /// Returns `None` without side effects once the registry is closed.
    /// Otherwise inserts the worker, enters the barrier, and returns the guard
    /// that reverses both on drop.
    pub fn register(
        self: &Arc<Self>,
        cancel: CancellationToken,
        peer: impl Into<String>,
    ) -> Option<Registration> {
        let mut state = self.state.lock();
        if !state.accepting {
            return None;
        }

        let id = WorkerId(self.next_worker_id.fetch_add(1, Ordering::SeqCst));
        let peer = peer.into();
        debug!(worker_id = %id, peer = %peer, "Registered worker");

        state.workers.insert(id, WorkerEntry { cancel, peer });
        // Entered under the registry lock so a shutdown that closes the
        // registry and then waits on the barrier can never miss this worker.
        self.barrier.enter();
        drop(state);

        Some(Registration {
            registry: Arc::clone(self),
            id,
        })
    }

    /// Remove a worker
    ///
    /// Returns `true` if the worker was present.
    pub fn unregister(&self, id: WorkerId) -> bool {
        let removed = self.state.lock().workers.remove(&id);
        match removed {
            Some(entry) => {
                debug!(worker_id = %id, peer = %entry.peer, "Unregistered worker");
                true
            }
            None => false,
        }
    }

    /// Request cancellation of every live worker
    ///
    /// Does not wait for the workers to exit; pair with
    /// [`ShutdownBarrier::wait_for_zero`] for that. Returns the number of
    /// workers asked to stop.
    pub fn cancel_all(&self) -> usize {
        let state = self.state.lock();
        for (id, entry) in state.workers.iter() {
            trace!(worker_id = %id, "Cancelling worker");
            entry.cancel.cancel();
        }
        let count = state.workers.len();
        drop(state);

        info!(count, "Cancellation requested for all workers");
        count
    }

    // ==================== Accepting flag ====================

    /// Stop admitting new workers. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.accepting {
            state.accepting = false;
            info!(live = state.workers.len(), "No longer accepting clients");
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.state.lock().accepting
    }

    // ==================== Queries ====================

    /// Number of live workers
    pub fn client_count(&self) -> usize {
        self.state.lock().workers.len()
    }

    #[cfg(test)]
    pub fn contains(&self, id: WorkerId) -> bool {
        self.state.lock().workers.contains_key(&id)
    }

    /// Ids of all live workers
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.state.lock().workers.keys().copied().collect()
    }

    /// Barrier this registry reports into
    #[cfg(test)]
    pub fn barrier(&self) -> &Arc<ShutdownBarrier> {
        &self.barrier
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClientRegistry")
            .field("accepting", &state.accepting)
            .field("client_count", &state.workers.len())
            .field("next_worker_id", &self.next_worker_id.load(Ordering::SeqCst))
            .finish()
    }
}

/// Membership of one worker in the registry and the barrier
///
/// Dropping it unregisters the worker and then leaves the barrier. This runs
/// on normal return, on cancellation, on panic, and when the task is aborted.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ClientRegistry>,
    id: WorkerId,
}

impl Registration {
    pub fn id(&self) -> WorkerId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.registry.unregister(self.id) {
            warn!(worker_id = %self.id, "Worker missing from registry at exit");
        }
        self.registry.barrier.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn setup() -> Arc<ClientRegistry> {
        Arc::new(ClientRegistry::new(Arc::new(ShutdownBarrier::new())))
    }

    // ==================== WorkerId Tests ====================

    #[test]
    fn test_worker_id_display() {
        let id = WorkerId::new(42);
        assert_eq!(format!("{}", id), "Worker(42)");
    }

    #[test]
    fn test_worker_id_hash() {
        let mut set = HashSet::new();
        set.insert(WorkerId::new(1));
        set.insert(WorkerId::new(2));
        set.insert(WorkerId::new(1));
        assert_eq!(set.len(), 2);
    }

    // ==================== Registration Tests ====================

    #[test]
    fn test_register_enters_barrier() {
        let registry = setup();
        let reg = registry.register(CancellationToken::new(), "peer-a").unwrap();

        assert_eq!(reg.id().value(), 1);
        assert!(registry.contains(reg.id()));
        assert_eq!(registry.client_count(), 1);
        assert_eq!(registry.barrier().active(), 1);
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = setup();
        let regs: Vec<_> = (0..3)
            .map(|_| registry.register(CancellationToken::new(), "peer").unwrap())
            .collect();

        let ids: HashSet<_> = regs.iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(registry.client_count(), 3);
    }

    #[test]
    fn test_drop_unregisters_and_leaves() {
        let registry = setup();
        let reg = registry.register(CancellationToken::new(), "peer").unwrap();
        let id = reg.id();

        drop(reg);
        assert!(!registry.contains(id));
        assert_eq!(registry.client_count(), 0);
        assert_eq!(registry.barrier().active(), 0);
    }

    #[test]
    fn test_unregister_nonexistent() {
        let registry = setup();
        assert!(!registry.unregister(WorkerId::new(999)));
    }

    #[test]
    fn test_interleaved_connect_disconnect_membership() {
        let registry = setup();
        let mut live: Vec<Registration> = Vec::new();

        // Remove from the front, middle and back in turn
        for round in 0..12 {
            live.push(registry.register(CancellationToken::new(), "peer").unwrap());
            live.push(registry.register(CancellationToken::new(), "peer").unwrap());
            let victim = match round % 3 {
                0 => 0,
                1 => live.len() / 2,
                _ => live.len() - 1,
            };
            drop(live.remove(victim));

            let expected: HashSet<_> = live.iter().map(|r| r.id()).collect();
            let actual: HashSet<_> = registry.worker_ids().into_iter().collect();
            assert_eq!(expected, actual);
            assert_eq!(registry.barrier().active(), live.len());
        }

        live.clear();
        assert_eq!(registry.client_count(), 0);
        assert_eq!(registry.barrier().active(), 0);
    }

    // ==================== Accepting Tests ====================

    #[test]
    fn test_closed_registry_rejects_without_side_effects() {
        let registry = setup();
        registry.close();
        registry.close();

        assert!(!registry.is_accepting());
        assert!(registry.register(CancellationToken::new(), "late").is_none());
        assert_eq!(registry.client_count(), 0);
        assert_eq!(registry.barrier().active(), 0);
    }

    #[test]
    fn test_close_keeps_existing_workers() {
        let registry = setup();
        let reg = registry.register(CancellationToken::new(), "early").unwrap();

        registry.close();
        assert!(registry.contains(reg.id()));
    }

    // ==================== Cancellation Tests ====================

    #[test]
    fn test_cancel_all_fires_every_token() {
        let registry = setup();
        let tokens: Vec<_> = (0..4).map(|_| CancellationToken::new()).collect();
        let _regs: Vec<_> = tokens
            .iter()
            .map(|t| registry.register(t.clone(), "peer").unwrap())
            .collect();

        assert_eq!(registry.cancel_all(), 4);
        assert!(tokens.iter().all(|t| t.is_cancelled()));
        // Cancellation alone does not remove anyone
        assert_eq!(registry.client_count(), 4);
    }

    #[test]
    fn test_cancel_all_empty() {
        let registry = setup();
        assert_eq!(registry.cancel_all(), 0);
    }

    #[tokio::test]
    async fn test_cancel_all_then_wait_for_zero() {
        for n in [0usize, 1, 50] {
            let registry = setup();
            let mut handles = Vec::new();

            for _ in 0..n {
                let registry = Arc::clone(&registry);
                let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
                handles.push(tokio::spawn(async move {
                    let cancel = CancellationToken::new();
                    let _reg = registry.register(cancel.clone(), "peer").unwrap();
                    let _ = ready_tx.send(());
                    cancel.cancelled().await;
                }));
                ready_rx.await.unwrap();
            }

            assert_eq!(registry.client_count(), n);
            registry.cancel_all();
            tokio::time::timeout(Duration::from_secs(2), registry.barrier().wait_for_zero())
                .await
                .expect("all workers should exit");

            assert_eq!(registry.barrier().active(), 0);
            assert_eq!(registry.client_count(), 0);
            for handle in handles {
                handle.await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_aborted_task_still_cleans_up() {
        let registry = setup();
        let task = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _reg = registry.register(CancellationToken::new(), "peer").unwrap();
                std::future::pending::<()>().await;
            })
        };

        while registry.client_count() == 0 {
            tokio::task::yield_now().await;
        }

        task.abort();
        let _ = task.await;
        assert_eq!(registry.client_count(), 0);
        assert_eq!(registry.barrier().active(), 0);
    }

    // ==================== Concurrent Access Tests ====================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration() {
        let registry = setup();
        let mut handles = vec![];

        for _ in 0..100 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let reg = registry.register(CancellationToken::new(), "peer").unwrap();
                tokio::task::yield_now().await;
                drop(reg);
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.client_count(), 0);
        assert_eq!(registry.barrier().active(), 0);
    }
}
