//! Shared state handed to every task

use std::sync::Arc;

use crate::barrier::ShutdownBarrier;
use crate::config::AppConfig;
use crate::gate::PauseGate;
use crate::interpreter::Interpreter;
use crate::registry::ClientRegistry;

/// Shared server state, cloned into the accept loop and every worker
#[derive(Clone)]
pub struct ServerContext {
    pub registry: Arc<ClientRegistry>,
    pub gate: Arc<PauseGate>,
    pub barrier: Arc<ShutdownBarrier>,
    pub interpreter: Arc<dyn Interpreter>,
    pub config: Arc<AppConfig>,
}

impl ServerContext {
    /// Wire up fresh registry, gate and barrier around `interpreter`
    pub fn new(interpreter: Arc<dyn Interpreter>, config: AppConfig) -> Self {
        let barrier = Arc::new(ShutdownBarrier::new());
        Self {
            registry: Arc::new(ClientRegistry::new(Arc::clone(&barrier))),
            gate: Arc::new(PauseGate::new()),
            barrier,
            interpreter,
            config: Arc::new(config),
        }
    }

    /// Longest accepted command line and reply
    pub fn max_line_length(&self) -> usize {
        self.config.server.max_line_length
    }
}
