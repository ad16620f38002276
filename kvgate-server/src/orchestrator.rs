//! Operator control loop and ordered shutdown
//!
//! The orchestrator owns the server's lifetime. It starts the signal monitor
//! and the accept loop, applies operator commands until the control input
//! ends, then shuts down in a fixed order:
//!
//! 1. stop admitting workers (registry closed)
//! 2. stop and join the signal monitor
//! 3. stop and join the accept loop
//! 4. cancel every live worker
//! 5. wait for the shutdown barrier to reach zero
//! 6. tear down the store, once

use std::sync::Arc;

use futures::Stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use kvgate_utils::{KvgateError, Result};

use crate::config::AppConfig;
use crate::context::ServerContext;
use crate::control::ControlCommand;
use crate::interpreter::Interpreter;
use crate::listener::AcceptLoop;
use crate::signals::SignalMonitor;

/// Server state container
pub struct Server {
    ctx: ServerContext,
}

impl Server {
    /// Create a new server around `interpreter`
    pub fn new(interpreter: Arc<dyn Interpreter>, config: AppConfig) -> Self {
        Self {
            ctx: ServerContext::new(interpreter, config),
        }
    }

    /// Shared state, for observing a running server
    pub fn context(&self) -> &ServerContext {
        &self.ctx
    }

    /// Serve clients on `listener` until `control` reaches end of input
    ///
    /// A control read error or a fatal dump failure still goes through the
    /// ordered shutdown before the error is returned.
    pub async fn run<R, S>(self, listener: TcpListener, control: R, signals: S) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        S: Stream<Item = ()> + Send + Unpin + 'static,
    {
        info!("kvgate server starting");

        let monitor = SignalMonitor::spawn(signals, Arc::clone(&self.ctx.registry));
        let accept = AcceptLoop::spawn(listener, self.ctx.clone());

        let outcome = self.control_loop(control).await;
        if let Err(e) = &outcome {
            error!(error = %e, "Fatal error, shutting down");
        }

        self.ctx.registry.close();
        self.shutdown(monitor, accept).await;
        outcome
    }

    /// Apply control lines until end of input
    ///
    /// Lines are raw bytes; invalid UTF-8 is replaced rather than rejected, so
    /// only a failed read ends the loop with an error.
    async fn control_loop<R>(&self, mut control: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = control
                .read_until(b'\n', &mut buf)
                .await
                .map_err(KvgateError::Control)?;
            if read == 0 {
                info!("End of control input");
                return Ok(());
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            self.apply(ControlCommand::parse(line))?;
        }
    }

    /// Apply one operator command
    fn apply(&self, command: ControlCommand) -> Result<()> {
        match command {
            ControlCommand::Stop => self.ctx.gate.stop(),
            ControlCommand::Go => self.ctx.gate.release(),
            ControlCommand::Dump(target) => {
                if let Err(e) = self.ctx.interpreter.dump(target.as_deref()) {
                    if self.ctx.config.server.dump_failure_fatal {
                        return Err(e);
                    }
                    error!(error = %e, "Store dump failed");
                }
            }
            ControlCommand::Ignored => debug!("Ignoring control line"),
        }
        Ok(())
    }

    async fn shutdown(&self, monitor: SignalMonitor, accept: AcceptLoop) {
        info!("Server shutting down");

        monitor.stop().await;
        accept.stop().await;

        let cancelled = self.ctx.registry.cancel_all();
        debug!(cancelled, "Waiting for workers to exit");
        self.ctx.barrier.wait_for_zero().await;

        let leftover = self.ctx.registry.worker_ids();
        if !leftover.is_empty() {
            warn!(?leftover, "Registry not empty after all workers exited");
        }

        self.ctx.interpreter.teardown();
        info!("Shutdown complete");
    }
}
