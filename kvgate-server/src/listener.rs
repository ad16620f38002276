//! TCP accept loop
//!
//! Hands every accepted connection to a new detached worker. Connections that
//! arrive after the registry has closed are dropped here, before any task is
//! spawned for them.

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use kvgate_utils::{KvgateError, Result};

use crate::context::ServerContext;
use crate::worker;

/// Bind the client listener
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| KvgateError::Bind {
        addr: addr.to_string(),
        source: e,
    })
}

/// Handle for a running accept loop
#[derive(Debug)]
pub struct AcceptLoop {
    cancel_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

impl AcceptLoop {
    /// Start accepting on `listener`
    pub fn spawn(listener: TcpListener, ctx: ServerContext) -> Self {
        let cancel_token = CancellationToken::new();
        let join_handle = tokio::spawn(run_accept_loop(listener, ctx, cancel_token.clone()));

        Self {
            cancel_token,
            join_handle,
        }
    }

    /// Cancel the loop and wait for it to exit
    ///
    /// Once this returns no further connection can reach a worker.
    pub async fn stop(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.join_handle.await {
            error!(error = %e, "Accept loop task failed");
        }
    }
}

async fn run_accept_loop(listener: TcpListener, ctx: ServerContext, cancel: CancellationToken) {
    match listener.local_addr() {
        Ok(addr) => info!("Listening for clients on {}", addr),
        Err(e) => debug!(error = %e, "Listener has no local address"),
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Accept loop stopping");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        if !ctx.registry.is_accepting() {
                            debug!(peer = %peer_addr, "Dropping late connection");
                            continue;
                        }
                        debug!(peer = %peer_addr, "New client connection");
                        worker::spawn(stream, peer_addr.to_string(), ctx.clone());
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
        }
    }
}
