//! SIGINT monitor
//!
//! Installing the SIGINT listener replaces the default disposition for the
//! whole process, so an interrupt never terminates the server. A single
//! monitor task consumes the signals and does exactly one thing with each:
//! ask every worker to cancel. Workers still clean up and leave the barrier
//! themselves.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use kvgate_utils::{KvgateError, Result};

use crate::registry::ClientRegistry;

/// Install the SIGINT listener and expose it as a stream
///
/// Fails if the handler cannot be installed; the server cannot run without it.
pub fn interrupt_stream() -> Result<impl Stream<Item = ()> + Send + Unpin + 'static> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(KvgateError::Signal)?;
    Ok(futures::stream::poll_fn(move |cx| sigint.poll_recv(cx)))
}

/// Handle for the running signal monitor
#[derive(Debug)]
pub struct SignalMonitor {
    cancel_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

impl SignalMonitor {
    /// Start consuming `signals`, cancelling all workers on each one
    pub fn spawn<S>(signals: S, registry: Arc<ClientRegistry>) -> Self
    where
        S: Stream<Item = ()> + Send + Unpin + 'static,
    {
        let cancel_token = CancellationToken::new();
        let join_handle = tokio::spawn(monitor(signals, registry, cancel_token.clone()));

        Self {
            cancel_token,
            join_handle,
        }
    }

    /// Cancel the monitor and wait for it to exit
    pub async fn stop(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.join_handle.await {
            error!(error = %e, "Signal monitor task failed");
        }
    }
}

async fn monitor<S>(mut signals: S, registry: Arc<ClientRegistry>, cancel: CancellationToken)
where
    S: Stream<Item = ()> + Unpin,
{
    debug!("Signal monitor started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = signals.next() => {
                if received.is_none() {
                    debug!("Signal stream ended");
                    break;
                }
                info!("SIGINT received, cancelling all clients");
                println!("\nSIGINT received.");
                registry.cancel_all();
            }
        }
    }

    debug!("Signal monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::channel::mpsc;

    use crate::barrier::ShutdownBarrier;

    fn setup() -> Arc<ClientRegistry> {
        Arc::new(ClientRegistry::new(Arc::new(ShutdownBarrier::new())))
    }

    async fn wait_cancelled(token: &CancellationToken) {
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("token should be cancelled");
    }

    #[tokio::test]
    async fn test_signal_cancels_all_workers() {
        let registry = setup();
        let (tx, rx) = mpsc::unbounded();
        let monitor = SignalMonitor::spawn(rx, Arc::clone(&registry));

        let first = CancellationToken::new();
        let second = CancellationToken::new();
        let _a = registry.register(first.clone(), "a").unwrap();
        let _b = registry.register(second.clone(), "b").unwrap();

        tx.unbounded_send(()).unwrap();
        wait_cancelled(&first).await;
        wait_cancelled(&second).await;

        // The monitor keeps running and handles later signals too
        let third = CancellationToken::new();
        let _c = registry.register(third.clone(), "c").unwrap();
        tx.unbounded_send(()).unwrap();
        wait_cancelled(&third).await;

        assert!(registry.is_accepting());
        tokio::time::timeout(Duration::from_secs(1), monitor.stop())
            .await
            .expect("monitor should stop");
    }

    #[tokio::test]
    async fn test_stop_without_signals() {
        let registry = setup();
        let (_tx, rx) = mpsc::unbounded::<()>();
        let monitor = SignalMonitor::spawn(rx, registry);

        tokio::time::timeout(Duration::from_secs(1), monitor.stop())
            .await
            .expect("monitor should stop");
    }

    #[tokio::test]
    async fn test_interrupt_stream_installs() {
        assert!(interrupt_stream().is_ok());
    }
}
