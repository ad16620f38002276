//! Per-connection worker lifecycle
//!
//! Each accepted connection gets one detached task that:
//! 1. registers itself (or is rejected once the server stops accepting),
//! 2. reads a command line, waits at the pause gate, runs the command and
//!    writes the reply, until the stream ends or the worker is cancelled,
//! 3. cleans up exactly once on every exit path.
//!
//! Cleanup is carried by locals rather than code at the bottom of the loop:
//! the framed stream is dropped first (closing the connection), then the
//! [`Registration`](crate::registry::Registration) guard unregisters the
//! worker and leaves the shutdown barrier. The same drops run if the task is
//! cancelled mid-await, panics, or is aborted.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use kvgate_protocol::LineCodec;

use crate::context::ServerContext;
use crate::registry::WorkerId;

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The server had stopped accepting; nothing was registered
    Rejected,
    /// The client closed the stream
    Disconnected,
    /// Cancelled by `cancel_all`
    Cancelled,
    /// Read, write or framing error; handled like a disconnect
    StreamError,
}

/// Spawn a detached worker for `stream`
pub fn spawn<S>(stream: S, peer: String, ctx: ServerContext)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        run(stream, peer, ctx).await;
    });
}

/// Serve one connection to completion
pub async fn run<S>(stream: S, peer: String, ctx: ServerContext) -> WorkerExit
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let cancel = CancellationToken::new();
    let Some(registration) = ctx.registry.register(cancel.clone(), peer.as_str()) else {
        debug!(peer = %peer, "Rejecting connection: server no longer accepting");
        return WorkerExit::Rejected;
    };
    let worker_id = registration.id();

    let mut framed = Framed::new(stream, LineCodec::with_max_length(ctx.max_line_length()));
    let exit = serve(&mut framed, &cancel, &ctx, worker_id).await;

    drop(framed);
    drop(registration);
    debug!(worker_id = %worker_id, peer = %peer, exit = ?exit, "Worker finished");
    exit
}

async fn serve<S>(
    framed: &mut Framed<S, LineCodec>,
    cancel: &CancellationToken,
    ctx: &ServerContext,
    worker_id: WorkerId,
) -> WorkerExit
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let max_reply = ctx.max_line_length();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return WorkerExit::Cancelled,
            next = framed.next() => next,
        };

        let command = match next {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                debug!(worker_id = %worker_id, error = %e, "Client stream error");
                return WorkerExit::StreamError;
            }
            None => return WorkerExit::Disconnected,
        };

        if ctx.gate.wait_if_stopped(cancel).await.is_err() {
            return WorkerExit::Cancelled;
        }

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return WorkerExit::Cancelled,
            reply = ctx.interpreter.execute(&command) => reply,
        };
        let reply = truncate_reply(reply, max_reply);

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return WorkerExit::Cancelled,
            sent = framed.send(reply) => sent,
        };
        if let Err(e) = sent {
            debug!(worker_id = %worker_id, error = %e, "Failed to write reply");
            return WorkerExit::StreamError;
        }
    }
}

/// Cut `reply` to at most `max` bytes on a char boundary, and to its first line
fn truncate_reply(mut reply: String, max: usize) -> String {
    if let Some(newline) = reply.find('\n') {
        reply.truncate(newline);
    }
    if reply.len() > max {
        let mut end = max;
        while !reply.is_char_boundary(end) {
            end -= 1;
        }
        reply.truncate(end);
    }
    reply
}
