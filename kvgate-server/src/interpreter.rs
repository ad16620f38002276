//! Seam between the worker lifecycle and the data store
//!
//! Workers only ever reach shared state through this trait, which lets the
//! lifecycle be exercised against instrumented stores in tests.

use std::path::Path;

use futures::future::BoxFuture;
use kvgate_utils::Result;

/// Executes client commands against shared state
pub trait Interpreter: Send + Sync + 'static {
    /// Run one command line and produce the reply text
    ///
    /// The returned future may be dropped before completion when the worker
    /// is cancelled.
    fn execute<'a>(&'a self, command: &'a str) -> BoxFuture<'a, String>;

    /// Write every entry to `target`, or to stdout when `None`
    fn dump(&self, target: Option<&Path>) -> Result<()>;

    /// Release all store resources
    ///
    /// Called once, after every worker has exited.
    fn teardown(&self);
}
