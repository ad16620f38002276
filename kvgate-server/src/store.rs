//! In-memory key-value store
//!
//! The store serializes its own mutations behind a read/write lock. Once torn
//! down it answers every command with [`Reply::Unavailable`].

use std::collections::BTreeMap;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use kvgate_protocol::{Command, Reply};
use kvgate_utils::{KvgateError, Result};

use crate::interpreter::Interpreter;

/// Shared key-value database
#[derive(Debug, Default)]
pub struct Database {
    entries: RwLock<BTreeMap<String, String>>,
    torn_down: AtomicBool,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Apply a single command that does not touch the filesystem
    fn apply(&self, command: &Command) -> Reply {
        if self.is_torn_down() {
            return Reply::Unavailable;
        }

        match command {
            Command::Add { key, value } => {
                let mut entries = self.entries.write();
                if entries.contains_key(key) {
                    Reply::AlreadyPresent
                } else {
                    entries.insert(key.clone(), value.clone());
                    Reply::Added
                }
            }
            Command::Query { key } => match self.entries.read().get(key) {
                Some(value) => Reply::Value(value.clone()),
                None => Reply::NotFound,
            },
            Command::Delete { key } => match self.entries.write().remove(key) {
                Some(_) => Reply::Removed,
                None => Reply::NotPresent,
            },
            // Files may not include other files
            Command::File { .. } | Command::IllFormed => Reply::IllFormed,
        }
    }

    /// Run every line of `path` as a command, in order
    async fn run_file(&self, path: &str) -> Reply {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path, error = %e, "Cannot read command file");
                return Reply::BadFileName;
            }
        };

        let mut applied = 0usize;
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let reply = self.apply(&Command::parse(line));
            if reply == Reply::Unavailable {
                return reply;
            }
            applied += 1;
        }

        debug!(path, applied, "Command file processed");
        Reply::FileProcessed
    }

    fn write_entries<W: Write>(&self, out: W) -> io::Result<()> {
        let mut out = BufWriter::new(out);
        for (key, value) in self.entries.read().iter() {
            writeln!(out, "{} {}", key, value)?;
        }
        out.flush()
    }
}

impl Interpreter for Database {
    fn execute<'a>(&'a self, command: &'a str) -> BoxFuture<'a, String> {
        async move {
            let parsed = Command::parse(command);
            let reply = match &parsed {
                Command::File { path } if !self.is_torn_down() => self.run_file(path).await,
                other => self.apply(other),
            };

            if parsed.is_mutation() {
                debug!(command, reply = %reply, "Executed");
            } else {
                trace!(command, reply = %reply, "Executed");
            }
            reply.to_string()
        }
        .boxed()
    }

    fn dump(&self, target: Option<&Path>) -> Result<()> {
        if self.is_torn_down() {
            return Err(KvgateError::StoreUnavailable);
        }

        match target {
            Some(path) => {
                let file = std::fs::File::create(path).map_err(|e| KvgateError::FileWrite {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                self.write_entries(file).map_err(|e| KvgateError::FileWrite {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                info!(path = %path.display(), entries = self.len(), "Store dumped");
            }
            None => {
                if self.is_empty() {
                    debug!("Dumping empty store");
                }
                self.write_entries(io::stdout().lock())?;
            }
        }
        Ok(())
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            warn!("Store teardown requested twice");
            return;
        }

        let mut entries = self.entries.write();
        let released = entries.len();
        entries.clear();
        info!(released, "Store torn down");
    }
}
