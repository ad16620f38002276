//! Command-line argument parsing for the kvgate server

use clap::Parser;
use std::path::PathBuf;

use kvgate_utils::{KvgateError, Result};

/// Lowest port a client listener may use
pub const MIN_PORT: u16 = 1024;

/// kvgate - concurrent key-value server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TCP port for client connections (at least 1024)
    pub port: u16,

    /// Configuration file
    ///
    /// Defaults to config.toml in the user configuration directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Reject privileged ports
    pub fn validate(&self) -> Result<()> {
        if self.port < MIN_PORT {
            return Err(KvgateError::InvalidPort {
                port: self.port,
                min: MIN_PORT,
            });
        }
        Ok(())
    }
}
