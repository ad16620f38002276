//! Configuration schema structs

use kvgate_protocol::DEFAULT_MAX_LINE_LENGTH;
use kvgate_utils::{LogConfig, LogOutput};
use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Listener and worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the listener binds to (port comes from the command line)
    pub bind_address: String,
    /// Maximum command line length; replies are truncated to the same size
    pub max_line_length: usize,
    /// Treat a failed operator dump as fatal
    ///
    /// The C server this replaces exited on any dump error. The default here
    /// is `false`: the failure is logged and the server keeps serving.
    pub dump_failure_fatal: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".into(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            dump_failure_fatal: false,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub output: LogOutput,
    /// Log span enter/exit events
    pub span_events: bool,
    pub file_line: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            output: LogOutput::Stderr,
            span_events: false,
            file_line: false,
        }
    }
}

impl LoggingConfig {
    /// Build the subscriber configuration, letting `KVGATE_LOG` win
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            output: self.output,
            filter: self.filter.clone(),
            span_events: self.span_events,
            file_line: self.file_line,
        }
        .with_env_override()
    }
}
