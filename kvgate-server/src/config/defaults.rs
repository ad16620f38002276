//! Default configuration values
//!
//! These are embedded in the binary and used when no config file exists.

/// Default configuration as TOML
pub const DEFAULT_CONFIG_TOML: &str = r##"
# kvgate configuration

[server]
bind_address = "127.0.0.1"
# Longest accepted command line, and the cap on reply length
max_line_length = 1024
# Exit when an operator dump (`p <file>`) cannot be written
dump_failure_fatal = false

[logging]
# Overridden by KVGATE_LOG
filter = "info"
# stderr | file | both
output = "stderr"
span_events = false
file_line = false
"##;
