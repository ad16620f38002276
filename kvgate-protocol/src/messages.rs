//! Command grammar and reply text
//!
//! A command line is a one-letter verb followed by whitespace-separated
//! arguments:
//!
//! | line              | command            |
//! |-------------------|--------------------|
//! | `a <key> <value>` | [`Command::Add`]    |
//! | `q <key>`         | [`Command::Query`]  |
//! | `d <key>`         | [`Command::Delete`] |
//! | `f <path>`        | [`Command::File`]   |
//!
//! Anything else parses to [`Command::IllFormed`].

use std::fmt;

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert `key` with `value` if absent
    Add { key: String, value: String },
    /// Look up `key`
    Query { key: String },
    /// Remove `key`
    Delete { key: String },
    /// Run every line of the file at `path` as a command
    File { path: String },
    /// Unrecognized verb or wrong number of arguments
    IllFormed,
}

impl Command {
    /// Parse one command line
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let Some(verb) = tokens.next() else {
            return Self::IllFormed;
        };
        let args: Vec<&str> = tokens.collect();

        match (verb, args.as_slice()) {
            ("a", [key, value]) => Self::Add {
                key: (*key).to_string(),
                value: (*value).to_string(),
            },
            ("q", [key]) => Self::Query {
                key: (*key).to_string(),
            },
            ("d", [key]) => Self::Delete {
                key: (*key).to_string(),
            },
            ("f", [path]) => Self::File {
                path: (*path).to_string(),
            },
            _ => Self::IllFormed,
        }
    }

    /// Whether this command changes the store
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Add { .. } | Self::Delete { .. } | Self::File { .. })
    }
}

/// Reply sent back for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Added,
    AlreadyPresent,
    Value(String),
    NotFound,
    Removed,
    NotPresent,
    FileProcessed,
    BadFileName,
    IllFormed,
    /// The store has been torn down
    Unavailable,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => f.write_str("added"),
            Self::AlreadyPresent => f.write_str("already in database"),
            Self::Value(value) => f.write_str(value),
            Self::NotFound => f.write_str("not found"),
            Self::Removed => f.write_str("removed"),
            Self::NotPresent => f.write_str("not in database"),
            Self::FileProcessed => f.write_str("file processed"),
            Self::BadFileName => f.write_str("bad file name"),
            Self::IllFormed => f.write_str("ill-formed command"),
            Self::Unavailable => f.write_str("store unavailable"),
        }
    }
}
