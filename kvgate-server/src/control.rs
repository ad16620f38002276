//! Operator control commands
//!
//! Read line by line from the control input (stdin for the binary). Only the
//! first character selects the command:
//!
//! - `s...` stop client commands
//! - `g...` resume client commands
//! - `p [file]` dump the store to `file`, or to stdout without one
//!
//! End of input starts shutdown and is handled by the orchestrator.

use std::path::PathBuf;

/// A parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
    Go,
    Dump(Option<PathBuf>),
    /// Blank line or unknown prefix
    Ignored,
}

impl ControlCommand {
    pub fn parse(line: &str) -> Self {
        let mut chars = line.chars();
        match chars.next() {
            Some('s') => Self::Stop,
            Some('g') => Self::Go,
            Some('p') => Self::Dump(
                chars
                    .as_str()
                    .split_whitespace()
                    .next()
                    .map(PathBuf::from),
            ),
            _ => Self::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_selects_command() {
        assert_eq!(ControlCommand::parse("s"), ControlCommand::Stop);
        assert_eq!(ControlCommand::parse("stop"), ControlCommand::Stop);
        assert_eq!(ControlCommand::parse("g"), ControlCommand::Go);
        assert_eq!(ControlCommand::parse("go now"), ControlCommand::Go);
    }

    #[test]
    fn test_dump_target() {
        assert_eq!(
            ControlCommand::parse("p out.txt"),
            ControlCommand::Dump(Some(PathBuf::from("out.txt")))
        );
        assert_eq!(
            ControlCommand::parse("p \t out.txt trailing"),
            ControlCommand::Dump(Some(PathBuf::from("out.txt")))
        );
        assert_eq!(ControlCommand::parse("p"), ControlCommand::Dump(None));
        assert_eq!(ControlCommand::parse("p   "), ControlCommand::Dump(None));
    }

    #[test]
    fn test_ignored() {
        assert_eq!(ControlCommand::parse(""), ControlCommand::Ignored);
        assert_eq!(ControlCommand::parse(" s"), ControlCommand::Ignored);
        assert_eq!(ControlCommand::parse("x"), ControlCommand::Ignored);
    }
}
