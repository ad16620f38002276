//! kvgate-protocol: Client line protocol
//!
//! Clients send one newline-terminated command per line and receive exactly
//! one reply line per command. This crate defines the command grammar, the
//! reply text, and the framing codec used on every client stream.

pub mod codec;
pub mod messages;

// Re-export main types at crate root
pub use codec::{CodecError, LineCodec, DEFAULT_MAX_LINE_LENGTH};
pub use messages::{Command, Reply};
