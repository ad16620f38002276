//! Line codec for client stream framing

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

/// Default maximum line length in bytes (excluding the newline)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line too long (max {max} bytes)")]
    LineTooLong { max: usize },
}

/// Newline-delimited text codec with a bounded line length
///
/// Decodes one command per line (trailing `\r` stripped) and encodes one
/// reply per line. An over-long line is an error; callers treat it as the
/// end of the stream.
#[derive(Debug, Clone)]
pub struct LineCodec {
    inner: LinesCodec,
    max_length: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    fn convert_err(&self, err: LinesCodecError) -> CodecError {
        match err {
            LinesCodecError::MaxLineLengthExceeded => CodecError::LineTooLong {
                max: self.max_length,
            },
            LinesCodecError::Io(e) => CodecError::Io(e),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.inner.decode(src).map_err(|e| self.convert_err(e))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.inner.decode_eof(src).map_err(|e| self.convert_err(e))
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(item, dst).map_err(|e| self.convert_err(e))
    }
}
