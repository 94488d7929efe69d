//! Error types for OBU scanning and sequence header parsing.

use thiserror::Error;

/// Errors that can occur while walking or parsing an AV1 bitstream.
#[derive(Error, Debug)]
pub enum Av1Error {
    /// An I/O error occurred, usually a truncated header.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid OBU data.
    #[error("invalid OBU: {0}")]
    InvalidObu(String),

    /// LEB128 value overflow.
    #[error("LEB128 overflow: value exceeds maximum")]
    Leb128Overflow,

    /// A unit declares more payload than the buffer holds.
    #[error("unexpected end of data: expected {expected} bytes, got {actual}")]
    UnexpectedEof {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes available.
        actual: usize,
    },

    /// The sequence header payload is not syntax-valid.
    #[error("invalid sequence header: {0}")]
    InvalidSequenceHeader(String),
}

/// Result type alias for AV1 bitstream operations.
pub type Result<T> = std::result::Result<T, Av1Error>;
