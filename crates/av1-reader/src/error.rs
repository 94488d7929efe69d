//! Error types for opening sessions and driving the decoder.

use thiserror::Error;

/// Failures of the pool or of the size arithmetic behind it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Plane or buffer size does not fit in `usize`.
    #[error("picture buffer size overflows usize")]
    SizeOverflow,

    /// The request has no size or an alignment that is not a power of two.
    #[error("failed to allocate {size} byte picture buffer (alignment {alignment})")]
    AllocationFailed {
        /// Requested size in bytes.
        size: usize,
        /// Requested base alignment.
        alignment: usize,
    },
}

/// Errors reported by a [`DecodeEngine`](crate::DecodeEngine).
///
/// "Not ready yet" is not an error; engines report it as
/// [`Attempt::WouldBlock`](crate::Attempt::WouldBlock).
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not be constructed.
    #[error("engine initialization failed: {0}")]
    Init(String),

    /// The engine reported an unrecoverable failure.
    #[error("engine {operation} failed: {message}")]
    Fatal {
        /// The engine operation that failed.
        operation: &'static str,
        /// Engine supplied description.
        message: String,
    },

    /// The engine refuses input while having no output ready.
    #[error("engine refuses input and has no picture to drain")]
    Stalled,

    /// A picture buffer could not be obtained from the pool.
    #[error(transparent)]
    Pool(#[from] PoolError),

    /// The engine was used after teardown.
    #[error("engine used after teardown")]
    TornDown,
}

impl EngineError {
    /// Shorthand for [`EngineError::Fatal`].
    pub fn fatal(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Fatal {
            operation,
            message: message.into(),
        }
    }
}

/// Errors that can occur while opening a session.
#[derive(Error, Debug)]
pub enum OpenError {
    /// The bitstream file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The decoding engine could not be created.
    #[error("failed to initialize decoding engine: {0}")]
    EngineInitFailed(#[source] EngineError),

    /// The stream holds no syntax-valid sequence header.
    #[error("no sequence header found in bitstream")]
    NoSequenceHeaderFound,

    /// The first sequence header describes a single plane stream.
    #[error("monochrome (I400) streams are not supported")]
    UnsupportedMonochromeLayout,

    /// The picture buffer size for the stream geometry overflows.
    #[error("picture buffer size for the stream geometry overflows usize")]
    PoolSizeOverflow,

    /// The reader configuration was rejected.
    #[error("invalid reader configuration: {0}")]
    InvalidConfig(String),
}

/// Errors returned by [`Session::read_frames`](crate::Session::read_frames).
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The engine failed while accepting a unit.
    #[error("failed to send unit to engine: {0}")]
    SendFailed(#[source] EngineError),

    /// The engine failed while producing a picture.
    #[error("failed to receive picture from engine: {0}")]
    ReceiveFailed(#[source] EngineError),

    /// End of stream was reached before all requested frames were decoded.
    ///
    /// Only returned under [`ShortReadPolicy::Fail`](crate::ShortReadPolicy::Fail).
    #[error("end of stream after {decoded} of {requested} frames")]
    ShortRead {
        /// Frames requested by the caller.
        requested: usize,
        /// Frames decoded before the stream ran out.
        decoded: usize,
    },

    /// The session has been closed.
    #[error("session is closed")]
    Closed,
}
