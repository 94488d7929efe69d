//! The decoding engine seam.
//!
//! The reader never decodes pixels itself. It feeds whole OBUs to a
//! [`DecodeEngine`] and pulls finished pictures out of it, both calls
//! possibly answering "not now" with [`Attempt::WouldBlock`].

use bytes::Bytes;

use crate::error::EngineError;
use crate::picture::Picture;
use crate::pool::PicturePool;

#[cfg(feature = "dav1d")]
mod dav1d;

#[cfg(feature = "dav1d")]
pub use self::dav1d::{Dav1dEngine, Dav1dSettings};

/// Outcome of a non-failing engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt<T> {
    /// The call completed.
    Ready(T),
    /// The engine cannot make progress on this call until the other
    /// direction is serviced.
    WouldBlock,
}

/// A decoder backend driven by a reading session.
pub trait DecodeEngine {
    /// Offers one complete OBU, header included.
    ///
    /// `WouldBlock` means the unit was not accepted and must be offered
    /// again after the engine has been polled for a picture.
    fn send(&mut self, unit: Bytes) -> Result<Attempt<()>, EngineError>;

    /// Takes the next finished picture, storing it in a buffer from `pool`.
    ///
    /// `WouldBlock` means more input is needed, or the engine is drained.
    fn receive_picture(&mut self, pool: &mut PicturePool) -> Result<Attempt<Picture>, EngineError>;

    /// Drops all queued input and pending pictures.
    fn flush(&mut self);

    /// Releases engine resources. The engine is not used afterwards.
    fn teardown(&mut self) {}
}
