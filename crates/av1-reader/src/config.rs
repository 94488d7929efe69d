//! Reader configuration.

use crate::error::OpenError;

/// Default dimension alignment for plane geometry.
pub const DEFAULT_PLANE_ALIGNMENT: usize = 128;

/// Default base address alignment for picture buffers.
pub const DEFAULT_BASE_ALIGNMENT: usize = 64;

/// Default number of times a refused unit is resent while the engine has
/// no picture to give back.
pub const DEFAULT_STALL_RETRIES: usize = 16;

/// What [`Session::read_frames`](crate::Session::read_frames) does when the
/// stream ends before the requested number of frames was decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShortReadPolicy {
    /// Return the last decoded picture, if any.
    #[default]
    ReturnLast,
    /// Report [`DecodeError::ShortRead`](crate::DecodeError::ShortRead).
    Fail,
}

/// Configurable options for a reading session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Behavior on end of stream partway through a multi-frame read.
    pub short_read: ShortReadPolicy,

    /// Maximum number of released picture buffers kept for reuse.
    /// Buffers released beyond this are freed immediately.
    pub max_pooled_buffers: usize,

    /// Alignment applied to plane widths and heights. Power of two.
    pub plane_alignment: usize,

    /// Base address alignment of every picture buffer. Power of two.
    pub base_alignment: usize,

    /// Consecutive refused sends tolerated while the engine yields nothing.
    /// One more refusal reports the engine as stalled.
    pub stall_retries: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            short_read: ShortReadPolicy::ReturnLast,
            max_pooled_buffers: 8,
            plane_alignment: DEFAULT_PLANE_ALIGNMENT,
            base_alignment: DEFAULT_BASE_ALIGNMENT,
            stall_retries: DEFAULT_STALL_RETRIES,
        }
    }
}

impl ReaderConfig {
    /// Sets the short read policy.
    pub fn with_short_read(mut self, policy: ShortReadPolicy) -> Self {
        self.short_read = policy;
        self
    }

    /// Sets the pool retention cap.
    pub fn with_max_pooled_buffers(mut self, max: usize) -> Self {
        self.max_pooled_buffers = max;
        self
    }

    /// Sets the plane dimension alignment.
    pub fn with_plane_alignment(mut self, alignment: usize) -> Self {
        self.plane_alignment = alignment;
        self
    }

    /// Sets the buffer base address alignment.
    pub fn with_base_alignment(mut self, alignment: usize) -> Self {
        self.base_alignment = alignment;
        self
    }

    /// Sets how often a refused unit is resent before giving up.
    pub fn with_stall_retries(mut self, retries: usize) -> Self {
        self.stall_retries = retries;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), OpenError> {
        if !self.plane_alignment.is_power_of_two() {
            return Err(OpenError::InvalidConfig(format!(
                "plane_alignment {} is not a power of two",
                self.plane_alignment
            )));
        }
        if !self.base_alignment.is_power_of_two() {
            return Err(OpenError::InvalidConfig(format!(
                "base_alignment {} is not a power of two",
                self.base_alignment
            )));
        }
        Ok(())
    }
}
