//! Decoded pictures and the borrowed views handed to callers.

use crate::geometry::{FrameLayout, Plane};
use crate::pool::{AlignedBuffer, PictureBuffer};

/// A decoded picture stored in a pool buffer.
#[derive(Debug)]
pub struct Picture {
    buffer: PictureBuffer,
    width: u32,
    height: u32,
}

impl Picture {
    /// Wraps a filled pool buffer. `width` and `height` are the decoded
    /// frame dimensions, which may be smaller than the stream maximum.
    pub fn new(buffer: PictureBuffer, width: u32, height: u32) -> Self {
        Self {
            buffer,
            width,
            height,
        }
    }

    /// Decoded width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Decoded height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Plane layout of the backing buffer.
    pub fn layout(&self) -> &FrameLayout {
        self.buffer.layout()
    }

    /// Bytes of one plane.
    pub fn plane(&self, plane: Plane) -> &[u8] {
        self.buffer.plane(plane)
    }

    /// Borrowed view of the three planes.
    pub fn view(&self) -> PictureView<'_> {
        let layout = self.buffer.layout();
        PictureView {
            y: self.buffer.plane(Plane::Y),
            u: self.buffer.plane(Plane::U),
            v: self.buffer.plane(Plane::V),
            y_stride: layout.y.stride,
            uv_stride: layout.u.stride,
            width: self.width,
            height: self.height,
        }
    }

    pub(crate) fn into_buffer(self) -> AlignedBuffer {
        self.buffer.into_inner()
    }
}

/// Plane data of the current picture.
///
/// Borrowed from the session; it stays valid until the next call that
/// mutates the session.
#[derive(Debug, Clone, Copy)]
pub struct PictureView<'a> {
    /// Luma plane, `y_stride` bytes per row.
    pub y: &'a [u8],
    /// First chroma plane, `uv_stride` bytes per row.
    pub u: &'a [u8],
    /// Second chroma plane, `uv_stride` bytes per row.
    pub v: &'a [u8],
    /// Bytes per luma row.
    pub y_stride: usize,
    /// Bytes per chroma row.
    pub uv_stride: usize,
    /// Decoded width in pixels.
    pub width: u32,
    /// Decoded height in pixels.
    pub height: u32,
}

impl PictureView<'_> {
    /// Length of the luma plane in bytes.
    pub fn y_length(&self) -> usize {
        self.y.len()
    }

    /// Length of each chroma plane in bytes.
    pub fn uv_length(&self) -> usize {
        self.u.len()
    }
}
