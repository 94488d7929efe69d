//! Stream geometry and picture plane layout.

use av1::seq::SequenceHeaderObu;

use crate::error::PoolError;

/// Chroma arrangement of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Luma only.
    I400,
    /// Chroma halved horizontally and vertically.
    I420,
    /// Chroma halved horizontally.
    I422,
    /// Full resolution chroma.
    I444,
}

impl PixelLayout {
    /// Derives the layout from the color config flags of a sequence header.
    ///
    /// Returns `None` for the one combination AV1 forbids, vertical-only
    /// subsampling.
    pub fn from_subsampling(
        mono_chrome: bool,
        subsampling_x: bool,
        subsampling_y: bool,
    ) -> Option<Self> {
        match (mono_chrome, subsampling_x, subsampling_y) {
            (true, _, _) => Some(Self::I400),
            (false, true, true) => Some(Self::I420),
            (false, true, false) => Some(Self::I422),
            (false, false, false) => Some(Self::I444),
            (false, false, true) => None,
        }
    }

    /// Horizontal and vertical chroma shift.
    pub const fn chroma_shift(self) -> (u32, u32) {
        match self {
            Self::I420 => (1, 1),
            Self::I422 => (1, 0),
            Self::I400 | Self::I444 => (0, 0),
        }
    }

    /// Whether the layout carries chroma planes.
    pub const fn has_chroma(self) -> bool {
        !matches!(self, Self::I400)
    }
}

/// Coded geometry of a stream, taken from its first sequence header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Maximum frame width in pixels.
    pub width: u32,
    /// Maximum frame height in pixels.
    pub height: u32,
    /// Chroma arrangement.
    pub pixel_layout: PixelLayout,
    /// Bits per sample, 8, 10 or 12.
    pub bit_depth: u8,
}

impl Geometry {
    /// Builds the geometry described by a sequence header.
    ///
    /// Returns `None` if the header carries an impossible subsampling mode.
    pub fn from_sequence_header(header: &SequenceHeaderObu) -> Option<Self> {
        let color = &header.color_config;
        let pixel_layout = PixelLayout::from_subsampling(
            color.mono_chrome,
            color.subsampling_x,
            color.subsampling_y,
        )?;

        Some(Self {
            width: header.max_frame_width() as u32,
            height: header.max_frame_height() as u32,
            pixel_layout,
            bit_depth: color.bit_depth,
        })
    }

    /// Whether samples are stored as 16-bit words.
    pub const fn is_high_bit_depth(&self) -> bool {
        self.bit_depth > 8
    }

    /// Bytes used to store a single sample.
    pub const fn bytes_per_sample(&self) -> usize {
        if self.is_high_bit_depth() { 2 } else { 1 }
    }

    /// Chroma plane dimensions, rounding up for odd sizes.
    pub const fn chroma_size(&self) -> (u32, u32) {
        let (ss_x, ss_y) = self.pixel_layout.chroma_shift();
        (self.width.div_ceil(1 << ss_x), self.height.div_ceil(1 << ss_y))
    }
}

/// Which plane of a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    /// Luma.
    Y,
    /// First chroma plane.
    U,
    /// Second chroma plane.
    V,
}

/// Placement of one plane inside a picture buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Byte offset from the buffer start.
    pub offset: usize,
    /// Bytes per row.
    pub stride: usize,
    /// Allocated rows.
    pub rows: usize,
    /// Total plane bytes, `stride * rows`.
    pub length: usize,
}

impl PlaneLayout {
    fn new(
        offset: usize,
        width: u32,
        height: u32,
        alignment: usize,
        bytes_per_sample: usize,
    ) -> Result<Self, PoolError> {
        let stride = align_up(width as usize, alignment)?
            .checked_mul(bytes_per_sample)
            .ok_or(PoolError::SizeOverflow)?;
        let rows = align_up(height as usize, alignment)?;
        let length = stride.checked_mul(rows).ok_or(PoolError::SizeOverflow)?;

        Ok(Self {
            offset,
            stride,
            rows,
            length,
        })
    }

    /// Byte range of the plane inside its buffer.
    pub const fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// Layout of the three planes inside one picture buffer.
///
/// Computed once per session; every picture buffer shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Luma plane.
    pub y: PlaneLayout,
    /// First chroma plane.
    pub u: PlaneLayout,
    /// Second chroma plane.
    pub v: PlaneLayout,
    /// Chroma arrangement the layout was built for.
    pub pixel_layout: PixelLayout,
    /// Bytes per stored sample.
    pub bytes_per_sample: usize,
}

impl FrameLayout {
    /// Computes the plane layout for `geometry`, padding each plane
    /// dimension to a multiple of `alignment`.
    ///
    /// Chroma planes are laid out directly after luma, U before V.
    pub fn new(geometry: &Geometry, alignment: usize) -> Result<Self, PoolError> {
        let bytes_per_sample = geometry.bytes_per_sample();
        let y = PlaneLayout::new(0, geometry.width, geometry.height, alignment, bytes_per_sample)?;

        let (chroma_width, chroma_height) = geometry.chroma_size();
        let u = PlaneLayout::new(
            y.length,
            chroma_width,
            chroma_height,
            alignment,
            bytes_per_sample,
        )?;
        let v_offset = u.offset.checked_add(u.length).ok_or(PoolError::SizeOverflow)?;
        let v = PlaneLayout { offset: v_offset, ..u };

        v.offset.checked_add(v.length).ok_or(PoolError::SizeOverflow)?;

        Ok(Self {
            y,
            u,
            v,
            pixel_layout: geometry.pixel_layout,
            bytes_per_sample,
        })
    }

    /// Layout of a single plane.
    pub const fn plane(&self, plane: Plane) -> &PlaneLayout {
        match plane {
            Plane::Y => &self.y,
            Plane::U => &self.u,
            Plane::V => &self.v,
        }
    }

    /// Size of a whole picture buffer: luma plus both chroma planes.
    pub const fn total_size(&self) -> usize {
        self.v.offset + self.v.length
    }
}

/// Rounds `value` up to a multiple of `alignment`, which must be a power of two.
pub fn align_up(value: usize, alignment: usize) -> Result<usize, PoolError> {
    debug_assert!(alignment.is_power_of_two());
    let mask = alignment - 1;
    value
        .checked_add(mask)
        .map(|v| v & !mask)
        .ok_or(PoolError::SizeOverflow)
}
