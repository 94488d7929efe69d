//! Reusable, aligned picture buffers.
//!
//! Every buffer handed out by a [`PicturePool`] has the same size, the size
//! of one picture of the stream, so a released buffer can back any later
//! picture. Buffers live either in the free list or with a picture, never
//! both; the pool frees whatever it still holds when drained.

use std::fmt;

use aligned_vec::{AVec, RuntimeAlign};
use tracing::{debug, trace};

use crate::error::PoolError;
use crate::geometry::{FrameLayout, Plane};

/// A zero-initialized heap block with a guaranteed base alignment.
pub struct AlignedBuffer {
    data: AVec<u8, RuntimeAlign>,
    alignment: usize,
}

impl AlignedBuffer {
    /// Allocates `size` zeroed bytes aligned to `alignment`.
    ///
    /// `alignment` must be a power of two and `size` non-zero.
    pub fn zeroed(size: usize, alignment: usize) -> Result<Self, PoolError> {
        if size == 0 || !alignment.is_power_of_two() {
            return Err(PoolError::AllocationFailed { size, alignment });
        }

        let mut data = AVec::<u8, RuntimeAlign>::with_capacity(alignment, size);
        data.resize(size, 0);

        Ok(Self { data, alignment })
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; zero sized buffers cannot be created.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Base alignment the buffer was allocated with.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Address of the first byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    /// Buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable buffer contents.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len())
            .field("alignment", &self.alignment)
            .finish()
    }
}

/// A pool buffer together with the plane layout it was sized for.
#[derive(Debug)]
pub struct PictureBuffer {
    buffer: AlignedBuffer,
    layout: FrameLayout,
}

impl PictureBuffer {
    /// Plane layout of the buffer.
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Bytes of one plane, padding included.
    pub fn plane(&self, plane: Plane) -> &[u8] {
        &self.buffer.as_slice()[self.layout.plane(plane).range()]
    }

    /// Mutable bytes of one plane, padding included.
    pub fn plane_mut(&mut self, plane: Plane) -> &mut [u8] {
        let range = self.layout.plane(plane).range();
        &mut self.buffer.as_mut_slice()[range]
    }

    /// The whole buffer.
    pub fn as_slice(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    pub(crate) fn into_inner(self) -> AlignedBuffer {
        self.buffer
    }
}

/// Snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers obtained from the allocator.
    pub allocations: u64,
    /// Acquisitions served from the free list.
    pub reuses: u64,
    /// Buffers returned to the allocator.
    pub freed: u64,
    /// Buffers currently in the free list.
    pub pooled: usize,
    /// Buffers acquired and not yet released.
    pub outstanding: usize,
}

/// Free list of equally sized, aligned picture buffers.
///
/// Single threaded: it is owned by one session and touched only from calls
/// on that session.
#[derive(Debug)]
pub struct PicturePool {
    layout: FrameLayout,
    buffer_size: usize,
    alignment: usize,
    max_pooled: usize,
    free: Vec<AlignedBuffer>,
    allocations: u64,
    reuses: u64,
    freed: u64,
    outstanding: usize,
}

impl PicturePool {
    /// Creates an empty pool for pictures of `layout`.
    ///
    /// Up to `max_pooled` released buffers are retained for reuse.
    pub fn new(layout: FrameLayout, alignment: usize, max_pooled: usize) -> Self {
        Self {
            buffer_size: layout.total_size(),
            layout,
            alignment,
            max_pooled,
            free: Vec::new(),
            allocations: 0,
            reuses: 0,
            freed: 0,
            outstanding: 0,
        }
    }

    /// Size of every buffer this pool retains.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Plane layout shared by every picture buffer.
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Returns a buffer of `size` bytes.
    ///
    /// A request for the pool's own size is served from the free list when
    /// possible, most recently released first. Anything else is a fresh,
    /// zero-filled allocation.
    pub fn acquire(&mut self, size: usize) -> Result<AlignedBuffer, PoolError> {
        if size == self.buffer_size {
            if let Some(buffer) = self.free.pop() {
                self.reuses += 1;
                self.outstanding += 1;
                trace!(
                    size,
                    pooled = self.free.len(),
                    "Reusing pooled picture buffer"
                );
                return Ok(buffer);
            }
        }

        let buffer = AlignedBuffer::zeroed(size, self.alignment)?;
        self.allocations += 1;
        self.outstanding += 1;
        debug!(
            size,
            alignment = self.alignment,
            allocations = self.allocations,
            "Allocated new picture buffer"
        );
        Ok(buffer)
    }

    /// Acquires a buffer sized for one picture, paired with its plane layout.
    pub fn acquire_picture(&mut self) -> Result<PictureBuffer, PoolError> {
        let buffer = self.acquire(self.buffer_size)?;
        Ok(PictureBuffer {
            buffer,
            layout: self.layout,
        })
    }

    /// Hands a buffer back to the pool.
    ///
    /// Buffers of a foreign size, or beyond the retention cap, are freed.
    pub fn release(&mut self, buffer: AlignedBuffer) {
        self.outstanding = self.outstanding.saturating_sub(1);

        if buffer.len() != self.buffer_size || self.free.len() >= self.max_pooled {
            trace!(size = buffer.len(), "Freeing released picture buffer");
            self.freed += 1;
            drop(buffer);
            return;
        }

        self.free.push(buffer);
    }

    /// Releases a buffer obtained from [`acquire_picture`](Self::acquire_picture).
    pub fn release_picture(&mut self, buffer: PictureBuffer) {
        self.release(buffer.into_inner());
    }

    /// Frees every pooled buffer. Calling it again is a no-op.
    pub fn drain_and_free_all(&mut self) {
        if self.free.is_empty() {
            return;
        }
        let count = self.free.len();
        self.freed += count as u64;
        self.free.clear();
        debug!(count, "Freed pooled picture buffers");
    }

    /// Current pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocations: self.allocations,
            reuses: self.reuses,
            freed: self.freed,
            pooled: self.free.len(),
            outstanding: self.outstanding,
        }
    }
}

impl Drop for PicturePool {
    fn drop(&mut self) {
        self.drain_and_free_all();
    }
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, PixelLayout};
    use proptest::prelude::*;

    fn layout() -> FrameLayout {
        let geometry = Geometry {
            width: 64,
            height: 48,
            pixel_layout: PixelLayout::I420,
            bit_depth: 8,
        };
        FrameLayout::new(&geometry, 128).unwrap()
    }

    fn pool(max_pooled: usize) -> PicturePool {
        PicturePool::new(layout(), 64, max_pooled)
    }

    #[test]
    fn test_aligned_buffer_is_zeroed_and_aligned() {
        let buffer = AlignedBuffer::zeroed(4096, 64).unwrap();
        assert_eq!(buffer.len(), 4096);
        assert_eq!(buffer.as_ptr() as usize % 64, 0);
        assert!(buffer.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_aligned_buffer_honors_large_alignment() {
        let mut buffer = AlignedBuffer::zeroed(100, 4096).unwrap();
        assert_eq!(buffer.alignment(), 4096);
        assert_eq!(buffer.as_ptr() as usize % 4096, 0);

        buffer.as_mut_slice()[99] = 7;
        assert_eq!(buffer.as_slice()[99], 7);
        assert_eq!(buffer.len(), 100);
    }

    #[test]
    fn test_aligned_buffer_rejects_bad_alignment() {
        assert_eq!(
            AlignedBuffer::zeroed(64, 48).unwrap_err(),
            PoolError::AllocationFailed {
                size: 64,
                alignment: 48
            }
        );
    }

    #[test]
    fn test_aligned_buffer_rejects_zero_size() {
        assert_eq!(
            AlignedBuffer::zeroed(0, 64).unwrap_err(),
            PoolError::AllocationFailed {
                size: 0,
                alignment: 64
            }
        );
    }

    #[test]
    fn test_acquire_allocates_when_empty() {
        let mut pool = pool(4);
        let buffer = pool.acquire(pool.buffer_size()).unwrap();
        assert_eq!(buffer.len(), pool.buffer_size());

        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 0);
        assert_eq!(stats.outstanding, 1);
    }

    #[test]
    fn test_release_then_acquire_reuses_same_buffer() {
        let mut pool = pool(4);
        let mut buffer = pool.acquire_picture().unwrap();
        buffer.plane_mut(Plane::Y)[0] = 0xAB;
        let ptr = buffer.as_slice().as_ptr();
        pool.release_picture(buffer);

        let again = pool.acquire_picture().unwrap();
        assert_eq!(again.as_slice().as_ptr(), ptr);
        assert_eq!(again.plane(Plane::Y)[0], 0xAB);

        let stats = pool.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.reuses, 1);
        assert_eq!(stats.pooled, 0);
    }

    #[test]
    fn test_foreign_size_is_not_pooled() {
        let mut pool = pool(4);
        let buffer = pool.acquire(100).unwrap();
        pool.release(buffer);

        let stats = pool.stats();
        assert_eq!(stats.pooled, 0);
        assert_eq!(stats.freed, 1);
    }

    #[test]
    fn test_retention_cap() {
        let mut pool = pool(2);
        let buffers: Vec<_> = (0..3).map(|_| pool.acquire_picture().unwrap()).collect();
        for buffer in buffers {
            pool.release_picture(buffer);
        }

        let stats = pool.stats();
        assert_eq!(stats.pooled, 2);
        assert_eq!(stats.freed, 1);
        assert_eq!(stats.outstanding, 0);
    }

    #[test]
    fn test_drain_is_idempotent() {
        let mut pool = pool(4);
        let a = pool.acquire_picture().unwrap();
        let b = pool.acquire_picture().unwrap();
        pool.release_picture(a);
        pool.release_picture(b);

        pool.drain_and_free_all();
        assert_eq!(pool.stats().freed, 2);
        assert_eq!(pool.stats().pooled, 0);

        pool.drain_and_free_all();
        assert_eq!(pool.stats().freed, 2);
    }

    #[test]
    fn test_picture_planes_follow_layout() {
        let mut pool = pool(4);
        let buffer = pool.acquire_picture().unwrap();
        let layout = *buffer.layout();

        assert_eq!(buffer.plane(Plane::Y).len(), layout.y.length);
        assert_eq!(buffer.plane(Plane::U).len(), layout.u.length);
        assert_eq!(buffer.plane(Plane::V).len(), layout.v.length);
        assert_eq!(buffer.as_slice().len(), layout.total_size());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every acquisition is either an allocation or a reuse, and every
        /// buffer is accounted for as outstanding, pooled or freed.
        #[test]
        fn prop_pool_accounting(
            ops in prop::collection::vec(prop::bool::ANY, 1..64),
            max_pooled in 0usize..6,
        ) {
            let mut pool = pool(max_pooled);
            let mut held = Vec::new();
            let mut acquires = 0u64;

            for acquire in ops {
                if acquire || held.is_empty() {
                    held.push(pool.acquire_picture().unwrap());
                    acquires += 1;
                } else if let Some(buffer) = held.pop() {
                    pool.release_picture(buffer);
                }

                let stats = pool.stats();
                prop_assert_eq!(stats.allocations + stats.reuses, acquires);
                prop_assert_eq!(stats.outstanding, held.len());
                prop_assert!(stats.pooled <= max_pooled);
                prop_assert_eq!(
                    stats.allocations,
                    stats.freed + stats.pooled as u64 + stats.outstanding as u64
                );
            }
        }
    }
}
