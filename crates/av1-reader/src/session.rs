//! Reading sessions over an AV1 elementary stream.

use std::path::Path;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::config::{ReaderConfig, ShortReadPolicy};
use crate::cursor::ObuCursor;
use crate::drive::decode_next;
use crate::engine::DecodeEngine;
use crate::error::{DecodeError, EngineError, OpenError};
use crate::geometry::{FrameLayout, Geometry};
use crate::picture::{Picture, PictureView};
use crate::pool::{PicturePool, PoolStats};
use crate::probe::{StreamInfo, probe};

/// One open stream: its bytes, the decoding engine and the picture pool.
///
/// A session is driven from one thread at a time; every operation takes it
/// by reference. Dropping it closes it.
pub struct Session<E: DecodeEngine> {
    cursor: ObuCursor,
    engine: Option<E>,
    pool: PicturePool,
    info: StreamInfo,
    config: ReaderConfig,
    current: Option<Picture>,
    eof: bool,
}

impl<E: DecodeEngine> Session<E> {
    /// Opens a stream held in memory.
    ///
    /// The stream is probed for its geometry before `make_engine` is called,
    /// so a stream without a usable sequence header never creates an engine.
    pub fn open_with<F>(
        data: impl Into<Bytes>,
        config: ReaderConfig,
        make_engine: F,
    ) -> Result<Self, OpenError>
    where
        F: FnOnce() -> Result<E, EngineError>,
    {
        config.validate()?;

        let mut cursor = ObuCursor::new(data.into());
        let info = probe(&mut cursor)?;

        let layout = FrameLayout::new(&info.geometry, config.plane_alignment)
            .map_err(|_| OpenError::PoolSizeOverflow)?;
        let pool = PicturePool::new(layout, config.base_alignment, config.max_pooled_buffers);

        let engine = make_engine().map_err(OpenError::EngineInitFailed)?;

        info!(
            bytes = cursor.len(),
            width = info.geometry.width,
            height = info.geometry.height,
            layout = ?info.geometry.pixel_layout,
            bit_depth = info.geometry.bit_depth,
            buffer_size = layout.total_size(),
            "Opened AV1 stream"
        );

        Ok(Self {
            cursor,
            engine: Some(engine),
            pool,
            info,
            config,
            current: None,
            eof: false,
        })
    }

    /// Reads the file at `path` into memory and opens it.
    pub fn open_file_with<P, F>(
        path: P,
        config: ReaderConfig,
        make_engine: F,
    ) -> Result<Self, OpenError>
    where
        P: AsRef<Path>,
        F: FnOnce() -> Result<E, EngineError>,
    {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        debug!(path = %path.display(), bytes = data.len(), "Loaded bitstream");
        Self::open_with(data, config, make_engine)
    }

    /// Stream geometry from the first sequence header.
    pub fn geometry(&self) -> Geometry {
        self.info.geometry
    }

    /// Frame rate announced by the sequence header's timing info.
    ///
    /// `None` when the stream carries no timing info; most raw streams don't.
    pub fn guess_frame_rate(&self) -> Option<f64> {
        self.info.frame_rate
    }

    /// Plane layout shared by every picture of the session.
    pub fn layout(&self) -> &FrameLayout {
        self.pool.layout()
    }

    /// Whether the input has been fully consumed.
    ///
    /// The engine may still hold pictures; [`read_frames`](Self::read_frames)
    /// drains them.
    pub fn is_end_of_stream(&self) -> bool {
        self.eof
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.engine.is_none()
    }

    /// Counters of the session's picture pool.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// The picture returned by the last successful read, if any.
    pub fn current_picture(&self) -> Option<PictureView<'_>> {
        self.current.as_ref().map(Picture::view)
    }

    /// Decodes `count` pictures and returns the last one.
    ///
    /// Pictures decoded along the way are returned to the pool. A count of
    /// zero decodes nothing and returns the current picture. When the stream
    /// ends early, the outcome follows [`ReaderConfig::short_read`].
    ///
    /// The returned view borrows the session and stays valid until the next
    /// mutating call.
    pub fn read_frames(
        &mut self,
        count: usize,
    ) -> Result<Option<PictureView<'_>>, DecodeError> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(DecodeError::Closed);
        };

        let mut decoded = 0;
        while decoded < count {
            let Some(picture) = decode_next(
                engine,
                &mut self.cursor,
                &mut self.pool,
                &mut self.eof,
                self.config.stall_retries,
            )?
            else {
                break;
            };
            if let Some(previous) = self.current.replace(picture) {
                self.pool.release(previous.into_buffer());
            }
            decoded += 1;
        }

        if decoded < count {
            debug!(
                requested = count,
                decoded,
                "Stream ended before request was satisfied"
            );
            if self.config.short_read == ShortReadPolicy::Fail {
                return Err(DecodeError::ShortRead {
                    requested: count,
                    decoded,
                });
            }
        }

        Ok(self.current.as_ref().map(Picture::view))
    }

    /// Restarts decoding from the first unit of the stream.
    ///
    /// The engine's queues are flushed and the current picture goes back to
    /// the pool, so the session behaves as if freshly opened.
    pub fn reset(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            warn!("Reset called on a closed session");
            return;
        };

        engine.flush();
        self.cursor.rewind();
        self.eof = false;
        if let Some(picture) = self.current.take() {
            self.pool.release(picture.into_buffer());
        }
        debug!("Session reset to start of stream");
    }

    /// Tears down the engine and frees every buffer. Idempotent.
    pub fn close(&mut self) {
        let Some(mut engine) = self.engine.take() else {
            return;
        };

        engine.teardown();
        drop(engine);

        if let Some(picture) = self.current.take() {
            self.pool.release(picture.into_buffer());
        }
        self.pool.drain_and_free_all();
        self.cursor.release();
        self.eof = true;

        let stats = self.pool.stats();
        info!(
            allocations = stats.allocations,
            reuses = stats.reuses,
            freed = stats.freed,
            "Closed AV1 stream"
        );
    }
}

impl<E: DecodeEngine> Drop for Session<E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<E: DecodeEngine> std::fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("geometry", &self.info.geometry)
            .field("offset", &self.cursor.offset())
            .field("eof", &self.eof)
            .field("closed", &self.is_closed())
            .field("pool", &self.pool.stats())
            .finish()
    }
}

#[cfg(feature = "dav1d")]
mod dav1d_session {
    use super::*;
    use crate::engine::{Dav1dEngine, Dav1dSettings};

    impl Session<Dav1dEngine> {
        /// Opens the file at `path` with libdav1d and default settings.
        pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
            Self::open_file_with(path, ReaderConfig::default(), Dav1dEngine::new)
        }

        /// Opens an in-memory stream with libdav1d and default settings.
        pub fn open_from_memory(data: impl Into<Bytes>) -> Result<Self, OpenError> {
            Self::open_with(data, ReaderConfig::default(), Dav1dEngine::new)
        }

        /// Opens an in-memory stream with explicit reader and libdav1d settings.
        pub fn open_from_memory_with(
            data: impl Into<Bytes>,
            config: ReaderConfig,
            settings: Dav1dSettings,
        ) -> Result<Self, OpenError> {
            Self::open_with(data, config, || Dav1dEngine::with_settings(&settings))
        }
    }
}
