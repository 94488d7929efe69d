//! [`DecodeEngine`] backed by libdav1d.

use bytes::Bytes;
use dav1d::{PlanarImageComponent, PixelLayout as Dav1dLayout};
use tracing::{debug, trace};

use super::{Attempt, DecodeEngine};
use crate::error::EngineError;
use crate::geometry::{Plane, PlaneLayout};
use crate::picture::Picture;
use crate::pool::{PictureBuffer, PicturePool};

/// Tuning knobs passed through to libdav1d.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dav1dSettings {
    /// Worker threads, 0 lets libdav1d pick.
    pub threads: u32,
    /// Maximum frame delay, 0 lets libdav1d pick.
    pub max_frame_delay: u32,
    /// Whether film grain is synthesized into output pictures.
    pub apply_grain: bool,
}

impl Default for Dav1dSettings {
    fn default() -> Self {
        Self {
            threads: 0,
            max_frame_delay: 0,
            apply_grain: true,
        }
    }
}

/// libdav1d decoder instance.
pub struct Dav1dEngine {
    decoder: Option<dav1d::Decoder>,
    // libdav1d kept part of the last unit; it must be resent before new input.
    pending: bool,
}

impl Dav1dEngine {
    /// Creates a decoder with default settings.
    pub fn new() -> Result<Self, EngineError> {
        Self::with_settings(&Dav1dSettings::default())
    }

    /// Creates a decoder with the given settings.
    pub fn with_settings(settings: &Dav1dSettings) -> Result<Self, EngineError> {
        let mut dav1d_settings = dav1d::Settings::new();
        dav1d_settings.set_n_threads(settings.threads);
        dav1d_settings.set_max_frame_delay(settings.max_frame_delay);
        dav1d_settings.set_apply_grain(settings.apply_grain);

        let decoder = dav1d::Decoder::with_settings(&dav1d_settings)
            .map_err(|e| EngineError::Init(format!("dav1d: {e:?}")))?;
        debug!(?settings, "Created dav1d decoder");

        Ok(Self {
            decoder: Some(decoder),
            pending: false,
        })
    }
}

impl DecodeEngine for Dav1dEngine {
    fn send(&mut self, unit: Bytes) -> Result<Attempt<()>, EngineError> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(EngineError::TornDown);
        };

        if self.pending {
            match decoder.send_pending_data() {
                Ok(()) => self.pending = false,
                Err(dav1d::Error::Again) => return Ok(Attempt::WouldBlock),
                Err(e) => return Err(EngineError::fatal("send_pending_data", format!("{e:?}"))),
            }
        }

        match decoder.send_data(unit, None, None, None) {
            Ok(()) => Ok(Attempt::Ready(())),
            Err(dav1d::Error::Again) => {
                // The unit is now owned by libdav1d; the rest goes with the next send.
                trace!("dav1d holds unconsumed input");
                self.pending = true;
                Ok(Attempt::Ready(()))
            }
            Err(e) => Err(EngineError::fatal("send_data", format!("{e:?}"))),
        }
    }

    fn receive_picture(&mut self, pool: &mut PicturePool) -> Result<Attempt<Picture>, EngineError> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Err(EngineError::TornDown);
        };

        let picture = match decoder.get_picture() {
            Ok(picture) => picture,
            Err(dav1d::Error::Again) => {
                // Queued input can go in now that there is no picture to hold it back.
                if self.pending {
                    match decoder.send_pending_data() {
                        Ok(()) => self.pending = false,
                        Err(dav1d::Error::Again) => {}
                        Err(e) => {
                            return Err(EngineError::fatal(
                                "send_pending_data",
                                format!("{e:?}"),
                            ));
                        }
                    }
                }
                return Ok(Attempt::WouldBlock);
            }
            Err(e) => return Err(EngineError::fatal("get_picture", format!("{e:?}"))),
        };

        let mut buffer = pool.acquire_picture()?;
        copy_picture(&picture, &mut buffer)?;

        Ok(Attempt::Ready(Picture::new(buffer, picture.width(), picture.height())))
    }

    fn flush(&mut self) {
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.flush();
        }
        self.pending = false;
    }

    fn teardown(&mut self) {
        if self.decoder.take().is_some() {
            debug!("Closed dav1d decoder");
        }
        self.pending = false;
    }
}

fn copy_picture(
    picture: &dav1d::Picture,
    buffer: &mut PictureBuffer,
) -> Result<(), EngineError> {
    let layout = *buffer.layout();
    let bytes_per_sample = if picture.bit_depth() > 8 { 2 } else { 1 };
    if bytes_per_sample != layout.bytes_per_sample {
        return Err(EngineError::fatal(
            "get_picture",
            format!("picture bit depth {} does not match the stream", picture.bit_depth()),
        ));
    }

    let width = picture.width() as usize;
    let height = picture.height() as usize;
    copy_plane(
        picture,
        PlanarImageComponent::Y,
        buffer,
        Plane::Y,
        &layout.y,
        width * bytes_per_sample,
        height,
    )?;

    let (ss_x, ss_y) = match picture.pixel_layout() {
        Dav1dLayout::I400 => return Ok(()),
        Dav1dLayout::I420 => (1, 1),
        Dav1dLayout::I422 => (1, 0),
        Dav1dLayout::I444 => (0, 0),
    };
    let chroma_width = (width + ss_x) >> ss_x;
    let chroma_height = (height + ss_y) >> ss_y;
    let row_bytes = chroma_width * bytes_per_sample;
    copy_plane(
        picture,
        PlanarImageComponent::U,
        buffer,
        Plane::U,
        &layout.u,
        row_bytes,
        chroma_height,
    )?;
    copy_plane(
        picture,
        PlanarImageComponent::V,
        buffer,
        Plane::V,
        &layout.v,
        row_bytes,
        chroma_height,
    )
}

fn copy_plane(
    picture: &dav1d::Picture,
    component: PlanarImageComponent,
    buffer: &mut PictureBuffer,
    plane: Plane,
    layout: &PlaneLayout,
    row_bytes: usize,
    height: usize,
) -> Result<(), EngineError> {
    if row_bytes > layout.stride || height > layout.rows {
        return Err(EngineError::fatal(
            "get_picture",
            format!("{plane:?} plane of {row_bytes}x{height} bytes exceeds the stream geometry"),
        ));
    }

    let src_plane = picture.plane(component);
    let src: &[u8] = src_plane.as_ref();
    let src_stride = picture.stride(component) as usize;
    let dst = buffer.plane_mut(plane);

    for (row, dst_row) in dst.chunks_exact_mut(layout.stride).take(height).enumerate() {
        let start = row * src_stride;
        let Some(src_row) = src.get(start..start + row_bytes) else {
            return Err(EngineError::fatal("get_picture", format!("{plane:?} plane is truncated")));
        };
        dst_row[..row_bytes].copy_from_slice(src_row);
    }

    Ok(())
}
