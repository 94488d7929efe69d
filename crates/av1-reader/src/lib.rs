//! Frame-at-a-time reading of raw AV1 elementary streams.
//!
//! A [`Session`] holds a whole stream of concatenated OBUs in memory, finds
//! its first sequence header to learn the picture geometry, and then feeds
//! units one by one into a [`DecodeEngine`], handing back decoded pictures
//! stored in reusable, aligned buffers.
//!
//! ```no_run
//! # #[cfg(feature = "dav1d")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use av1_reader::{Dav1dEngine, DecodeError, ReaderConfig, Session, ShortReadPolicy};
//!
//! let config = ReaderConfig::default().with_short_read(ShortReadPolicy::Fail);
//! let mut session = Session::open_file_with("clip.obu", config, Dav1dEngine::new)?;
//! let geometry = session.geometry();
//! println!("{}x{} {:?}", geometry.width, geometry.height, geometry.pixel_layout);
//!
//! // End of input comes before the engine is drained, so read until a read
//! // decodes nothing.
//! loop {
//!     match session.read_frames(1) {
//!         Ok(Some(picture)) => println!("luma stride {}", picture.y_stride),
//!         Ok(None) | Err(DecodeError::ShortRead { decoded: 0, .. }) => break,
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "dav1d"))]
//! # fn main() {}
//! ```
//!
//! Decoding itself is delegated: enable the `dav1d` feature for the libdav1d
//! backend, or implement [`DecodeEngine`] for another one.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license. You can choose between one of
//! them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod cursor;
mod drive;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod picture;
pub mod pool;
pub mod probe;
mod session;

pub use config::{ReaderConfig, ShortReadPolicy};
pub use cursor::{ObuCursor, Unit};
#[cfg(feature = "dav1d")]
pub use engine::{Dav1dEngine, Dav1dSettings};
pub use engine::{Attempt, DecodeEngine};
pub use error::{DecodeError, EngineError, OpenError, PoolError};
pub use geometry::{FrameLayout, Geometry, PixelLayout, Plane, PlaneLayout};
pub use picture::{Picture, PictureView};
pub use pool::{AlignedBuffer, PictureBuffer, PicturePool, PoolStats};
pub use probe::StreamInfo;
pub use session::Session;
