//! A crate for locating and inspecting AV1 Open Bitstream Units.
//!
//! Supports:
//! - OBU (Open Bitstream Unit) header parsing and writing
//! - Scanning an undelimited low-overhead bitstream one unit at a time
//! - Sequence header OBU parsing and writing
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

pub mod error;
mod obu;
pub mod obu_stream;

pub use error::{Av1Error, Result};
pub use obu::utils::{leb128_size, write_leb128};
pub use obu::{ObuExtensionHeader, ObuHeader, ObuType, seq};
pub use obu_stream::{Obu, ObuIterator, ObuSpan, next_unit, write_obu};
