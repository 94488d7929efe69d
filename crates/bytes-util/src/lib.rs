//! Bit-level readers and writers shared by the bitstream crates.
//!
//! Both types are MSB-first, which is the bit order used by the AV1
//! syntax tables.
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

mod bit_read;
mod bit_write;

pub use bit_read::BitReader;
pub use bit_write::BitWriter;
