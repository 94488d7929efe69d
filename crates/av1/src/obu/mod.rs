use std::io;

use bytes_util::{BitReader, BitWriter};
use utils::read_leb128;

use crate::error::{Av1Error, Result};

pub mod seq;
pub mod utils;

/// OBU Header
/// AV1-Spec-2 - 5.3.2
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct ObuHeader {
    /// `obu_type`
    ///
    /// 4 bits
    pub obu_type: ObuType,
    /// `obu_size` if `obu_has_size_field` is 1
    ///
    /// leb128()
    pub size: Option<u64>,
    /// `obu_extension_header()` if `obu_extension_flag` is 1
    pub extension_header: Option<ObuExtensionHeader>,
}

/// OBU Extension Header
/// AV1-Spec-2 - 5.3.3
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct ObuExtensionHeader {
    /// `temporal_id`
    pub temporal_id: u8,
    /// `spatial_id`
    pub spatial_id: u8,
}

impl ObuHeader {
    /// Parses an OBU header, including the `obu_size` field when present.
    ///
    /// On success the reader is positioned at the first payload byte.
    pub fn parse(reader: &mut impl io::Read) -> Result<Self> {
        let mut bit_reader = BitReader::new(reader);
        if bit_reader.read_bit()? {
            return Err(Av1Error::InvalidObu("obu_forbidden_bit is not 0".into()));
        }

        let obu_type = ObuType::from(bit_reader.read_bits(4)? as u8);
        let extension_flag = bit_reader.read_bit()?;
        let has_size_field = bit_reader.read_bit()?;
        bit_reader.read_bit()?; // obu_reserved_1bit

        let extension_header = if extension_flag {
            let temporal_id = bit_reader.read_bits(3)? as u8;
            let spatial_id = bit_reader.read_bits(2)? as u8;
            bit_reader.read_bits(3)?; // extension_header_reserved_3bits
            Some(ObuExtensionHeader {
                temporal_id,
                spatial_id,
            })
        } else {
            None
        };

        let size = if has_size_field {
            Some(read_leb128(&mut bit_reader)?)
        } else {
            None
        };

        Ok(ObuHeader {
            obu_type,
            size,
            extension_header,
        })
    }

    /// Writes this OBU header to the given writer.
    ///
    /// If `self.size` is `Some`, writes with `obu_has_size_field=1` and
    /// encodes the size as LEB128. If `None`, writes with `obu_has_size_field=0`.
    ///
    /// Returns the number of bytes written.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut bit_writer = BitWriter::new(writer);

        bit_writer.write_bit(false)?; // obu_forbidden_bit
        bit_writer.write_bits(u8::from(self.obu_type) as u64, 4)?;
        bit_writer.write_bit(self.extension_header.is_some())?;
        bit_writer.write_bit(self.size.is_some())?;
        bit_writer.write_bit(false)?; // obu_reserved_1bit

        if let Some(ext) = &self.extension_header {
            bit_writer.write_bits(ext.temporal_id as u64, 3)?;
            bit_writer.write_bits(ext.spatial_id as u64, 2)?;
            bit_writer.write_bits(0, 3)?;
        }

        let writer = bit_writer.finish()?;
        let mut written = self.fixed_size();
        if let Some(size) = self.size {
            written += utils::write_leb128(writer, size)?;
        }

        Ok(written)
    }

    /// Returns the encoded size of this OBU header in bytes.
    pub fn header_size(&self) -> usize {
        self.fixed_size() + self.size.map_or(0, utils::leb128_size)
    }

    fn fixed_size(&self) -> usize {
        if self.extension_header.is_some() { 2 } else { 1 }
    }
}

/// OBU Type
/// AV1-Spec-2 - 6.2.2
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum ObuType {
    /// `OBU_SEQUENCE_HEADER`
    SequenceHeader,
    /// `OBU_TEMPORAL_DELIMITER`
    TemporalDelimiter,
    /// `OBU_FRAME_HEADER`
    FrameHeader,
    /// `OBU_TILE_GROUP`
    TileGroup,
    /// `OBU_METADATA`
    Metadata,
    /// `OBU_FRAME`
    Frame,
    /// `OBU_REDUNDANT_FRAME_HEADER`
    RedundantFrameHeader,
    /// `OBU_TILE_LIST`
    TileList,
    /// `OBU_PADDING`
    Padding,
    /// Reserved
    Reserved(u8),
}

impl From<u8> for ObuType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::SequenceHeader,
            2 => Self::TemporalDelimiter,
            3 => Self::FrameHeader,
            4 => Self::TileGroup,
            5 => Self::Metadata,
            6 => Self::Frame,
            7 => Self::RedundantFrameHeader,
            8 => Self::TileList,
            15 => Self::Padding,
            _ => Self::Reserved(value),
        }
    }
}

impl From<ObuType> for u8 {
    fn from(value: ObuType) -> Self {
        match value {
            ObuType::SequenceHeader => 1,
            ObuType::TemporalDelimiter => 2,
            ObuType::FrameHeader => 3,
            ObuType::TileGroup => 4,
            ObuType::Metadata => 5,
            ObuType::Frame => 6,
            ObuType::RedundantFrameHeader => 7,
            ObuType::TileList => 8,
            ObuType::Padding => 15,
            ObuType::Reserved(value) => value,
        }
    }
}
