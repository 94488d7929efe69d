//! Low-overhead OBU bitstream scanning and writing.
//!
//! A raw AV1 elementary stream (AV1 spec section 5.2) is a plain
//! concatenation of OBUs with no outer framing. Each unit is located by
//! reading its header and `obu_size`. A unit without `obu_has_size_field`
//! is taken to extend to the end of the buffer, which is how such a unit
//! must be interpreted when it is the last one in a buffer.

use std::io;

use crate::error::{Av1Error, Result};
use crate::obu::{ObuExtensionHeader, ObuHeader, ObuType};

/// Location of a single OBU inside a buffer, relative to the offset it was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObuSpan {
    /// Parsed OBU header.
    pub header: ObuHeader,
    /// Bytes taken by the header, extension and `obu_size` field.
    pub header_size: usize,
    /// Bytes of payload following the header.
    pub payload_size: usize,
}

impl ObuSpan {
    /// The unit's `obu_type`.
    pub fn obu_type(&self) -> ObuType {
        self.header.obu_type
    }

    /// Header plus payload.
    pub fn total_size(&self) -> usize {
        self.header_size + self.payload_size
    }
}

/// Identifies the unit starting at `offset` in `data`.
///
/// This is a pure function: advancing past the unit is up to the caller,
/// who adds [`ObuSpan::total_size`] to `offset` before the next call.
///
/// Returns `Ok(None)` when `offset` is exactly at the end of `data`, and an
/// error when `offset` is past the end or the unit header is inconsistent
/// with the bytes available.
pub fn next_unit(data: &[u8], offset: usize) -> Result<Option<ObuSpan>> {
    let remaining = match data.len().checked_sub(offset) {
        Some(0) => return Ok(None),
        Some(remaining) => remaining,
        None => {
            return Err(Av1Error::InvalidObu(format!(
                "offset {offset} is past the end of a {} byte buffer",
                data.len()
            )));
        }
    };

    let mut cursor = io::Cursor::new(&data[offset..]);
    let header = ObuHeader::parse(&mut cursor)?;
    let header_size = cursor.position() as usize;
    let available = remaining - header_size;

    let payload_size = match header.size {
        Some(size) => {
            let size = usize::try_from(size).map_err(|_| Av1Error::Leb128Overflow)?;
            if size > available {
                return Err(Av1Error::UnexpectedEof {
                    expected: size,
                    actual: available,
                });
            }
            size
        }
        None => available,
    };

    Ok(Some(ObuSpan {
        header,
        header_size,
        payload_size,
    }))
}

/// A single OBU borrowed from the scanned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obu<'a> {
    /// Where the unit starts in the scanned buffer.
    pub offset: usize,
    /// Header and size information.
    pub span: ObuSpan,
    /// The whole unit, header included.
    pub bytes: &'a [u8],
}

impl<'a> Obu<'a> {
    /// The payload, without the header or size field.
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[self.span.header_size..]
    }
}

/// Iterator over OBUs in a low-overhead bitstream.
///
/// Yields at most one error, after which the iterator is exhausted since
/// no further unit boundary can be trusted.
pub struct ObuIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ObuIterator<'a> {
    /// Creates a new iterator over OBUs in a low-overhead bitstream.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Offset of the next unit to be yielded.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for ObuIterator<'a> {
    type Item = Result<Obu<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match next_unit(self.data, self.offset) {
            Ok(Some(span)) => {
                let start = self.offset;
                self.offset += span.total_size();
                Some(Ok(Obu {
                    offset: start,
                    span,
                    bytes: &self.data[start..self.offset],
                }))
            }
            Ok(None) => None,
            Err(e) => {
                self.offset = self.data.len();
                Some(Err(e))
            }
        }
    }
}

/// Writes a single OBU in low-overhead bitstream format.
///
/// Constructs the OBU header with `obu_has_size_field=1` and writes the
/// header followed by the payload data.
///
/// Returns the total number of bytes written (header + payload).
pub fn write_obu<W: io::Write>(
    writer: &mut W,
    obu_type: ObuType,
    extension_header: Option<ObuExtensionHeader>,
    payload: &[u8],
) -> Result<usize> {
    let header = ObuHeader {
        obu_type,
        size: Some(payload.len() as u64),
        extension_header,
    };

    let header_bytes = header.mux(writer)?;
    writer.write_all(payload)?;

    Ok(header_bytes + payload.len())
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use super::*;

    fn push(data: &mut Vec<u8>, obu_type: ObuType, payload: &[u8]) {
        write_obu(data, obu_type, None, payload).unwrap();
    }

    #[test]
    fn test_next_unit_walks_stream() {
        let mut data = Vec::new();
        push(&mut data, ObuType::TemporalDelimiter, &[]);
        push(&mut data, ObuType::SequenceHeader, &[0xaa; 12]);
        push(&mut data, ObuType::Frame, &[0xbb; 200]);

        let first = next_unit(&data, 0).unwrap().unwrap();
        insta::assert_debug_snapshot!(first, @r"
        ObuSpan {
            header: ObuHeader {
                obu_type: TemporalDelimiter,
                size: Some(
                    0,
                ),
                extension_header: None,
            },
            header_size: 2,
            payload_size: 0,
        }
        ");

        let second = next_unit(&data, 2).unwrap().unwrap();
        assert_eq!(second.obu_type(), ObuType::SequenceHeader);
        assert_eq!(second.total_size(), 14);

        let third = next_unit(&data, 16).unwrap().unwrap();
        assert_eq!(third.obu_type(), ObuType::Frame);
        assert_eq!(third.header_size, 3);
        assert_eq!(third.payload_size, 200);

        assert_eq!(16 + third.total_size(), data.len());
        assert!(next_unit(&data, data.len()).unwrap().is_none());
    }

    #[test]
    fn test_next_unit_is_pure() {
        let mut data = Vec::new();
        push(&mut data, ObuType::Frame, b"abc");
        assert_eq!(next_unit(&data, 0).unwrap(), next_unit(&data, 0).unwrap());
    }

    #[test]
    fn test_offset_past_end() {
        let mut data = Vec::new();
        push(&mut data, ObuType::Padding, &[0; 4]);
        let err = next_unit(&data, data.len() + 1).unwrap_err();
        assert!(matches!(err, Av1Error::InvalidObu(_)));
    }

    #[test]
    fn test_payload_exceeds_buffer() {
        let mut data = Vec::new();
        push(&mut data, ObuType::Frame, &[0; 10]);
        data.truncate(8);
        let err = next_unit(&data, 0).unwrap_err();
        assert!(matches!(
            err,
            Av1Error::UnexpectedEof {
                expected: 10,
                actual: 6,
            }
        ));
    }

    #[test]
    fn test_unit_without_size_field_runs_to_end() {
        // OBU_FRAME, obu_has_size_field = 0
        let data = [0x30, 1, 2, 3, 4];
        let span = next_unit(&data, 0).unwrap().unwrap();
        assert_eq!(span.header_size, 1);
        assert_eq!(span.payload_size, 4);
    }

    #[test]
    fn test_iterator_yields_units() {
        let mut data = Vec::new();
        push(&mut data, ObuType::TemporalDelimiter, &[]);
        push(&mut data, ObuType::Frame, b"payload");

        let units: Vec<_> = ObuIterator::new(&data).collect::<Result<_>>().unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].offset, 0);
        assert_eq!(units[1].offset, 2);
        assert_eq!(units[1].span.obu_type(), ObuType::Frame);
        assert_eq!(units[1].payload(), b"payload");
        assert_eq!(units[1].bytes.len(), 9);
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut data = Vec::new();
        push(&mut data, ObuType::TemporalDelimiter, &[]);
        data.push(0x80); // forbidden bit set

        let mut iter = ObuIterator::new(&data);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
        assert_eq!(iter.offset(), data.len());
    }

    #[test]
    fn test_write_obu_with_extension() {
        let mut buf = Vec::new();
        let ext = ObuExtensionHeader {
            temporal_id: 1,
            spatial_id: 0,
        };
        let written = write_obu(&mut buf, ObuType::Metadata, Some(ext), &[0; 130]).unwrap();
        assert_eq!(written, buf.len());
        assert_eq!(ObuHeader::parse(&mut buf.as_slice()).unwrap().extension_header, Some(ext));
        assert_eq!(written, 2 + 2 + 130);
    }
}
