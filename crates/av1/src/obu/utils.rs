use std::io;

use bytes_util::{BitReader, BitWriter};

use crate::error::{Av1Error, Result};

/// Read a little-endian variable-length integer.
/// AV1-Spec-2 - 4.10.5
///
/// Conforming bitstreams produce values `<= (1 << 32) - 1`; anything larger
/// is reported as [`Av1Error::Leb128Overflow`].
pub fn read_leb128<T: io::Read>(reader: &mut BitReader<T>) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..8 {
        let byte = reader.read_bits(8)?;
        value |= (byte & 0x7f) << (i * 7);
        if byte & 0x80 == 0 {
            break;
        }
    }

    if value > u64::from(u32::MAX) {
        return Err(Av1Error::Leb128Overflow);
    }
    Ok(value)
}

/// Write a little-endian variable-length integer.
/// AV1-Spec-2 - 4.10.5
///
/// Returns the number of bytes written.
pub fn write_leb128<W: io::Write>(writer: &mut W, mut value: u64) -> io::Result<usize> {
    let mut written = 0;
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        writer.write_all(&[byte])?;
        written += 1;
        if value == 0 {
            return Ok(written);
        }
    }
}

/// Returns the number of bytes needed to encode `value` as LEB128.
pub fn leb128_size(mut value: u64) -> usize {
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

/// Read a variable-length unsigned integer.
/// AV1-Spec-2 - 4.10.3
pub fn read_uvlc<T: io::Read>(reader: &mut BitReader<T>) -> io::Result<u64> {
    let mut leading_zeros = 0u8;
    while !reader.read_bit()? {
        leading_zeros += 1;
        if leading_zeros == 32 {
            break;
        }
    }

    if leading_zeros >= 32 {
        return Ok(u64::from(u32::MAX));
    }

    let value = reader.read_bits(leading_zeros)?;
    Ok(value + (1 << leading_zeros) - 1)
}

/// Write a variable-length unsigned integer, the inverse of [`read_uvlc`].
pub fn write_uvlc<W: io::Write>(writer: &mut BitWriter<W>, value: u64) -> io::Result<()> {
    let coded = value + 1;
    let bits = (64 - coded.leading_zeros()) as u8;
    writer.write_bits(0, bits - 1)?;
    writer.write_bits(coded, bits)
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    fn leb128(bytes: &[u8]) -> Result<u64> {
        let mut reader = BitReader::new(io::Cursor::new(bytes));
        read_leb128(&mut reader)
    }

    #[test]
    fn test_read_leb128() {
        assert_eq!(leb128(&[0x00]).unwrap(), 0);
        assert_eq!(leb128(&[0x7f]).unwrap(), 127);
        assert_eq!(leb128(&[0x80, 0x01]).unwrap(), 128);
        assert_eq!(leb128(&[0xff, 0xff, 0xff, 0xff, 0x0f]).unwrap(), u64::from(u32::MAX));
    }

    #[test]
    fn test_read_leb128_overflow() {
        let err = leb128(&[0x80, 0x80, 0x80, 0x80, 0x10]).unwrap_err();
        assert!(matches!(err, Av1Error::Leb128Overflow));
    }

    #[test]
    fn test_write_leb128() {
        let cases: [(u64, &[u8]); 4] = [
            (0, &[0x00]),
            (127, &[0x7f]),
            (300, &[0xac, 0x02]),
            (16384, &[0x80, 0x80, 0x01]),
        ];

        for (value, expected) in cases {
            let mut buf = Vec::new();
            assert_eq!(write_leb128(&mut buf, value).unwrap(), expected.len());
            assert_eq!(buf, expected);
            assert_eq!(leb128_size(value), expected.len());
        }
    }

    #[test]
    fn test_read_uvlc() {
        let mut reader = BitReader::new(io::Cursor::new([0x01, 0xff]));
        assert_eq!(read_uvlc(&mut reader).unwrap(), 0xfe);

        let mut reader = BitReader::new(io::Cursor::new([0x00, 0x00, 0x00, 0x00, 0x01]));
        assert_eq!(read_uvlc(&mut reader).unwrap(), u64::from(u32::MAX));
    }

    #[test]
    fn test_write_uvlc() {
        for value in [0, 1, 2, 29, 0xfe] {
            let mut buf = Vec::new();
            let mut writer = BitWriter::new(&mut buf);
            write_uvlc(&mut writer, value).unwrap();
            writer.finish().unwrap();

            let mut reader = BitReader::new(io::Cursor::new(buf));
            assert_eq!(read_uvlc(&mut reader).unwrap(), value);
        }
    }
}
