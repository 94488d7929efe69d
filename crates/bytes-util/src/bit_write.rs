use std::io;

/// A writer that packs individual bits into bytes, MSB first.
#[derive(Debug)]
pub struct BitWriter<W> {
    writer: W,
    current: u8,
    filled: u8,
}

impl<W: io::Write> BitWriter<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            current: 0,
            filled: 0,
        }
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.current = (self.current << 1) | u8::from(bit);
        self.filled += 1;

        if self.filled == 8 {
            self.writer.write_all(&[self.current])?;
            self.current = 0;
            self.filled = 0;
        }
        Ok(())
    }

    /// Writes the low `count` bits of `value` (at most 64), most significant first.
    pub fn write_bits(&mut self, value: u64, count: u8) -> io::Result<()> {
        if count > 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot write more than 64 bits at once",
            ));
        }

        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1)?;
        }
        Ok(())
    }

    /// Returns `true` when no partial byte is pending.
    pub fn is_aligned(&self) -> bool {
        self.filled == 0
    }

    /// Pads the pending byte with zero bits and returns the wrapped writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.filled > 0 {
            let padded = self.current << (8 - self.filled);
            self.writer.write_all(&[padded])?;
        }
        Ok(self.writer)
    }
}

#[cfg(test)]
#[cfg_attr(all(coverage_nightly, test), coverage(off))]
mod tests {
    use super::*;
    use crate::BitReader;

    #[test]
    fn test_write_bits() {
        let mut buf = Vec::new();
        let mut writer = BitWriter::new(&mut buf);
        writer.write_bit(true).unwrap();
        writer.write_bits(0b0100110, 7).unwrap();
        assert!(writer.is_aligned());
        writer.write_bits(0xab, 8).unwrap();
        writer.finish().unwrap();
        assert_eq!(buf, [0b1010_0110, 0xab]);
    }

    #[test]
    fn test_finish_pads_with_zeros() {
        let mut buf = Vec::new();
        let mut writer = BitWriter::new(&mut buf);
        writer.write_bits(0b101, 3).unwrap();
        writer.finish().unwrap();
        assert_eq!(buf, [0b1010_0000]);
    }

    #[test]
    fn test_reader_sees_what_writer_wrote() {
        let mut buf = Vec::new();
        let mut writer = BitWriter::new(&mut buf);
        writer.write_bits(0x3ff, 10).unwrap();
        writer.write_bits(0x12345678, 32).unwrap();
        writer.finish().unwrap();

        let mut reader = BitReader::new(io::Cursor::new(buf));
        assert_eq!(reader.read_bits(10).unwrap(), 0x3ff);
        assert_eq!(reader.read_bits(32).unwrap(), 0x12345678);
    }
}
