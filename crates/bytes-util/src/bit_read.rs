use std::io;

use byteorder::ReadBytesExt;

/// A reader that pulls individual bits out of a byte oriented [`io::Read`].
#[derive(Debug)]
pub struct BitReader<T> {
    reader: T,
    current: u8,
    /// Number of bits of `current` already consumed, `0..=8`.
    /// `8` means a fresh byte must be fetched before the next read.
    consumed: u8,
}

impl<T: io::Read> BitReader<T> {
    /// Wraps `reader`. Reading starts at the next byte boundary.
    pub fn new(reader: T) -> Self {
        Self {
            reader,
            current: 0,
            consumed: 8,
        }
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.consumed == 8 {
            self.current = self.reader.read_u8()?;
            self.consumed = 0;
        }

        let bit = (self.current >> (7 - self.consumed)) & 1;
        self.consumed += 1;
        Ok(bit == 1)
    }

    /// Reads `count` bits (at most 64) as an unsigned big-endian value.
    pub fn read_bits(&mut self, count: u8) -> io::Result<u64> {
        if count > 64 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot read more than 64 bits at once",
            ));
        }

        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Returns `true` when the reader sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.consumed == 8 || self.consumed == 0
    }

    /// Discards the remaining bits of the current byte, if any.
    pub fn align(&mut self) {
        self.consumed = 8;
    }

    /// Returns the wrapped reader. Unread bits of a partially consumed byte are lost.
    pub fn into_inner(self) -> T {
        self.reader
    }
}
