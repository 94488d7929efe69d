//! Position tracking over an in-memory OBU stream.

use av1::{ObuType, next_unit};
use bytes::Bytes;

/// One OBU located by the cursor, header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Type of the unit.
    pub obu_type: ObuType,
    /// Offset of the unit inside the stream.
    pub offset: usize,
    /// Header and payload bytes, sharing the stream's storage.
    pub data: Bytes,
    /// Bytes taken by the header, extension and size field.
    pub header_size: usize,
}

impl Unit {
    /// Payload bytes following the header.
    pub fn payload(&self) -> &[u8] {
        &self.data[self.header_size..]
    }
}

/// Walks an OBU stream one unit at a time.
///
/// [`peek`](Self::peek) locates the unit at the current offset and records
/// its size as pending; [`advance`](Self::advance) moves past it. A unit
/// that was peeked but not advanced past is offered again by the next peek,
/// which is how a refused send is retried.
#[derive(Debug, Clone)]
pub struct ObuCursor {
    data: Bytes,
    offset: usize,
    pending: usize,
}

impl ObuCursor {
    /// Creates a cursor at the start of `data`.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            offset: 0,
            pending: 0,
        }
    }

    /// Locates the unit at the current offset without moving past it.
    ///
    /// Returns `Ok(None)` once the whole stream has been consumed.
    pub fn peek(&mut self) -> av1::Result<Option<Unit>> {
        let Some(span) = next_unit(&self.data, self.offset)? else {
            self.pending = 0;
            return Ok(None);
        };

        let size = span.total_size();
        self.pending = size;
        Ok(Some(Unit {
            obu_type: span.obu_type(),
            offset: self.offset,
            data: self.data.slice(self.offset..self.offset + size),
            header_size: span.header_size,
        }))
    }

    /// Moves past the unit returned by the last [`peek`](Self::peek).
    pub fn advance(&mut self) {
        self.offset += self.pending;
        self.pending = 0;
    }

    /// Returns to the start of the stream.
    pub fn rewind(&mut self) {
        self.offset = 0;
        self.pending = 0;
    }

    /// Current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether every unit has been advanced past.
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Total stream length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the stream is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops the stream contents.
    pub fn release(&mut self) {
        self.data = Bytes::new();
        self.rewind();
    }
}
