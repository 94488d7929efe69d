//! Shared helpers for session tests: a deterministic in-process engine and
//! a builder for synthetic OBU streams.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use av1::seq::{ColorConfig, SequenceHeaderObu};
use av1::{ObuType, next_unit, write_obu};
use av1_reader::{Attempt, DecodeEngine, EngineError, Picture, PicturePool, Plane};
use bytes::Bytes;

/// Initialize tracing for tests with appropriate settings
#[inline]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Everything the engine saw, shared with the test after the session takes
/// ownership of the engine.
#[derive(Debug, Default)]
pub struct EngineLog {
    pub sent: Vec<ObuType>,
    pub refused: usize,
    pub flushes: usize,
    pub teardowns: usize,
}

/// An engine that "decodes" frame OBUs into patterned pictures.
///
/// The first payload byte of a frame OBU is the number of pictures it
/// produces, the second the pattern seed of the first of them. Pictures
/// queue up to `capacity`, beyond which input is refused. The newest
/// `lookahead` pictures are held back until more input arrives, or until
/// the engine is polled twice with no input in between.
pub struct LoopbackEngine {
    width: u32,
    height: u32,
    capacity: usize,
    lookahead: usize,
    queue: VecDeque<u8>,
    idle: bool,
    log: Rc<RefCell<EngineLog>>,
}

impl LoopbackEngine {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            capacity: 8,
            lookahead: 0,
            queue: VecDeque::new(),
            idle: false,
            log: Rc::default(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn log(&self) -> Rc<RefCell<EngineLog>> {
        Rc::clone(&self.log)
    }
}

impl DecodeEngine for LoopbackEngine {
    fn send(&mut self, unit: Bytes) -> Result<Attempt<()>, EngineError> {
        let span = next_unit(&unit, 0)
            .map_err(|e| EngineError::fatal("send", e.to_string()))?
            .ok_or_else(|| EngineError::fatal("send", "empty unit"))?;

        if self.queue.len() >= self.capacity {
            self.log.borrow_mut().refused += 1;
            return Ok(Attempt::WouldBlock);
        }

        if span.obu_type() == ObuType::Frame {
            let payload = &unit[span.header_size..];
            let count = payload.first().copied().unwrap_or(1);
            let seed = payload.get(1).copied().unwrap_or(0);
            for k in 0..count {
                self.queue.push_back(seed.wrapping_add(k));
            }
        }

        self.idle = false;
        self.log.borrow_mut().sent.push(span.obu_type());
        Ok(Attempt::Ready(()))
    }

    fn receive_picture(
        &mut self,
        pool: &mut PicturePool,
    ) -> Result<Attempt<Picture>, EngineError> {
        let drain = self.idle;
        self.idle = true;

        if self.queue.len() <= self.lookahead && !(drain && !self.queue.is_empty()) {
            return Ok(Attempt::WouldBlock);
        }
        let Some(seed) = self.queue.pop_front() else {
            return Ok(Attempt::WouldBlock);
        };

        let mut buffer = pool.acquire_picture()?;
        for (index, plane) in [Plane::Y, Plane::U, Plane::V].into_iter().enumerate() {
            fill(buffer.plane_mut(plane), seed, index as u8);
        }

        Ok(Attempt::Ready(Picture::new(buffer, self.width, self.height)))
    }

    fn flush(&mut self) {
        self.queue.clear();
        self.idle = false;
        self.log.borrow_mut().flushes += 1;
    }

    fn teardown(&mut self) {
        self.queue.clear();
        self.log.borrow_mut().teardowns += 1;
    }
}

fn fill(plane: &mut [u8], seed: u8, plane_index: u8) {
    for (i, byte) in plane.iter_mut().enumerate() {
        *byte = seed ^ plane_index.wrapping_mul(0x40) ^ (i as u8);
    }
}

/// Value at byte 0 of plane `plane_index` for a picture with `seed`.
pub fn first_byte(seed: u8, plane_index: u8) -> u8 {
    seed ^ plane_index.wrapping_mul(0x40)
}

/// Builds a low-overhead OBU stream.
#[derive(Default)]
pub struct StreamBuilder {
    data: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temporal_delimiter(mut self) -> Self {
        write_obu(&mut self.data, ObuType::TemporalDelimiter, None, &[]).unwrap();
        self
    }

    pub fn sequence_header(mut self, width: u32, height: u32, color_config: ColorConfig) -> Self {
        let mut payload = Vec::new();
        SequenceHeaderObu::new(width, height, color_config)
            .mux(&mut payload)
            .unwrap();
        write_obu(&mut self.data, ObuType::SequenceHeader, None, &payload).unwrap();
        self
    }

    /// A frame OBU producing one picture with pattern `seed`.
    pub fn frame(self, seed: u8) -> Self {
        self.frames(1, seed)
    }

    /// A frame OBU producing `count` pictures, seeded `seed`, `seed + 1`, ...
    pub fn frames(mut self, count: u8, seed: u8) -> Self {
        write_obu(&mut self.data, ObuType::Frame, None, &[count, seed, 0, 0]).unwrap();
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// 8-bit 4:2:0 color config.
pub fn yuv420() -> ColorConfig {
    ColorConfig::new(8, true, true)
}
