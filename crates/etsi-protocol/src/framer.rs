//! Input line framing
//!
//! Bytes arrive one at a time from a [`CharSource`] and are collected into a
//! bounded buffer until the terminator shows up. A line that fills the buffer
//! without a terminator is reported once and then skipped up to and including
//! its terminator, so its tail never reaches the dispatcher.

use std::collections::VecDeque;

use tracing::warn;

use crate::error::FrameError;

/// Default buffer size, terminator included
pub const DEFAULT_LINE_CAPACITY: usize = 256;

/// Default line terminator
pub const DEFAULT_TERMINATOR: u8 = b'\n';

/// Non-blocking byte input
pub trait CharSource {
    /// Next received byte, or `None` when nothing is available yet
    fn poll_char(&mut self) -> Option<u8>;
}

impl CharSource for VecDeque<u8> {
    fn poll_char(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

/// Streaming line assembler
#[derive(Debug, Clone)]
pub struct LineFramer {
    buffer: Vec<u8>,
    capacity: usize,
    terminator: u8,
    /// Skipping the rest of an oversized line
    discarding: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// A framer with the default capacity and terminator
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LINE_CAPACITY, DEFAULT_TERMINATOR)
    }

    /// A framer holding at most `capacity` bytes per line, terminator included
    pub fn with_capacity(capacity: usize, terminator: u8) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            terminator,
            discarding: false,
        }
    }

    /// Maximum line length, terminator included
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes of the line being assembled
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial line and stop skipping
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Feed one byte
    ///
    /// Returns a complete line (terminator included) when `byte` ends one, or
    /// an overflow error when the buffer fills up first.
    pub fn push(&mut self, byte: u8) -> Option<Result<Vec<u8>, FrameError>> {
        if byte == 0 {
            return None;
        }

        if self.discarding {
            if byte == self.terminator {
                self.discarding = false;
            }
            return None;
        }

        self.buffer.push(byte);
        if byte == self.terminator {
            return Some(Ok(std::mem::take(&mut self.buffer)));
        }

        if self.buffer.len() >= self.capacity {
            warn!(
                "Command line exceeds {} bytes, discarding until next terminator",
                self.capacity
            );
            self.buffer.clear();
            self.discarding = true;
            return Some(Err(FrameError::Overflow {
                capacity: self.capacity,
            }));
        }

        None
    }

    /// Drain `source` until a line completes, framing fails or input runs dry
    pub fn poll_line<S>(&mut self, source: &mut S) -> Option<Result<Vec<u8>, FrameError>>
    where
        S: CharSource + ?Sized,
    {
        while let Some(byte) = source.poll_char() {
            if let Some(result) = self.push(byte) {
                return Some(result);
            }
        }
        None
    }
}
