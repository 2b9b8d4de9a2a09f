//! Checked cursors over packed wire buffers
//!
//! Every offset in an announcement packet is recomputed from the counts
//! embedded in the stream, so the read cursor checks the remaining length
//! before every access and fails closed on underrun. The write cursor owns
//! a single exact-size allocation and verifies on hand-off that every
//! reserved byte was written.

use bytes::BufMut;

use crate::error::{FramingError, RouteResult};

/// Read cursor over an untrusted inbound buffer.
#[derive(Debug)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    consumed: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, consumed: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Bytes handed out so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], FramingError> {
        if self.buf.len() < len {
            return Err(FramingError::Truncated { need: len, have: self.buf.len() });
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        self.consumed += len;
        Ok(head)
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8], FramingError> {
        self.take(len)
    }

    pub fn get_u16_le(&mut self) -> Result<u16, FramingError> {
        let raw = self.take(2)?;
        let mut bytes = [0u8; 2];
        bytes.copy_from_slice(raw);
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn get_u32_le(&mut self) -> Result<u32, FramingError> {
        let raw = self.take(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(raw);
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn get_i32_le(&mut self) -> Result<i32, FramingError> {
        let raw = self.take(4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(raw);
        Ok(i32::from_le_bytes(bytes))
    }

    pub fn get_u64_le(&mut self) -> Result<u64, FramingError> {
        let raw = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Succeed only if the buffer was consumed exactly.
    pub fn finish(self) -> Result<(), FramingError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(FramingError::TrailingBytes { trailing: self.buf.len() })
        }
    }
}

/// Write cursor over a single exact-size allocation.
#[derive(Debug)]
pub struct WriteCursor {
    buf: Vec<u8>,
    capacity: usize,
}

impl WriteCursor {
    /// Reserve the full buffer up front; allocation failure is the only
    /// expected error on the write path.
    pub fn with_exact_size(size: usize) -> RouteResult<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size)?;
        Ok(Self { buf, capacity: size })
    }

    pub fn put_u16_le(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn put_u32_le(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn put_i32_le(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn put_u64_le(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.buf.len()
    }

    /// Hand the buffer out, verifying the fill matched the reservation.
    pub fn finish(self) -> Result<Vec<u8>, FramingError> {
        if self.buf.len() != self.capacity {
            return Err(FramingError::LengthMismatch {
                declared: self.capacity as u64,
                actual: self.buf.len() as u64,
            });
        }
        Ok(self.buf)
    }
}
