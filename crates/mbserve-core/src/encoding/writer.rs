use alloc::vec::Vec;

use crate::EncodeError;

/// Builds an owned frame field by field, refusing to grow past `limit` bytes.
#[derive(Debug, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    limit: usize,
}

impl Writer {
    /// `limit` is also the initial capacity, so a correctly sized frame never reallocates.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(limit),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.buf.len())
    }

    pub fn as_written(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_frame(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), EncodeError> {
        self.write_all(&[value])
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        if self.remaining() < data.len() {
            return Err(EncodeError::BufferTooSmall);
        }
        self.buf.extend_from_slice(data);
        Ok(())
    }

    pub fn write_be_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        self.write_all(&value.to_be_bytes())
    }
}
