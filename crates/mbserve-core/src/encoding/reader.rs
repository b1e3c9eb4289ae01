use crate::error::UnexpectedEof;

/// Cursor over a received frame. Reads borrow from the frame, never copy.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, UnexpectedEof> {
        Ok(self.read_exact(1)?[0])
    }

    /// On failure the cursor stays where it was.
    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8], UnexpectedEof> {
        let start = self.pos;
        let bytes = start
            .checked_add(len)
            .and_then(|end| self.buf.get(start..end))
            .ok_or(UnexpectedEof {
                offset: start,
                needed: len,
            })?;
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_be_u16(&mut self) -> Result<u16, UnexpectedEof> {
        let bytes = self.read_exact(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}
