use crate::encoding::{Reader, Writer};
use crate::error::UnexpectedEof;
use crate::EncodeError;

pub const MBAP_HEADER_LEN: usize = 7;

/// MBAP header + function code + the two 16-bit fields every supported request carries.
pub const MIN_REQUEST_LEN: usize = 12;

/// Exception responses are always header + function code + exception code.
pub const EXCEPTION_FRAME_LEN: usize = 9;

/// Largest Modbus/TCP application data unit (7-byte header + 253-byte PDU).
pub const MAX_ADU_LEN: usize = 260;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    pub transaction_id: u16,
    pub protocol_id: u16,
    /// Counts the unit id and everything after it.
    pub length: u16,
    pub unit_id: u8,
}

impl MbapHeader {
    pub fn encode(&self, w: &mut Writer) -> Result<(), EncodeError> {
        w.write_be_u16(self.transaction_id)?;
        w.write_be_u16(self.protocol_id)?;
        w.write_be_u16(self.length)?;
        w.write_u8(self.unit_id)?;
        Ok(())
    }

    /// Reads the header fields as they are; callers decide what to reject.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, UnexpectedEof> {
        let transaction_id = r.read_be_u16()?;
        let protocol_id = r.read_be_u16()?;
        let length = r.read_be_u16()?;
        let unit_id = r.read_u8()?;
        Ok(Self {
            transaction_id,
            protocol_id,
            length,
            unit_id,
        })
    }

    /// Total frame size announced by this header, header bytes included.
    pub fn frame_len(&self) -> usize {
        MBAP_HEADER_LEN - 1 + usize::from(self.length)
    }

    /// Header for a response to `self` whose body (after the unit id) is `body_len` bytes.
    pub fn reply(&self, body_len: usize) -> Result<Self, EncodeError> {
        let length = u16::try_from(body_len + 1).map_err(|_| EncodeError::ValueOutOfRange)?;
        Ok(Self { length, ..*self })
    }
}
