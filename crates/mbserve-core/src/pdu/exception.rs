use alloc::vec::Vec;

use crate::encoding::{Reader, Writer};
use crate::frame::tcp::{MbapHeader, EXCEPTION_FRAME_LEN};
use crate::EncodeError;

/// Exception codes an application may answer a command with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    Acknowledge,
    ServerDeviceBusy,
    NegativeAcknowledge,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
}

impl ExceptionCode {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::IllegalFunction),
            0x02 => Some(Self::IllegalDataAddress),
            0x03 => Some(Self::IllegalDataValue),
            0x04 => Some(Self::ServerDeviceFailure),
            0x05 => Some(Self::Acknowledge),
            0x06 => Some(Self::ServerDeviceBusy),
            0x07 => Some(Self::NegativeAcknowledge),
            0x08 => Some(Self::MemoryParityError),
            0x0A => Some(Self::GatewayPathUnavailable),
            0x0B => Some(Self::GatewayTargetFailedToRespond),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::ServerDeviceFailure => 0x04,
            Self::Acknowledge => 0x05,
            Self::ServerDeviceBusy => 0x06,
            Self::NegativeAcknowledge => 0x07,
            Self::MemoryParityError => 0x08,
            Self::GatewayPathUnavailable => 0x0A,
            Self::GatewayTargetFailedToRespond => 0x0B,
        }
    }
}

/// Builds the fixed 9-byte exception frame for `request`.
///
/// Transaction id, protocol id and unit id are copied from the request, the
/// length field is always `0x0003` and the function code gets bit 7 set.
pub fn encode_exception_frame(
    request: &[u8],
    exception: ExceptionCode,
) -> Result<Vec<u8>, EncodeError> {
    let mut r = Reader::new(request);
    let header = MbapHeader::decode(&mut r).map_err(|_| EncodeError::ValueOutOfRange)?;
    let function = r.read_u8().map_err(|_| EncodeError::ValueOutOfRange)?;

    let mut w = Writer::with_limit(EXCEPTION_FRAME_LEN);
    header.reply(2)?.encode(&mut w)?;
    w.write_u8(function | 0x80)?;
    w.write_u8(exception.as_u8())?;
    Ok(w.into_frame())
}
