use alloc::vec::Vec;
use core::fmt;

/// The frame ended before a field could be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnexpectedEof {
    /// Where the failed read started.
    pub offset: usize,
    pub needed: usize,
}

impl fmt::Display for UnexpectedEof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unexpected end of frame: needed {} bytes at offset {}",
            self.needed, self.offset
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnexpectedEof {}

/// Errors that can occur while encoding Modbus data into an output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncodeError {
    BufferTooSmall,
    ValueOutOfRange,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("buffer too small"),
            Self::ValueOutOfRange => f.write_str("value out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

/// Structural problems found while turning a request frame into a command.
///
/// Every variant keeps a copy of the offending frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    PacketTooShort { frame: Vec<u8> },
    FunctionCodeNotImplemented { function_code: u8, frame: Vec<u8> },
    /// FC05 value other than `0xFF00` / `0x0000`.
    InvalidCoilStatus { frame: Vec<u8> },
    /// FC15 byte count or frame length disagrees with the coil count.
    InvalidCoilStatusCommand { frame: Vec<u8> },
    /// FC16 byte count or frame length disagrees with the register count.
    InvalidRegisterCommand { frame: Vec<u8> },
}

impl DecodeError {
    pub fn frame(&self) -> &[u8] {
        match self {
            Self::PacketTooShort { frame }
            | Self::FunctionCodeNotImplemented { frame, .. }
            | Self::InvalidCoilStatus { frame }
            | Self::InvalidCoilStatusCommand { frame }
            | Self::InvalidRegisterCommand { frame } => frame,
        }
    }

    pub fn into_frame(self) -> Vec<u8> {
        match self {
            Self::PacketTooShort { frame }
            | Self::FunctionCodeNotImplemented { frame, .. }
            | Self::InvalidCoilStatus { frame }
            | Self::InvalidCoilStatusCommand { frame }
            | Self::InvalidRegisterCommand { frame } => frame,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketTooShort { frame } => {
                write!(f, "packet length too short ({} bytes)", frame.len())
            }
            Self::FunctionCodeNotImplemented { function_code, .. } => {
                write!(f, "function code 0x{function_code:02X} not implemented")
            }
            Self::InvalidCoilStatus { .. } => {
                f.write_str("FORCE_SINGLE_COIL - invalid coil status received")
            }
            Self::InvalidCoilStatusCommand { .. } => {
                f.write_str("FORCE_MULTIPLE_COILS - invalid coil status command received")
            }
            Self::InvalidRegisterCommand { .. } => {
                f.write_str("PRESET_MULTIPLE_REGISTERS - invalid register command received")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Misuse of a command's one-shot resolution surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// `response_packet` was read before `success` or `fail`.
    ResponseNotReady,
    /// `success` or `fail` was called on a command that already has a response.
    AlreadyResolved,
    /// Read-command data does not match the quantity the client asked for.
    DataLengthMismatch { expected: usize, actual: usize },
    Encode(EncodeError),
}

impl From<EncodeError> for ResolveError {
    fn from(err: EncodeError) -> Self {
        Self::Encode(err)
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResponseNotReady => f.write_str(
                "tried to read response packet, but success or fail has not been called",
            ),
            Self::AlreadyResolved => f.write_str("command has already been resolved"),
            Self::DataLengthMismatch { expected, actual } => {
                write!(f, "expected {expected} values in response data, got {actual}")
            }
            Self::Encode(err) => write!(f, "response encoding failed: {err}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ResolveError {}

#[cfg(test)]
mod tests {
    use super::{DecodeError, ResolveError};
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn decode_error_keeps_frame() {
        let err = DecodeError::InvalidCoilStatus {
            frame: vec![0x00, 0x01, 0x05],
        };
        assert_eq!(err.frame(), &[0x00, 0x01, 0x05]);
        assert_eq!(err.into_frame(), vec![0x00, 0x01, 0x05]);
    }

    #[test]
    fn messages_name_the_problem() {
        let err = DecodeError::FunctionCodeNotImplemented {
            function_code: 0x14,
            frame: vec![],
        };
        assert_eq!(err.to_string(), "function code 0x14 not implemented");
        assert_eq!(
            ResolveError::DataLengthMismatch {
                expected: 4,
                actual: 3
            }
            .to_string(),
            "expected 4 values in response data, got 3"
        );
    }
}
