/// Function codes this server decodes. Anything else is rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FunctionCode {
    ReadCoilStatus,
    ReadInputStatus,
    ReadHoldingRegisters,
    ReadInputRegisters,
    ForceSingleCoil,
    PresetSingleRegister,
    ForceMultipleCoils,
    PresetMultipleRegisters,
}

impl FunctionCode {
    pub const ALL: [Self; 8] = [
        Self::ReadCoilStatus,
        Self::ReadInputStatus,
        Self::ReadHoldingRegisters,
        Self::ReadInputRegisters,
        Self::ForceSingleCoil,
        Self::PresetSingleRegister,
        Self::ForceMultipleCoils,
        Self::PresetMultipleRegisters,
    ];

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ReadCoilStatus => 0x01,
            Self::ReadInputStatus => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::ForceSingleCoil => 0x05,
            Self::PresetSingleRegister => 0x06,
            Self::ForceMultipleCoils => 0x0F,
            Self::PresetMultipleRegisters => 0x10,
        }
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::ReadCoilStatus),
            0x02 => Some(Self::ReadInputStatus),
            0x03 => Some(Self::ReadHoldingRegisters),
            0x04 => Some(Self::ReadInputRegisters),
            0x05 => Some(Self::ForceSingleCoil),
            0x06 => Some(Self::PresetSingleRegister),
            0x0F => Some(Self::ForceMultipleCoils),
            0x10 => Some(Self::PresetMultipleRegisters),
            _ => None,
        }
    }

    pub const fn is_exception(value: u8) -> bool {
        (value & 0x80) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::FunctionCode;

    #[test]
    fn parses_known_codes() {
        assert_eq!(FunctionCode::from_u8(0x01), Some(FunctionCode::ReadCoilStatus));
        assert_eq!(FunctionCode::from_u8(0x0F), Some(FunctionCode::ForceMultipleCoils));
        assert_eq!(
            FunctionCode::from_u8(0x10),
            Some(FunctionCode::PresetMultipleRegisters)
        );
    }

    #[test]
    fn codes_roundtrip() {
        for code in FunctionCode::ALL {
            assert_eq!(FunctionCode::from_u8(code.as_u8()), Some(code));
        }
    }

    #[test]
    fn rejects_unsupported_codes() {
        assert_eq!(FunctionCode::from_u8(0x14), None);
        assert_eq!(FunctionCode::from_u8(0x17), None);
        assert_eq!(FunctionCode::from_u8(0x81), None);
    }

    #[test]
    fn exception_bit_is_detected() {
        assert!(FunctionCode::is_exception(0x83));
        assert!(!FunctionCode::is_exception(0x03));
    }
}
