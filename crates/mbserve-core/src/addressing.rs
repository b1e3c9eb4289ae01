//! Translation from zero-based protocol offsets into Modicon 5-digit addresses.

/// First address of each Modicon table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressBase {
    Coil,
    DiscreteInput,
    InputRegister,
    HoldingRegister,
}

impl AddressBase {
    pub const fn offset(self) -> u32 {
        match self {
            Self::Coil => 1,
            Self::DiscreteInput => 10_001,
            Self::InputRegister => 30_001,
            Self::HoldingRegister => 40_001,
        }
    }
}

/// Returns `offset` unchanged in simple mode, otherwise shifts it into `base`'s range.
pub const fn translate(offset: u16, base: AddressBase, simple: bool) -> u32 {
    if simple {
        offset as u32
    } else {
        offset as u32 + base.offset()
    }
}
