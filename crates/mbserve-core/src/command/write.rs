use alloc::vec::Vec;

use super::{impl_modbus_command, CommandState, Outcome};
use crate::pdu::{encode_echo, encode_fixed_echo, FunctionCode};
use crate::ResolveError;

/// Wire value of a single coil write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoilStatus {
    On,
    Off,
}

impl CoilStatus {
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0xFF00 => Some(Self::On),
            0x0000 => Some(Self::Off),
            _ => None,
        }
    }

    pub const fn as_u16(self) -> u16 {
        match self {
            Self::On => 0xFF00,
            Self::Off => 0x0000,
        }
    }
}

impl From<bool> for CoilStatus {
    fn from(value: bool) -> Self {
        if value {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl From<CoilStatus> for bool {
    fn from(value: CoilStatus) -> Self {
        value == CoilStatus::On
    }
}

/// FC05 - set one coil.
#[derive(Debug)]
pub struct ForceSingleCoilCommand {
    state: CommandState,
    coil_address: u32,
    coil_status: CoilStatus,
}

impl ForceSingleCoilCommand {
    pub(crate) fn new(state: CommandState, coil_address: u32, coil_status: CoilStatus) -> Self {
        Self {
            state,
            coil_address,
            coil_status,
        }
    }

    pub fn coil_address(&self) -> u32 {
        self.coil_address
    }

    pub fn coil_status(&self) -> CoilStatus {
        self.coil_status
    }

    pub fn coil_value(&self) -> bool {
        self.coil_status.into()
    }

    /// Acknowledges the write by echoing the request.
    pub fn success(&mut self) -> Result<(), ResolveError> {
        self.state.ensure_unresolved()?;
        let response = encode_echo(self.state.request());
        self.state.resolve(Outcome::Success, response)
    }
}

impl_modbus_command!(ForceSingleCoilCommand, FunctionCode::ForceSingleCoil);

/// FC06 - write one holding register.
#[derive(Debug)]
pub struct PresetSingleRegisterCommand {
    state: CommandState,
    register_address: u32,
    register_value: u16,
}

impl PresetSingleRegisterCommand {
    pub(crate) fn new(state: CommandState, register_address: u32, register_value: u16) -> Self {
        Self {
            state,
            register_address,
            register_value,
        }
    }

    pub fn register_address(&self) -> u32 {
        self.register_address
    }

    pub fn register_value(&self) -> u16 {
        self.register_value
    }

    pub fn success(&mut self) -> Result<(), ResolveError> {
        self.state.ensure_unresolved()?;
        let response = encode_echo(self.state.request());
        self.state.resolve(Outcome::Success, response)
    }
}

impl_modbus_command!(PresetSingleRegisterCommand, FunctionCode::PresetSingleRegister);

/// FC15 - set a run of coils.
#[derive(Debug)]
pub struct ForceMultipleCoilsCommand {
    state: CommandState,
    coil_start_address: u32,
    coil_length: u16,
    coil_statuses: Vec<bool>,
}

impl ForceMultipleCoilsCommand {
    pub(crate) fn new(
        state: CommandState,
        coil_start_address: u32,
        coil_length: u16,
        coil_statuses: Vec<bool>,
    ) -> Self {
        Self {
            state,
            coil_start_address,
            coil_length,
            coil_statuses,
        }
    }

    pub fn coil_start_address(&self) -> u32 {
        self.coil_start_address
    }

    pub fn coil_length(&self) -> u16 {
        self.coil_length
    }

    pub fn coil_statuses(&self) -> &[bool] {
        &self.coil_statuses
    }

    pub fn coil_statuses_as_coil_status(&self) -> impl Iterator<Item = CoilStatus> + '_ {
        self.coil_statuses.iter().map(|value| CoilStatus::from(*value))
    }

    /// Acknowledges the write with start address and quantity.
    pub fn success(&mut self) -> Result<(), ResolveError> {
        self.state.ensure_unresolved()?;
        let response = encode_fixed_echo(self.state.request())?;
        self.state.resolve(Outcome::Success, response)
    }
}

impl_modbus_command!(ForceMultipleCoilsCommand, FunctionCode::ForceMultipleCoils);

/// FC16 - write a run of holding registers.
#[derive(Debug)]
pub struct PresetMultipleRegistersCommand {
    state: CommandState,
    register_start_address: u32,
    register_length: u16,
    register_values: Vec<u16>,
}

impl PresetMultipleRegistersCommand {
    pub(crate) fn new(
        state: CommandState,
        register_start_address: u32,
        register_length: u16,
        register_values: Vec<u16>,
    ) -> Self {
        Self {
            state,
            register_start_address,
            register_length,
            register_values,
        }
    }

    pub fn register_start_address(&self) -> u32 {
        self.register_start_address
    }

    pub fn register_length(&self) -> u16 {
        self.register_length
    }

    pub fn register_values(&self) -> &[u16] {
        &self.register_values
    }

    pub fn success(&mut self) -> Result<(), ResolveError> {
        self.state.ensure_unresolved()?;
        let response = encode_fixed_echo(self.state.request())?;
        self.state.resolve(Outcome::Success, response)
    }
}

impl_modbus_command!(PresetMultipleRegistersCommand, FunctionCode::PresetMultipleRegisters);
