use super::{check_data_len, impl_modbus_command, CommandState, Outcome};
use crate::pdu::{encode_bit_response, encode_register_response, FunctionCode};
use crate::ResolveError;

/// FC01 - the client asks for `number_of_coils` coils starting at `coil_start_address`.
#[derive(Debug)]
pub struct ReadCoilStatusCommand {
    state: CommandState,
    coil_start_address: u32,
    number_of_coils: u16,
}

impl ReadCoilStatusCommand {
    pub(crate) fn new(state: CommandState, coil_start_address: u32, number_of_coils: u16) -> Self {
        Self {
            state,
            coil_start_address,
            number_of_coils,
        }
    }

    pub fn coil_start_address(&self) -> u32 {
        self.coil_start_address
    }

    pub fn number_of_coils(&self) -> u16 {
        self.number_of_coils
    }

    /// `coils` must hold exactly [`number_of_coils`](Self::number_of_coils) values.
    pub fn success(&mut self, coils: &[bool]) -> Result<(), ResolveError> {
        self.state.ensure_unresolved()?;
        check_data_len(self.number_of_coils, coils.len())?;
        let response = encode_bit_response(self.state.request(), coils)?;
        self.state.resolve(Outcome::Success, response)
    }
}

impl_modbus_command!(ReadCoilStatusCommand, FunctionCode::ReadCoilStatus);

/// FC02 - the client asks for `number_of_inputs` discrete inputs.
#[derive(Debug)]
pub struct ReadInputStatusCommand {
    state: CommandState,
    input_start_address: u32,
    number_of_inputs: u16,
}

impl ReadInputStatusCommand {
    pub(crate) fn new(state: CommandState, input_start_address: u32, number_of_inputs: u16) -> Self {
        Self {
            state,
            input_start_address,
            number_of_inputs,
        }
    }

    pub fn input_start_address(&self) -> u32 {
        self.input_start_address
    }

    pub fn number_of_inputs(&self) -> u16 {
        self.number_of_inputs
    }

    pub fn success(&mut self, inputs: &[bool]) -> Result<(), ResolveError> {
        self.state.ensure_unresolved()?;
        check_data_len(self.number_of_inputs, inputs.len())?;
        let response = encode_bit_response(self.state.request(), inputs)?;
        self.state.resolve(Outcome::Success, response)
    }
}

impl_modbus_command!(ReadInputStatusCommand, FunctionCode::ReadInputStatus);

/// FC03 - the client asks for `register_length` holding registers.
#[derive(Debug)]
pub struct ReadHoldingRegistersCommand {
    state: CommandState,
    register_start_address: u32,
    register_length: u16,
}

impl ReadHoldingRegistersCommand {
    pub(crate) fn new(
        state: CommandState,
        register_start_address: u32,
        register_length: u16,
    ) -> Self {
        Self {
            state,
            register_start_address,
            register_length,
        }
    }

    pub fn register_start_address(&self) -> u32 {
        self.register_start_address
    }

    pub fn register_length(&self) -> u16 {
        self.register_length
    }

    pub fn success(&mut self, registers: &[u16]) -> Result<(), ResolveError> {
        self.state.ensure_unresolved()?;
        check_data_len(self.register_length, registers.len())?;
        let response = encode_register_response(self.state.request(), registers)?;
        self.state.resolve(Outcome::Success, response)
    }
}

impl_modbus_command!(ReadHoldingRegistersCommand, FunctionCode::ReadHoldingRegisters);

/// FC04 - the client asks for `register_length` input registers.
#[derive(Debug)]
pub struct ReadInputRegistersCommand {
    state: CommandState,
    register_start_address: u32,
    register_length: u16,
}

impl ReadInputRegistersCommand {
    pub(crate) fn new(
        state: CommandState,
        register_start_address: u32,
        register_length: u16,
    ) -> Self {
        Self {
            state,
            register_start_address,
            register_length,
        }
    }

    pub fn register_start_address(&self) -> u32 {
        self.register_start_address
    }

    pub fn register_length(&self) -> u16 {
        self.register_length
    }

    pub fn success(&mut self, registers: &[u16]) -> Result<(), ResolveError> {
        self.state.ensure_unresolved()?;
        check_data_len(self.register_length, registers.len())?;
        let response = encode_register_response(self.state.request(), registers)?;
        self.state.resolve(Outcome::Success, response)
    }
}

impl_modbus_command!(ReadInputRegistersCommand, FunctionCode::ReadInputRegisters);
