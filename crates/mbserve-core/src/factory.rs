use alloc::vec::Vec;

use crate::addressing::{translate, AddressBase};
use crate::command::{
    CoilStatus, Command, CommandState, ForceMultipleCoilsCommand, ForceSingleCoilCommand,
    PresetMultipleRegistersCommand, PresetSingleRegisterCommand, ReadCoilStatusCommand,
    ReadHoldingRegistersCommand, ReadInputRegistersCommand, ReadInputStatusCommand,
};
use crate::encoding::Reader;
use crate::frame::tcp::{MbapHeader, MIN_REQUEST_LEN};
use crate::pdu::{unpack_bits, FunctionCode};
use crate::DecodeError;

/// Byte offset of the FC15/FC16 byte-count field; the packed payload follows it.
const BYTE_COUNT_OFFSET: usize = MIN_REQUEST_LEN;

/// Turns Modbus/TCP request frames into [`Command`]s.
///
/// The only setting is the addressing mode. Decoding keeps no state between
/// calls, so one factory can be shared by reference across connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFactory {
    simple_addressing: bool,
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CommandFactory {
    pub const fn new(simple_addressing: bool) -> Self {
        Self { simple_addressing }
    }

    pub const fn simple_addressing(&self) -> bool {
        self.simple_addressing
    }

    fn address(&self, offset: u16, base: AddressBase) -> u32 {
        translate(offset, base, self.simple_addressing)
    }

    pub fn decode(&self, frame: &[u8]) -> Result<Command, DecodeError> {
        if frame.len() < MIN_REQUEST_LEN {
            return Err(DecodeError::PacketTooShort {
                frame: frame.to_vec(),
            });
        }
        let too_short = |_| DecodeError::PacketTooShort {
            frame: frame.to_vec(),
        };

        let mut r = Reader::new(frame);
        MbapHeader::decode(&mut r).map_err(too_short)?;
        let raw_function = r.read_u8().map_err(too_short)?;
        let Some(function) = FunctionCode::from_u8(raw_function) else {
            return Err(DecodeError::FunctionCodeNotImplemented {
                function_code: raw_function,
                frame: frame.to_vec(),
            });
        };
        let address = r.read_be_u16().map_err(too_short)?;
        let field = r.read_be_u16().map_err(too_short)?;

        let command = match function {
            FunctionCode::ReadCoilStatus => Command::ReadCoilStatus(ReadCoilStatusCommand::new(
                CommandState::new(frame.to_vec()),
                self.address(address, AddressBase::Coil),
                field,
            )),
            FunctionCode::ReadInputStatus => Command::ReadInputStatus(ReadInputStatusCommand::new(
                CommandState::new(frame.to_vec()),
                self.address(address, AddressBase::DiscreteInput),
                field,
            )),
            FunctionCode::ReadHoldingRegisters => {
                Command::ReadHoldingRegisters(ReadHoldingRegistersCommand::new(
                    CommandState::new(frame.to_vec()),
                    self.address(address, AddressBase::HoldingRegister),
                    field,
                ))
            }
            FunctionCode::ReadInputRegisters => {
                Command::ReadInputRegisters(ReadInputRegistersCommand::new(
                    CommandState::new(frame.to_vec()),
                    self.address(address, AddressBase::InputRegister),
                    field,
                ))
            }
            FunctionCode::ForceSingleCoil => {
                let status = CoilStatus::from_u16(field).ok_or_else(|| {
                    DecodeError::InvalidCoilStatus {
                        frame: frame.to_vec(),
                    }
                })?;
                Command::ForceSingleCoil(ForceSingleCoilCommand::new(
                    CommandState::new(frame.to_vec()),
                    self.address(address, AddressBase::Coil),
                    status,
                ))
            }
            FunctionCode::PresetSingleRegister => {
                Command::PresetSingleRegister(PresetSingleRegisterCommand::new(
                    CommandState::new(frame.to_vec()),
                    self.address(address, AddressBase::HoldingRegister),
                    field,
                ))
            }
            FunctionCode::ForceMultipleCoils => {
                let statuses = decode_coil_block(&mut r, field).ok_or_else(|| {
                    DecodeError::InvalidCoilStatusCommand {
                        frame: frame.to_vec(),
                    }
                })?;
                Command::ForceMultipleCoils(ForceMultipleCoilsCommand::new(
                    CommandState::new(frame.to_vec()),
                    self.address(address, AddressBase::Coil),
                    field,
                    statuses,
                ))
            }
            FunctionCode::PresetMultipleRegisters => {
                let values = decode_register_block(&mut r, field).ok_or_else(|| {
                    DecodeError::InvalidRegisterCommand {
                        frame: frame.to_vec(),
                    }
                })?;
                Command::PresetMultipleRegisters(PresetMultipleRegistersCommand::new(
                    CommandState::new(frame.to_vec()),
                    self.address(address, AddressBase::HoldingRegister),
                    field,
                    values,
                ))
            }
        };
        Ok(command)
    }
}

/// Byte count must equal `ceil(quantity / 8)` and nothing may follow the packed bits.
fn decode_coil_block(r: &mut Reader<'_>, quantity: u16) -> Option<Vec<bool>> {
    let byte_length = usize::from(quantity).div_ceil(8);
    payload(r, byte_length).map(|packed| unpack_bits(packed, usize::from(quantity)))
}

/// Byte count must equal `2 * quantity` and nothing may follow the registers.
fn decode_register_block(r: &mut Reader<'_>, quantity: u16) -> Option<Vec<u16>> {
    let byte_length = usize::from(quantity) * 2;
    let bytes = payload(r, byte_length)?;
    Some(
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect(),
    )
}

fn payload<'a>(r: &mut Reader<'a>, byte_length: usize) -> Option<&'a [u8]> {
    debug_assert_eq!(r.position(), BYTE_COUNT_OFFSET);
    let byte_count = usize::from(r.read_u8().ok()?);
    if byte_count != byte_length || r.remaining() != byte_length {
        return None;
    }
    r.read_exact(byte_length).ok()
}

#[cfg(test)]
mod tests {
    use super::CommandFactory;
    use crate::command::{Command, ModbusCommand};
    use crate::pdu::FunctionCode;
    use crate::DecodeError;

    #[test]
    fn default_is_simple_addressing() {
        assert!(CommandFactory::default().simple_addressing());
        assert!(!CommandFactory::new(false).simple_addressing());
    }

    #[test]
    fn decodes_preset_single_register() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x11, 0x06, 0x01, 0x10, 0x01, 0x10];
        let command = CommandFactory::new(false).decode(&frame).unwrap();
        assert_eq!(command.function_code(), FunctionCode::PresetSingleRegister);
        assert_eq!(command.unit_id(), 0x11);
        match command {
            Command::PresetSingleRegister(cmd) => {
                assert_eq!(cmd.register_address(), 40_273);
                assert_eq!(cmd.register_value(), 0x0110);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn multiple_coils_need_a_byte_count() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x05, 0x0F, 0x00, 0x00, 0x00, 0x01];
        assert!(matches!(
            CommandFactory::default().decode(&frame),
            Err(DecodeError::InvalidCoilStatusCommand { .. })
        ));
    }

    #[test]
    fn zero_register_preset_is_accepted() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x05, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00];
        match CommandFactory::default().decode(&frame).unwrap() {
            Command::PresetMultipleRegisters(cmd) => {
                assert_eq!(cmd.register_length(), 0);
                assert!(cmd.register_values().is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn write_counts_are_wire_quantities() {
        let frame = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x09, 0x05, 0x0F, 0x00, 0x10, 0x00, 0x0A, 0x02, 0xCD,
            0x01,
        ];
        let Command::ForceMultipleCoils(cmd) = CommandFactory::default().decode(&frame).unwrap() else {
            panic!("expected force multiple coils");
        };
        let coils: u16 = cmd.coil_length();
        assert_eq!(coils, 10);
        assert_eq!(cmd.coil_statuses().len(), usize::from(coils));

        let frame = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x0B, 0x05, 0x10, 0x00, 0x10, 0x00, 0x02, 0x04, 0x00,
            0x0A, 0x01, 0x02,
        ];
        let Command::PresetMultipleRegisters(cmd) = CommandFactory::default().decode(&frame).unwrap() else {
            panic!("expected preset multiple registers");
        };
        let registers: u16 = cmd.register_length();
        assert_eq!(registers, 2);
        assert_eq!(cmd.register_values(), &[0x000A, 0x0102]);
    }

    #[test]
    fn errors_carry_the_frame() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x11, 0x14, 0x00, 0x00, 0x00, 0x03];
        let err = CommandFactory::default().decode(&frame).unwrap_err();
        assert_eq!(
            err,
            DecodeError::FunctionCodeNotImplemented {
                function_code: 0x14,
                frame: frame.to_vec(),
            }
        );
    }
}
