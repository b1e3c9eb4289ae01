use mbserve_core::pdu::{pack_bits, unpack_bits};
use mbserve_core::{
    translate, AddressBase, Command, CommandFactory, DecodeError, ExceptionCode, FunctionCode,
    ModbusCommand,
};
use proptest::prelude::*;

fn read_request(transaction_id: u16, unit_id: u8, function: u8, start: u16, quantity: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(12);
    frame.extend_from_slice(&transaction_id.to_be_bytes());
    frame.extend_from_slice(&[0x00, 0x00, 0x00, 0x06, unit_id, function]);
    frame.extend_from_slice(&start.to_be_bytes());
    frame.extend_from_slice(&quantity.to_be_bytes());
    frame
}

/// A valid request for `function` whose address field is `offset`.
fn addressed_request(function: FunctionCode, offset: u16) -> Vec<u8> {
    match function {
        FunctionCode::ForceSingleCoil => read_request(1, 1, function.as_u8(), offset, 0xFF00),
        FunctionCode::ForceMultipleCoils => {
            let mut frame = read_request(1, 1, function.as_u8(), offset, 3);
            frame[5] = 0x08;
            frame.extend_from_slice(&[0x01, 0b0000_0101]);
            frame
        }
        FunctionCode::PresetMultipleRegisters => {
            let mut frame = read_request(1, 1, function.as_u8(), offset, 1);
            frame[5] = 0x09;
            frame.extend_from_slice(&[0x02, 0x12, 0x34]);
            frame
        }
        _ => read_request(1, 1, function.as_u8(), offset, 1),
    }
}

fn decoded_address(command: &Command) -> u32 {
    match command {
        Command::ReadCoilStatus(cmd) => cmd.coil_start_address(),
        Command::ReadInputStatus(cmd) => cmd.input_start_address(),
        Command::ReadHoldingRegisters(cmd) => cmd.register_start_address(),
        Command::ReadInputRegisters(cmd) => cmd.register_start_address(),
        Command::ForceSingleCoil(cmd) => cmd.coil_address(),
        Command::PresetSingleRegister(cmd) => cmd.register_address(),
        Command::ForceMultipleCoils(cmd) => cmd.coil_start_address(),
        Command::PresetMultipleRegisters(cmd) => cmd.register_start_address(),
    }
}

proptest! {
    #[test]
    fn random_frames_never_panic(data in proptest::collection::vec(any::<u8>(), 0..300)) {
        let _ = CommandFactory::default().decode(&data);
        let _ = CommandFactory::new(false).decode(&data);
    }

    #[test]
    fn short_frames_are_rejected(data in proptest::collection::vec(any::<u8>(), 0..12)) {
        let err = CommandFactory::default().decode(&data).unwrap_err();
        prop_assert!(matches!(err, DecodeError::PacketTooShort { .. }), "unexpected error: {err:?}");
        prop_assert_eq!(err.frame(), data.as_slice());
    }

    #[test]
    fn unsupported_function_codes_are_rejected(
        function in any::<u8>().prop_filter("supported", |f| FunctionCode::from_u8(*f).is_none()),
        tail in proptest::collection::vec(any::<u8>(), 4..20),
    ) {
        let mut frame = vec![0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, function];
        frame.extend_from_slice(&tail);
        let err = CommandFactory::default().decode(&frame).unwrap_err();
        prop_assert_eq!(
            err,
            DecodeError::FunctionCodeNotImplemented { function_code: function, frame: frame.clone() }
        );
    }

    #[test]
    fn translation_bases(offset in any::<u16>()) {
        let raw = u32::from(offset);
        prop_assert_eq!(translate(offset, AddressBase::HoldingRegister, true), raw);
        prop_assert_eq!(translate(offset, AddressBase::Coil, false), raw + 1);
        prop_assert_eq!(translate(offset, AddressBase::DiscreteInput, false), raw + 10_001);
        prop_assert_eq!(translate(offset, AddressBase::InputRegister, false), raw + 30_001);
        prop_assert_eq!(translate(offset, AddressBase::HoldingRegister, false), raw + 40_001);
    }

    #[test]
    fn decoded_addresses_follow_addressing_mode(offset in any::<u16>(), function_index in 0usize..8) {
        let function = FunctionCode::ALL[function_index];
        let request = addressed_request(function, offset);
        let raw = u32::from(offset);
        let base = match function {
            FunctionCode::ReadCoilStatus
            | FunctionCode::ForceSingleCoil
            | FunctionCode::ForceMultipleCoils => 1,
            FunctionCode::ReadInputStatus => 10_001,
            FunctionCode::ReadInputRegisters => 30_001,
            FunctionCode::ReadHoldingRegisters
            | FunctionCode::PresetSingleRegister
            | FunctionCode::PresetMultipleRegisters => 40_001,
        };

        let simple = CommandFactory::new(true).decode(&request).unwrap();
        prop_assert_eq!(simple.function_code(), function);
        prop_assert_eq!(decoded_address(&simple), raw);

        let modicon = CommandFactory::new(false).decode(&request).unwrap();
        prop_assert_eq!(decoded_address(&modicon), raw + base);
    }

    #[test]
    fn bit_packing_is_lsb_first(values in proptest::collection::vec(any::<bool>(), 0..2000)) {
        let mut packed = vec![0u8; values.len().div_ceil(8)];
        pack_bits(&values, &mut packed);
        for (index, value) in values.iter().enumerate() {
            prop_assert_eq!((packed[index / 8] >> (index % 8)) & 1 == 1, *value);
        }
        prop_assert_eq!(unpack_bits(&packed, values.len()), values);
    }

    #[test]
    fn register_reads_answer_with_header_and_values(
        transaction_id in any::<u16>(),
        unit_id in any::<u8>(),
        start in any::<u16>(),
        values in proptest::collection::vec(any::<u16>(), 0..=125),
    ) {
        let quantity = values.len() as u16;
        let request = read_request(transaction_id, unit_id, 0x03, start, quantity);
        let Command::ReadHoldingRegisters(mut cmd) = CommandFactory::default().decode(&request).unwrap() else {
            panic!("expected read holding registers");
        };
        cmd.success(&values).unwrap();

        let response = cmd.response_packet().unwrap();
        prop_assert_eq!(&response[..4], &request[..4]);
        prop_assert_eq!(u16::from_be_bytes([response[4], response[5]]) as usize, 3 + values.len() * 2);
        prop_assert_eq!(response[6], unit_id);
        prop_assert_eq!(response[7], 0x03);
        prop_assert_eq!(response[8] as usize, values.len() * 2);
        let decoded: Vec<u16> = response[9..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn exception_frames_mirror_request_header(
        transaction_id in any::<u16>(),
        unit_id in any::<u8>(),
        function_index in 0usize..8,
        start in any::<u16>(),
    ) {
        let function = FunctionCode::ALL[function_index];
        // Reads and single writes share the 12 byte layout; multi-writes need a payload.
        let mut request = read_request(transaction_id, unit_id, function.as_u8(), start, 0);
        if function == FunctionCode::ForceMultipleCoils || function == FunctionCode::PresetMultipleRegisters {
            request[5] = 0x07;
            request.push(0x00);
        }
        let mut cmd = CommandFactory::default().decode(&request).unwrap();
        cmd.fail(ExceptionCode::IllegalDataAddress).unwrap();

        let tid = transaction_id.to_be_bytes();
        prop_assert_eq!(
            cmd.response_packet().unwrap(),
            &[tid[0], tid[1], 0x00, 0x00, 0x00, 0x03, unit_id, function.as_u8() | 0x80, 0x02][..]
        );
    }
}
