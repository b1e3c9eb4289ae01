use clap::Parser;
use mbserve_core::{ExceptionCode, ModbusCommand};
use mbserve_server::ModbusTcpServer;
use mbserve_tools::common::{fill_from_pattern, init_tracing, refuse_unencodable_read, ServerArgs};
use tracing::{error, info, warn};

const BIT_PATTERN: [bool; 4] = [true, false, true, false];
const REGISTER_PATTERN: [u16; 4] = [0xFFFF, 0x0000, 0xDEAD, 0xBEEF];

#[derive(Debug, Parser)]
#[command(
    name = "simple-server",
    about = "Modbus/TCP server answering every request with canned data"
)]
struct Args {
    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let mut server = ModbusTcpServer::new(args.server.config());
    let mut events = server.take_events().ok_or("server events already taken")?;
    server.listen(args.server.port).await?;

    loop {
        let resolved = tokio::select! {
            Some(mut cmd) = events.read_coil_status.recv() => {
                info!(address = cmd.coil_start_address(), count = cmd.number_of_coils(), "read coil status");
                let values = fill_from_pattern(&BIT_PATTERN, usize::from(cmd.number_of_coils()));
                let answered = cmd.success(&values);
                refuse_unencodable_read(&mut cmd, answered)
            }
            Some(mut cmd) = events.read_input_status.recv() => {
                info!(address = cmd.input_start_address(), count = cmd.number_of_inputs(), "read input status");
                let values = fill_from_pattern(&BIT_PATTERN, usize::from(cmd.number_of_inputs()));
                let answered = cmd.success(&values);
                refuse_unencodable_read(&mut cmd, answered)
            }
            Some(mut cmd) = events.read_holding_registers.recv() => {
                info!(address = cmd.register_start_address(), count = cmd.register_length(), "read holding registers");
                let values = fill_from_pattern(&REGISTER_PATTERN, usize::from(cmd.register_length()));
                let answered = cmd.success(&values);
                refuse_unencodable_read(&mut cmd, answered)
            }
            Some(mut cmd) = events.read_input_registers.recv() => {
                info!(address = cmd.register_start_address(), count = cmd.register_length(), "read input registers");
                let values = fill_from_pattern(&REGISTER_PATTERN, usize::from(cmd.register_length()));
                let answered = cmd.success(&values);
                refuse_unencodable_read(&mut cmd, answered)
            }
            Some(mut cmd) = events.preset_single_register.recv() => {
                info!(address = cmd.register_address(), value = cmd.register_value(), "preset single register");
                if cmd.is_resolved() { Ok(()) } else { cmd.success() }
            }
            Some(mut cmd) = events.preset_multiple_registers.recv() => {
                info!(
                    address = cmd.register_start_address(),
                    count = cmd.register_length(),
                    values = ?cmd.register_values(),
                    "preset multiple registers"
                );
                if cmd.is_resolved() { Ok(()) } else { cmd.success() }
            }
            Some(mut cmd) = events.force_single_coil.recv() => {
                info!(address = cmd.coil_address(), status = ?cmd.coil_status(), "force single coil");
                if cmd.is_resolved() { Ok(()) } else { cmd.success() }
            }
            Some(mut cmd) = events.force_multiple_coils.recv() => {
                info!(
                    address = cmd.coil_start_address(),
                    count = cmd.coil_length(),
                    values = ?cmd.coil_statuses(),
                    "force multiple coils"
                );
                if cmd.is_resolved() { Ok(()) } else { cmd.fail(ExceptionCode::IllegalDataAddress) }
            }
            Some(err) = events.command_errors.recv() => {
                warn!(error = %err, frame = ?err.frame(), "error when trying to decode a packet");
                Ok(())
            }
            Some(err) = events.server_errors.recv() => {
                error!(error = %err, "error from underlying transport");
                Ok(())
            }
            _ = tokio::signal::ctrl_c() => break,
        };
        if let Err(err) = resolved {
            warn!(error = %err, "could not resolve command");
        }
    }

    server.close().await?;
    Ok(())
}
