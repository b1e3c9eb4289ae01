use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mbserve_core::command::{
    ForceMultipleCoilsCommand, ForceSingleCoilCommand, PresetMultipleRegistersCommand,
    PresetSingleRegisterCommand, ReadCoilStatusCommand, ReadHoldingRegistersCommand,
    ReadInputRegistersCommand, ReadInputStatusCommand,
};
use mbserve_core::{Command, CommandFactory, DecodeError, ModbusCommand};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::transport::tcp::TcpTransport;
use crate::transport::{Connection, Listener};
use crate::{ServerError, TransportError};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Receiving ends of the server's event channels.
///
/// Each decoded request arrives on the channel for its type and must be
/// resolved with `success` or `fail` for the client to get an answer.
#[derive(Debug)]
pub struct ServerEvents {
    pub read_coil_status: UnboundedReceiver<ReadCoilStatusCommand>,
    pub read_input_status: UnboundedReceiver<ReadInputStatusCommand>,
    pub read_holding_registers: UnboundedReceiver<ReadHoldingRegistersCommand>,
    pub read_input_registers: UnboundedReceiver<ReadInputRegistersCommand>,
    pub force_single_coil: UnboundedReceiver<ForceSingleCoilCommand>,
    pub preset_single_register: UnboundedReceiver<PresetSingleRegisterCommand>,
    pub force_multiple_coils: UnboundedReceiver<ForceMultipleCoilsCommand>,
    pub preset_multiple_registers: UnboundedReceiver<PresetMultipleRegistersCommand>,
    /// Frames that could not be decoded. No response is sent for these.
    pub command_errors: UnboundedReceiver<DecodeError>,
    pub server_errors: UnboundedReceiver<TransportError>,
}

#[derive(Debug)]
struct EventSenders {
    read_coil_status: UnboundedSender<ReadCoilStatusCommand>,
    read_input_status: UnboundedSender<ReadInputStatusCommand>,
    read_holding_registers: UnboundedSender<ReadHoldingRegistersCommand>,
    read_input_registers: UnboundedSender<ReadInputRegistersCommand>,
    force_single_coil: UnboundedSender<ForceSingleCoilCommand>,
    preset_single_register: UnboundedSender<PresetSingleRegisterCommand>,
    force_multiple_coils: UnboundedSender<ForceMultipleCoilsCommand>,
    preset_multiple_registers: UnboundedSender<PresetMultipleRegistersCommand>,
    command_errors: UnboundedSender<DecodeError>,
    server_errors: UnboundedSender<TransportError>,
}

fn event_channels() -> (EventSenders, ServerEvents) {
    let (read_coil_status_tx, read_coil_status) = mpsc::unbounded_channel();
    let (read_input_status_tx, read_input_status) = mpsc::unbounded_channel();
    let (read_holding_registers_tx, read_holding_registers) = mpsc::unbounded_channel();
    let (read_input_registers_tx, read_input_registers) = mpsc::unbounded_channel();
    let (force_single_coil_tx, force_single_coil) = mpsc::unbounded_channel();
    let (preset_single_register_tx, preset_single_register) = mpsc::unbounded_channel();
    let (force_multiple_coils_tx, force_multiple_coils) = mpsc::unbounded_channel();
    let (preset_multiple_registers_tx, preset_multiple_registers) = mpsc::unbounded_channel();
    let (command_errors_tx, command_errors) = mpsc::unbounded_channel();
    let (server_errors_tx, server_errors) = mpsc::unbounded_channel();

    (
        EventSenders {
            read_coil_status: read_coil_status_tx,
            read_input_status: read_input_status_tx,
            read_holding_registers: read_holding_registers_tx,
            read_input_registers: read_input_registers_tx,
            force_single_coil: force_single_coil_tx,
            preset_single_register: preset_single_register_tx,
            force_multiple_coils: force_multiple_coils_tx,
            preset_multiple_registers: preset_multiple_registers_tx,
            command_errors: command_errors_tx,
            server_errors: server_errors_tx,
        },
        ServerEvents {
            read_coil_status,
            read_input_status,
            read_holding_registers,
            read_input_registers,
            force_single_coil,
            preset_single_register,
            force_multiple_coils,
            preset_multiple_registers,
            command_errors,
            server_errors,
        },
    )
}

impl EventSenders {
    /// Hands the command to its channel. Returns `false` if nobody is listening.
    fn dispatch(&self, command: Command) -> bool {
        match command {
            Command::ReadCoilStatus(cmd) => self.read_coil_status.send(cmd).is_ok(),
            Command::ReadInputStatus(cmd) => self.read_input_status.send(cmd).is_ok(),
            Command::ReadHoldingRegisters(cmd) => self.read_holding_registers.send(cmd).is_ok(),
            Command::ReadInputRegisters(cmd) => self.read_input_registers.send(cmd).is_ok(),
            Command::ForceSingleCoil(cmd) => self.force_single_coil.send(cmd).is_ok(),
            Command::PresetSingleRegister(cmd) => self.preset_single_register.send(cmd).is_ok(),
            Command::ForceMultipleCoils(cmd) => self.force_multiple_coils.send(cmd).is_ok(),
            Command::PresetMultipleRegisters(cmd) => {
                self.preset_multiple_registers.send(cmd).is_ok()
            }
        }
    }

    fn report_transport_error(&self, err: TransportError) {
        if let Err(unsent) = self.server_errors.send(err) {
            warn!(error = %unsent.0, "no receiver for server errors");
        }
    }
}

/// State shared by the accept loop and every connection task.
#[derive(Debug)]
struct Shared {
    factory: CommandFactory,
    auto_respond_success: bool,
    events: EventSenders,
}

impl Shared {
    fn handle_frame(&self, peer: &str, frame: Vec<u8>, responses: &UnboundedSender<Vec<u8>>) {
        let frame_len = frame.len();
        let mut command = match self.factory.decode(&frame) {
            Ok(command) => command,
            Err(err) => {
                debug!(%peer, frame_len, error = %err, "discarding undecodable frame");
                if let Err(unsent) = self.events.command_errors.send(err) {
                    warn!(%peer, error = %unsent.0, "no receiver for command errors");
                }
                return;
            }
        };

        let transaction_id = command.transaction_id();
        let unit_id = command.unit_id();
        let function = command.function_code().as_u8();
        debug!(%peer, transaction_id, unit_id, function, frame_len, "received modbus tcp request");

        let responses = responses.clone();
        let hook_peer = peer.to_owned();
        command.on_complete(move |outcome, response| {
            debug!(
                peer = %hook_peer,
                transaction_id,
                unit_id,
                function,
                ?outcome,
                frame_len = response.len(),
                "queueing modbus tcp response"
            );
            if responses.send(response.to_vec()).is_err() {
                warn!(peer = %hook_peer, transaction_id, "connection gone, dropping response");
            }
        });

        if self.auto_respond_success {
            if let Some(Err(err)) = command.success_without_data() {
                warn!(%peer, transaction_id, function, error = %err, "automatic response failed");
            }
        }

        if !self.events.dispatch(command) {
            warn!(%peer, transaction_id, unit_id, function, "no receiver for command, discarding");
        }
    }
}

/// Modbus/TCP server that turns frames into commands for the application.
///
/// The server stores no register or coil data. It decodes requests, hands
/// them out through [`ServerEvents`], and writes each response once the
/// application resolves the command.
#[derive(Debug)]
pub struct ModbusTcpServer {
    config: ServerConfig,
    shared: Arc<Shared>,
    events: Option<ServerEvents>,
    accept_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl ModbusTcpServer {
    pub fn new(config: ServerConfig) -> Self {
        let (senders, events) = event_channels();
        Self {
            config,
            shared: Arc::new(Shared {
                factory: CommandFactory::new(config.simple_addressing),
                auto_respond_success: config.auto_respond_success,
                events: senders,
            }),
            events: Some(events),
            accept_task: None,
            local_addr: None,
        }
    }

    pub fn config(&self) -> ServerConfig {
        self.config
    }

    /// Hands out the event receivers. Only the first call returns `Some`.
    pub fn take_events(&mut self) -> Option<ServerEvents> {
        self.events.take()
    }

    /// Binds `bind_host:port` and starts accepting connections. Port 0 picks a free port.
    pub async fn listen(&mut self, port: u16) -> Result<&mut Self, ServerError> {
        if self.is_listening() {
            return Err(ServerError::AlreadyListening);
        }
        let transport =
            TcpTransport::bind((self.config.bind_host, port), self.config.max_frame_len).await?;
        let local_addr = transport.local_addr()?;
        info!(%local_addr, "modbus tcp server listening");
        self.local_addr = Some(local_addr);
        self.serve(transport)
    }

    /// Starts accepting connections from any [`Listener`]. Must be called inside a tokio runtime.
    pub fn serve<L: Listener>(&mut self, listener: L) -> Result<&mut Self, ServerError> {
        if self.is_listening() {
            return Err(ServerError::AlreadyListening);
        }
        let shared = Arc::clone(&self.shared);
        self.accept_task = Some(tokio::spawn(accept_loop(listener, shared)));
        Ok(self)
    }

    /// Address bound by [`listen`](Self::listen), if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_listening(&self) -> bool {
        self.accept_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops accepting and releases the listener.
    ///
    /// Connections already accepted keep running until their peer disconnects.
    pub async fn close(&mut self) -> Result<&mut Self, ServerError> {
        let task = self.accept_task.take().ok_or(ServerError::NotListening)?;
        task.abort();
        // The listener is dropped together with the aborted task.
        if let Err(err) = task.await {
            if !err.is_cancelled() {
                warn!(error = %err, "accept loop ended abnormally");
            }
        }
        if let Some(local_addr) = self.local_addr.take() {
            info!(%local_addr, "modbus tcp server closed");
        }
        Ok(self)
    }
}

impl Drop for ModbusTcpServer {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

async fn accept_loop<L: Listener>(mut listener: L, shared: Arc<Shared>) {
    loop {
        match listener.accept().await {
            Ok(connection) => {
                debug!(peer = %connection.peer, "accepted modbus tcp connection");
                tokio::spawn(handle_connection(connection, Arc::clone(&shared)));
            }
            Err(TransportError::ConnectionClosed) => {
                debug!("listener closed, no further connections");
                return;
            }
            Err(err) => {
                warn!(error = %err, "failed to accept connection");
                shared.events.report_transport_error(err);
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

async fn handle_connection(connection: Connection, shared: Arc<Shared>) {
    let Connection {
        peer,
        mut source,
        mut sink,
    } = connection;

    // Responses are written in the order commands resolve, not the order they arrived.
    let (response_tx, mut response_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer_peer = peer.clone();
    let writer_shared = Arc::clone(&shared);
    tokio::spawn(async move {
        while let Some(frame) = response_rx.recv().await {
            if let Err(err) = sink.send_frame(&frame).await {
                warn!(peer = %writer_peer, error = %err, "failed to write modbus tcp response");
                writer_shared.events.report_transport_error(err);
                return;
            }
        }
    });

    while let Some(next) = source.next_frame().await {
        match next {
            Ok(frame) => shared.handle_frame(&peer, frame, &response_tx),
            Err(err) => {
                warn!(%peer, error = %err, "modbus tcp connection ended with error");
                shared.events.report_transport_error(err);
                break;
            }
        }
    }
    debug!(%peer, "modbus tcp connection closed");
}
