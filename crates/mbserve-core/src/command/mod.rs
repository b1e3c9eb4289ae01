//! Decoded commands and their one-shot resolution.
//!
//! A command starts out unresolved. Exactly one call to `success` or `fail`
//! stores the response frame and fires the completion hooks; every later call
//! is rejected with [`ResolveError::AlreadyResolved`] and changes nothing.

mod read;
mod write;

pub use read::{
    ReadCoilStatusCommand, ReadHoldingRegistersCommand, ReadInputRegistersCommand,
    ReadInputStatusCommand,
};
pub use write::{
    CoilStatus, ForceMultipleCoilsCommand, ForceSingleCoilCommand, PresetMultipleRegistersCommand,
    PresetSingleRegisterCommand,
};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::pdu::{encode_exception_frame, ExceptionCode, FunctionCode};
use crate::ResolveError;

/// How a command was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(ExceptionCode),
}

/// Called once with the outcome and the encoded response frame.
pub type CompletionHook = Box<dyn FnOnce(Outcome, &[u8]) + Send + 'static>;

/// Request frame, resolution slot and pending completion hooks shared by every command.
pub struct CommandState {
    request: Vec<u8>,
    resolution: Option<(Outcome, Vec<u8>)>,
    hooks: Vec<CompletionHook>,
}

impl CommandState {
    /// `request` must already be known to hold at least a full MBAP header and function code.
    pub(crate) fn new(request: Vec<u8>) -> Self {
        Self {
            request,
            resolution: None,
            hooks: Vec::new(),
        }
    }

    pub fn request(&self) -> &[u8] {
        &self.request
    }

    pub fn unit_id(&self) -> u8 {
        self.request[6]
    }

    pub fn transaction_id(&self) -> u16 {
        u16::from_be_bytes([self.request[0], self.request[1]])
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.resolution.as_ref().map(|(outcome, _)| *outcome)
    }

    pub fn response(&self) -> Result<&[u8], ResolveError> {
        self.resolution
            .as_ref()
            .map(|(_, response)| response.as_slice())
            .ok_or(ResolveError::ResponseNotReady)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Registers a hook; if the command is already resolved it runs immediately.
    pub fn push_hook(&mut self, hook: CompletionHook) {
        match &self.resolution {
            Some((outcome, response)) => hook(*outcome, response),
            None => self.hooks.push(hook),
        }
    }

    pub(crate) fn ensure_unresolved(&self) -> Result<(), ResolveError> {
        if self.is_resolved() {
            return Err(ResolveError::AlreadyResolved);
        }
        Ok(())
    }

    pub(crate) fn resolve(&mut self, outcome: Outcome, response: Vec<u8>) -> Result<(), ResolveError> {
        self.ensure_unresolved()?;
        let hooks = core::mem::take(&mut self.hooks);
        let (outcome, response) = &*self.resolution.insert((outcome, response));
        for hook in hooks {
            hook(*outcome, response);
        }
        Ok(())
    }

    pub(crate) fn fail(&mut self, exception: ExceptionCode) -> Result<(), ResolveError> {
        self.ensure_unresolved()?;
        let frame = encode_exception_frame(&self.request, exception)?;
        self.resolve(Outcome::Failure(exception), frame)
    }
}

impl fmt::Debug for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandState")
            .field("request", &self.request)
            .field("resolution", &self.resolution)
            .field("pending_hooks", &self.hooks.len())
            .finish()
    }
}

pub(crate) fn check_data_len(expected: u16, actual: usize) -> Result<(), ResolveError> {
    let expected = usize::from(expected);
    if expected != actual {
        return Err(ResolveError::DataLengthMismatch { expected, actual });
    }
    Ok(())
}

/// Surface shared by all commands. Variant-specific `success` methods are inherent.
pub trait ModbusCommand {
    fn state(&self) -> &CommandState;

    fn state_mut(&mut self) -> &mut CommandState;

    fn function_code(&self) -> FunctionCode;

    fn unit_id(&self) -> u8 {
        self.state().unit_id()
    }

    fn transaction_id(&self) -> u16 {
        self.state().transaction_id()
    }

    fn request_packet(&self) -> &[u8] {
        self.state().request()
    }

    /// Fails with [`ResolveError::ResponseNotReady`] until the command is resolved.
    fn response_packet(&self) -> Result<&[u8], ResolveError> {
        self.state().response()
    }

    fn is_resolved(&self) -> bool {
        self.state().is_resolved()
    }

    /// Answers the request with a Modbus exception.
    fn fail(&mut self, exception: ExceptionCode) -> Result<(), ResolveError> {
        self.state_mut().fail(exception)
    }

    fn on_complete<F>(&mut self, hook: F)
    where
        F: FnOnce(Outcome, &[u8]) + Send + 'static,
        Self: Sized,
    {
        self.state_mut().push_hook(Box::new(hook));
    }

    fn on_success<F>(&mut self, hook: F)
    where
        F: FnOnce(&[u8]) + Send + 'static,
        Self: Sized,
    {
        self.on_complete(move |outcome, response| {
            if outcome == Outcome::Success {
                hook(response);
            }
        });
    }

    fn on_failure<F>(&mut self, hook: F)
    where
        F: FnOnce(ExceptionCode, &[u8]) + Send + 'static,
        Self: Sized,
    {
        self.on_complete(move |outcome, response| {
            if let Outcome::Failure(exception) = outcome {
                hook(exception, response);
            }
        });
    }
}

macro_rules! impl_modbus_command {
    ($ty:ty, $function:expr) => {
        impl $crate::command::ModbusCommand for $ty {
            fn state(&self) -> &$crate::command::CommandState {
                &self.state
            }

            fn state_mut(&mut self) -> &mut $crate::command::CommandState {
                &mut self.state
            }

            fn function_code(&self) -> $crate::pdu::FunctionCode {
                $function
            }
        }
    };
}
pub(crate) use impl_modbus_command;

/// One decoded request, tagged by function.
#[derive(Debug)]
pub enum Command {
    ReadCoilStatus(ReadCoilStatusCommand),
    ReadInputStatus(ReadInputStatusCommand),
    ReadHoldingRegisters(ReadHoldingRegistersCommand),
    ReadInputRegisters(ReadInputRegistersCommand),
    ForceSingleCoil(ForceSingleCoilCommand),
    PresetSingleRegister(PresetSingleRegisterCommand),
    ForceMultipleCoils(ForceMultipleCoilsCommand),
    PresetMultipleRegisters(PresetMultipleRegistersCommand),
}

impl Command {
    /// Resolves a write command with its echo response. Read commands need data
    /// and are left untouched.
    pub fn success_without_data(&mut self) -> Option<Result<(), ResolveError>> {
        match self {
            Self::ForceSingleCoil(cmd) => Some(cmd.success()),
            Self::PresetSingleRegister(cmd) => Some(cmd.success()),
            Self::ForceMultipleCoils(cmd) => Some(cmd.success()),
            Self::PresetMultipleRegisters(cmd) => Some(cmd.success()),
            Self::ReadCoilStatus(_)
            | Self::ReadInputStatus(_)
            | Self::ReadHoldingRegisters(_)
            | Self::ReadInputRegisters(_) => None,
        }
    }
}

impl ModbusCommand for Command {
    fn state(&self) -> &CommandState {
        match self {
            Self::ReadCoilStatus(cmd) => cmd.state(),
            Self::ReadInputStatus(cmd) => cmd.state(),
            Self::ReadHoldingRegisters(cmd) => cmd.state(),
            Self::ReadInputRegisters(cmd) => cmd.state(),
            Self::ForceSingleCoil(cmd) => cmd.state(),
            Self::PresetSingleRegister(cmd) => cmd.state(),
            Self::ForceMultipleCoils(cmd) => cmd.state(),
            Self::PresetMultipleRegisters(cmd) => cmd.state(),
        }
    }

    fn state_mut(&mut self) -> &mut CommandState {
        match self {
            Self::ReadCoilStatus(cmd) => cmd.state_mut(),
            Self::ReadInputStatus(cmd) => cmd.state_mut(),
            Self::ReadHoldingRegisters(cmd) => cmd.state_mut(),
            Self::ReadInputRegisters(cmd) => cmd.state_mut(),
            Self::ForceSingleCoil(cmd) => cmd.state_mut(),
            Self::PresetSingleRegister(cmd) => cmd.state_mut(),
            Self::ForceMultipleCoils(cmd) => cmd.state_mut(),
            Self::PresetMultipleRegisters(cmd) => cmd.state_mut(),
        }
    }

    fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoilStatus(_) => FunctionCode::ReadCoilStatus,
            Self::ReadInputStatus(_) => FunctionCode::ReadInputStatus,
            Self::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Self::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Self::ForceSingleCoil(_) => FunctionCode::ForceSingleCoil,
            Self::PresetSingleRegister(_) => FunctionCode::PresetSingleRegister,
            Self::ForceMultipleCoils(_) => FunctionCode::ForceMultipleCoils,
            Self::PresetMultipleRegisters(_) => FunctionCode::PresetMultipleRegisters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandState, Outcome};
    use crate::pdu::ExceptionCode;
    use crate::ResolveError;
    use alloc::boxed::Box;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicUsize, Ordering};

    const REQUEST: [u8; 12] = [0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x03, 0x06, 0x00, 0x01, 0x00, 0x02];

    #[test]
    fn response_not_ready_until_resolved() {
        let state = CommandState::new(REQUEST.to_vec());
        assert_eq!(state.response().unwrap_err(), ResolveError::ResponseNotReady);
        assert_eq!(state.outcome(), None);
        assert_eq!(state.unit_id(), 3);
        assert_eq!(state.transaction_id(), 7);
    }

    #[test]
    fn hooks_fire_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut state = CommandState::new(REQUEST.to_vec());
        let counter = Arc::clone(&calls);
        state.push_hook(Box::new(move |outcome: Outcome, response: &[u8]| {
            assert_eq!(outcome, Outcome::Failure(ExceptionCode::IllegalDataAddress));
            assert_eq!(response, &[0x00, 0x07, 0x00, 0x00, 0x00, 0x03, 0x03, 0x86, 0x02]);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        state.fail(ExceptionCode::IllegalDataAddress).unwrap();
        assert_eq!(
            state.fail(ExceptionCode::ServerDeviceBusy).unwrap_err(),
            ResolveError::AlreadyResolved
        );
        assert_eq!(
            state.resolve(Outcome::Success, Vec::new()).unwrap_err(),
            ResolveError::AlreadyResolved
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            state.response().unwrap(),
            &[0x00, 0x07, 0x00, 0x00, 0x00, 0x03, 0x03, 0x86, 0x02]
        );
    }

    #[test]
    fn late_hook_runs_immediately() {
        let mut state = CommandState::new(REQUEST.to_vec());
        state.resolve(Outcome::Success, vec![0xAA]).unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        state.push_hook(Box::new(move |_: Outcome, response: &[u8]| {
            counter.store(response.len(), Ordering::SeqCst);
        }));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
