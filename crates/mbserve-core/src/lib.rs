//! Modbus/TCP server-side codec in pure Rust.
//!
//! `mbserve-core` decodes request frames into typed [`Command`]s, tracks the
//! one-shot resolution of each command, and encodes the matching response or
//! exception frame. It does no I/O and builds under `no_std` with `alloc`.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod addressing;
pub mod command;
pub mod encoding;
pub mod error;
pub mod factory;
pub mod frame;
pub mod pdu;

pub use addressing::{translate, AddressBase};
pub use command::{CoilStatus, Command, CompletionHook, ModbusCommand, Outcome};
pub use error::{DecodeError, EncodeError, ResolveError, UnexpectedEof};
pub use factory::CommandFactory;
pub use pdu::{ExceptionCode, FunctionCode};
