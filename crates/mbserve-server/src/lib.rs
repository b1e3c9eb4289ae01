//! Async Modbus/TCP server driver.
//!
//! Frames arrive through a [`transport::Listener`], are decoded by
//! [`mbserve_core::CommandFactory`] and handed to the application on one
//! channel per command type. Resolving a command writes its response back on
//! the connection it came from.

#![forbid(unsafe_code)]

use thiserror::Error;

pub mod config;
pub mod server;
pub mod transport;

pub use config::ServerConfig;
pub use server::{ModbusTcpServer, ServerEvents};
pub use transport::memory::{memory_transport, MemoryClient, MemoryConnector, MemoryListener};
pub use transport::tcp::{MbapFrameReader, StreamFrameWriter, TcpTransport};
pub use transport::{Connection, FrameSink, FrameSource, Listener};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid mbap length {length} (frame limit {max_frame_len} bytes)")]
    InvalidFrameLength { length: u16, max_frame_len: usize },
    #[error("connection closed")]
    ConnectionClosed,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("server is already listening")]
    AlreadyListening,
    #[error("server is not listening")]
    NotListening,
}
