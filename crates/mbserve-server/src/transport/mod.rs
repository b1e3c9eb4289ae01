//! Where frames come from and where responses go.
//!
//! A [`Listener`] yields [`Connection`]s. Each connection is a
//! [`FrameSource`] of complete request frames and a [`FrameSink`] for
//! response frames, so the driver never sees partial reads.

use async_trait::async_trait;

use crate::TransportError;

pub mod memory;
pub mod tcp;

#[async_trait]
pub trait FrameSource: Send {
    /// Next complete frame, or `None` once the peer has closed the connection.
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>>;
}

#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}

#[async_trait]
pub trait Listener: Send + 'static {
    /// Waits for the next connection. [`TransportError::ConnectionClosed`] means
    /// the listener itself is gone and no further connections will arrive.
    async fn accept(&mut self) -> Result<Connection, TransportError>;
}

pub struct Connection {
    pub peer: String,
    pub source: Box<dyn FrameSource>,
    pub sink: Box<dyn FrameSink>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("peer", &self.peer).finish_non_exhaustive()
    }
}
