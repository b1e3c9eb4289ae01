//! Channel-backed transport for driving the server without sockets.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connection, FrameSink, FrameSource, Listener};
use crate::TransportError;

/// Returns a listener for the server and a connector for the test side.
pub fn memory_transport() -> (MemoryListener, MemoryConnector) {
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    (
        MemoryListener {
            incoming: incoming_rx,
        },
        MemoryConnector {
            incoming: incoming_tx,
            next_id: Arc::new(AtomicUsize::new(1)),
        },
    )
}

#[derive(Debug)]
pub struct MemoryListener {
    incoming: mpsc::UnboundedReceiver<Connection>,
}

#[async_trait]
impl Listener for MemoryListener {
    async fn accept(&mut self) -> Result<Connection, TransportError> {
        self.incoming.recv().await.ok_or(TransportError::ConnectionClosed)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryConnector {
    incoming: mpsc::UnboundedSender<Connection>,
    next_id: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Opens a new connection to whoever holds the matching [`MemoryListener`].
    pub fn connect(&self) -> Result<MemoryClient, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let peer = format!("memory-{id}");
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        self.incoming
            .send(Connection {
                peer: peer.clone(),
                source: Box::new(ChannelFrameSource {
                    requests: request_rx,
                }),
                sink: Box::new(ChannelFrameSink {
                    responses: response_tx,
                }),
            })
            .map_err(|_| TransportError::ConnectionClosed)?;

        Ok(MemoryClient {
            peer,
            requests: Some(request_tx),
            responses: response_rx,
        })
    }
}

/// Client end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryClient {
    peer: String,
    requests: Option<mpsc::UnboundedSender<Result<Vec<u8>, TransportError>>>,
    responses: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryClient {
    /// Name the server sees for this connection.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.push(Ok(frame.to_vec()))
    }

    /// Makes the server's frame source report `err` as if the link had failed.
    pub fn inject_error(&self, err: TransportError) -> Result<(), TransportError> {
        self.push(Err(err))
    }

    fn push(&self, item: Result<Vec<u8>, TransportError>) -> Result<(), TransportError> {
        self.requests
            .as_ref()
            .ok_or(TransportError::ConnectionClosed)?
            .send(item)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Next response frame, or `None` once the server side has dropped the connection.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.responses.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.responses.try_recv().ok()
    }

    /// Ends the request stream; responses already queued can still be received.
    pub fn disconnect(&mut self) {
        self.requests = None;
    }
}

struct ChannelFrameSource {
    requests: mpsc::UnboundedReceiver<Result<Vec<u8>, TransportError>>,
}

#[async_trait]
impl FrameSource for ChannelFrameSource {
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.requests.recv().await
    }
}

struct ChannelFrameSink {
    responses: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl FrameSink for ChannelFrameSink {
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.responses
            .send(frame.to_vec())
            .map_err(|_| TransportError::ConnectionClosed)
    }
}
