use std::net::SocketAddr;

use async_trait::async_trait;
use mbserve_core::encoding::Reader;
use mbserve_core::frame::tcp::{MbapHeader, MBAP_HEADER_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::trace;

use super::{Connection, FrameSink, FrameSource, Listener};
use crate::TransportError;

/// Smallest usable MBAP length: unit id plus function code.
const MIN_MBAP_LENGTH: u16 = 2;

/// Accepts Modbus/TCP clients on a tokio [`TcpListener`].
#[derive(Debug)]
pub struct TcpTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl TcpTransport {
    pub async fn bind<A: ToSocketAddrs>(addr: A, max_frame_len: usize) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, max_frame_len))
    }

    pub fn from_listener(listener: TcpListener, max_frame_len: usize) -> Self {
        Self {
            listener,
            max_frame_len,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl Listener for TcpTransport {
    async fn accept(&mut self) -> Result<Connection, TransportError> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();
        Ok(Connection {
            peer: peer.to_string(),
            source: Box::new(MbapFrameReader::new(read, self.max_frame_len)),
            sink: Box::new(StreamFrameWriter::new(write)),
        })
    }
}

/// Reassembles MBAP frames from a byte stream.
///
/// TCP may split one frame across reads or pack several frames into one read;
/// the MBAP length field is the only boundary marker.
#[derive(Debug)]
pub struct MbapFrameReader<R> {
    inner: R,
    max_frame_len: usize,
}

impl<R> MbapFrameReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner,
            max_frame_len,
        }
    }

    /// Reads one full frame. `Ok(None)` means the stream ended on a frame boundary.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut head = [0u8; MBAP_HEADER_LEN];
        if self.inner.read(&mut head[..1]).await? == 0 {
            return Ok(None);
        }
        read_exact_or_connection_closed(&mut self.inner, &mut head[1..]).await?;

        let header = MbapHeader::decode(&mut Reader::new(&head))
            .map_err(|_| TransportError::ConnectionClosed)?;
        let frame_len = header.frame_len();
        if header.length < MIN_MBAP_LENGTH || frame_len > self.max_frame_len {
            return Err(TransportError::InvalidFrameLength {
                length: header.length,
                max_frame_len: self.max_frame_len,
            });
        }

        let mut frame = vec![0u8; frame_len];
        frame[..MBAP_HEADER_LEN].copy_from_slice(&head);
        read_exact_or_connection_closed(&mut self.inner, &mut frame[MBAP_HEADER_LEN..]).await?;
        trace!(
            transaction_id = header.transaction_id,
            unit_id = header.unit_id,
            frame_len,
            bytes = ?frame,
            "reassembled mbap frame"
        );
        Ok(Some(frame))
    }
}

async fn read_exact_or_connection_closed<R>(stream: &mut R, buf: &mut [u8]) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
{
    if let Err(err) = stream.read_exact(buf).await {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(TransportError::ConnectionClosed);
        }
        return Err(TransportError::Io(err));
    }
    Ok(())
}

#[async_trait]
impl<R> FrameSource for MbapFrameReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.read_frame().await.transpose()
    }
}

/// Writes whole response frames to a byte stream.
#[derive(Debug)]
pub struct StreamFrameWriter<W> {
    inner: W,
}

impl<W> StreamFrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<W> FrameSink for StreamFrameWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        trace!(frame_len = frame.len(), bytes = ?frame, "writing response frame");
        self.inner.write_all(frame).await?;
        self.inner.flush().await?;
        Ok(())
    }
}
