//! Framed RESP connection to a Redis server.

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::resp::{RespError, RespValue};

/// Errors that can occur while exchanging frames with the server.
#[derive(Error, Debug, PartialEq)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("connection reset while a frame was partially received")]
    ConnectionReset,
    #[error("an earlier request never received its reply; reconnect")]
    OutOfSync,
    #[error("RESP parse error: {0}")]
    RespParseError(#[from] RespError),
}

impl From<std::io::Error> for ConnectionError {
    fn from(e: std::io::Error) -> Self {
        ConnectionError::IoError(e.to_string())
    }
}

/// A stream plus the bytes read from it that have not formed a frame yet.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    stream: S,
    buffer: BytesMut,
    // set while a request waits for its reply
    awaiting_reply: bool,
}

impl Connection<TcpStream> {
    pub async fn connect(address: &str) -> Result<Self, ConnectionError> {
        let stream = TcpStream::connect(address).await?;
        stream.set_nodelay(true)?;

        debug!(address, "connected to redis");

        Ok(Self::new(stream))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            awaiting_reply: false,
        }
    }

    pub async fn write_frame(&mut self, frame: &RespValue) -> Result<(), ConnectionError> {
        self.stream.write_all(&frame.encode()).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Reads until one whole frame is buffered and returns it.
    ///
    /// Bytes past the returned frame stay buffered for the next call.
    pub async fn read_frame(&mut self) -> Result<RespValue, ConnectionError> {
        loop {
            match RespValue::decode(&mut self.buffer) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(e) => {
                    // the rest of the buffer cannot be framed reliably
                    self.buffer.clear();
                    return Err(e.into());
                }
            }

            let number_of_bytes = self.stream.read_buf(&mut self.buffer).await?;

            if number_of_bytes == 0 {
                return if self.buffer.is_empty() {
                    Err(ConnectionError::ConnectionClosed)
                } else {
                    Err(ConnectionError::ConnectionReset)
                };
            }
        }
    }

    /// Sends `command` and reads its reply.
    ///
    /// A request that did not complete, because its future was dropped or
    /// its reply could not be read, leaves the connection out of sync: the
    /// stream may still hold that reply. Every later request then fails with
    /// [`ConnectionError::OutOfSync`] instead of returning a stale reply.
    pub async fn request(&mut self, command: &RespValue) -> Result<RespValue, ConnectionError> {
        if self.awaiting_reply {
            return Err(ConnectionError::OutOfSync);
        }

        self.awaiting_reply = true;
        self.write_frame(command).await?;
        let reply = self.read_frame().await?;
        self.awaiting_reply = false;

        Ok(reply)
    }
}
