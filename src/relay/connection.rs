//! Byte-stream connection to a relay.
//!
//! [`RelayConnection`] is the seam between the session and the wire: a duplex
//! stream with a write, a delimiter-bounded read and a non-blocking drain.
//! [`StreamConnection`] implements it for any tokio stream (TCP or serial) and
//! preserves every byte, NUL and other control bytes included, because binary
//! Fast Meter blocks travel inside the same stream as the ASCII prompts.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Instant};

use crate::error::RelayError;
use crate::relay::commands::find_subsequence;
use crate::relay::telnet::TelnetFilter;
use crate::util::logging::log_frame_hex;

/// Default quiet window that ends a drain.
pub const DEFAULT_DRAIN_WINDOW: Duration = Duration::from_millis(50);

const READ_CHUNK: usize = 1024;

/// Stream connection interface to a relay
#[async_trait]
pub trait RelayConnection: Send {
    /// Write all of `data` to the relay.
    async fn write(&mut self, data: &[u8]) -> Result<(), RelayError>;

    /// Write credentials. Implementations must not log `data`.
    async fn write_sensitive(&mut self, data: &[u8]) -> Result<(), RelayError> {
        self.write(data).await
    }

    /// Read up to and including `delimiter`.
    ///
    /// When the timeout elapses after some bytes arrived, those bytes are
    /// returned. When nothing arrived at all, fails with [`RelayError::Timeout`].
    async fn read_until(&mut self, delimiter: &[u8], timeout: Duration)
        -> Result<Vec<u8>, RelayError>;

    /// Return whatever is already available without waiting for more traffic.
    async fn drain_available(&mut self) -> Result<Vec<u8>, RelayError>;
}

#[async_trait]
impl<C: RelayConnection + ?Sized> RelayConnection for Box<C> {
    async fn write(&mut self, data: &[u8]) -> Result<(), RelayError> {
        (**self).write(data).await
    }

    async fn write_sensitive(&mut self, data: &[u8]) -> Result<(), RelayError> {
        (**self).write_sensitive(data).await
    }

    async fn read_until(
        &mut self,
        delimiter: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, RelayError> {
        (**self).read_until(delimiter, timeout).await
    }

    async fn drain_available(&mut self) -> Result<Vec<u8>, RelayError> {
        (**self).drain_available().await
    }
}

/// [`RelayConnection`] over any tokio byte stream.
pub struct StreamConnection<S> {
    stream: S,
    buffer: BytesMut,
    telnet: Option<TelnetFilter>,
    drain_window: Duration,
}

impl<S> StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a raw stream (serial port, plain TCP).
    pub fn new(stream: S) -> Self {
        StreamConnection {
            stream,
            buffer: BytesMut::with_capacity(4096),
            telnet: None,
            drain_window: DEFAULT_DRAIN_WINDOW,
        }
    }

    /// Wrap a stream that speaks telnet.
    pub fn telnet(stream: S) -> Self {
        StreamConnection {
            telnet: Some(TelnetFilter::default()),
            ..Self::new(stream)
        }
    }

    pub fn with_drain_window(mut self, window: Duration) -> Self {
        self.drain_window = window;
        self
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Perform one read from the stream into the buffer.
    async fn fill(&mut self) -> Result<usize, RelayError> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(RelayError::Transport("connection closed by relay".into()));
        }

        let before = self.buffer.len();
        match self.telnet.as_mut() {
            Some(filter) => {
                let replies = filter.feed(&chunk[..n], &mut self.buffer);
                if !replies.is_empty() {
                    self.stream.write_all(&replies).await?;
                }
            }
            None => self.buffer.extend_from_slice(&chunk[..n]),
        }
        Ok(self.buffer.len() - before)
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), RelayError> {
        match self.telnet {
            Some(_) => self.stream.write_all(&TelnetFilter::escape(data)).await?,
            None => self.stream.write_all(data).await?,
        }
        self.stream.flush().await?;
        Ok(())
    }

    fn take_buffer(&mut self, len: usize) -> Vec<u8> {
        let data = self.buffer.split_to(len).to_vec();
        log_frame_hex("Rx", &data);
        data
    }
}

#[async_trait]
impl<S> RelayConnection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, data: &[u8]) -> Result<(), RelayError> {
        log_frame_hex("Tx", data);
        self.send(data).await
    }

    async fn write_sensitive(&mut self, data: &[u8]) -> Result<(), RelayError> {
        log::debug!(target: "fastmeter::wire", "Tx: <{} bytes redacted>", data.len());
        self.send(data).await
    }

    async fn read_until(
        &mut self,
        delimiter: &[u8],
        read_timeout: Duration,
    ) -> Result<Vec<u8>, RelayError> {
        let deadline = Instant::now() + read_timeout;
        loop {
            if let Some(pos) = find_subsequence(&self.buffer, delimiter) {
                return Ok(self.take_buffer(pos + delimiter.len()));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, self.fill()).await {
                Ok(result) => {
                    result?;
                }
                Err(_) => break,
            }
        }

        if self.buffer.is_empty() {
            Err(RelayError::Timeout(read_timeout))
        } else {
            let len = self.buffer.len();
            Ok(self.take_buffer(len))
        }
    }

    async fn drain_available(&mut self) -> Result<Vec<u8>, RelayError> {
        // Keep reading while the relay is still talking; stop after one quiet window.
        while let Ok(result) = timeout(self.drain_window, self.fill()).await {
            result?;
        }
        let len = self.buffer.len();
        Ok(self.take_buffer(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_read_until_splits_at_delimiter() {
        let (client, mut relay) = duplex(256);
        let mut conn = StreamConnection::new(client);

        relay.write_all(b"Level 1\r\n=>\r\n=>").await.unwrap();
        let first = conn
            .read_until(b"\r\n=", Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(first, b"Level 1\r\n=");

        let rest = conn.drain_available().await.unwrap();
        assert_eq!(rest, b">\r\n=>");
    }

    #[tokio::test]
    async fn test_read_until_returns_partial_on_timeout() {
        let (client, mut relay) = duplex(256);
        let mut conn = StreamConnection::new(client);

        relay.write_all(&[0xA5, 0xD1, 0x00, 0x0D]).await.unwrap();
        let partial = conn
            .read_until(b"\r\n=", Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(partial, vec![0xA5, 0xD1, 0x00, 0x0D]);
    }

    #[tokio::test]
    async fn test_read_until_times_out_when_silent() {
        let (client, _relay) = duplex(256);
        let mut conn = StreamConnection::new(client);

        let result = conn.read_until(b"\r\n=", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(RelayError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_closed_stream_is_transport_error() {
        let (client, relay) = duplex(256);
        drop(relay);
        let mut conn = StreamConnection::new(client);

        let result = conn.read_until(b"\r\n=", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(RelayError::Transport(_))));
    }

    #[tokio::test]
    async fn test_write_preserves_control_bytes() {
        let (client, mut relay) = duplex(256);
        let mut conn = StreamConnection::new(client);

        conn.write(&[0xA5, 0xD1, 0x00, 0x0D, 0x0A]).await.unwrap();
        let mut received = [0u8; 5];
        relay.read_exact(&mut received).await.unwrap();
        assert_eq!(received, [0xA5, 0xD1, 0x00, 0x0D, 0x0A]);
    }
}
