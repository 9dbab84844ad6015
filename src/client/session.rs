//! One emulated broker client connection.
//!
//! A [`ClientSession`] owns a single TCP socket: it sends pre-encoded
//! frames, attempts bounded reads, and can idle to emulate a long-lived
//! client. It knows nothing about scenario logic — the simulator decides
//! what to send and when.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{HarnessError, Result};
use crate::protocol::EncodedMessage;

/// Bounded response read buffer, matching the size a minimal real client
/// would use for a single `recv`.
pub const READ_BUFFER_SIZE: usize = 1024;

/// Lifecycle state of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connect in progress.
    Connecting,
    /// Socket established.
    Connected,
    /// Bounded read in progress.
    AwaitingResponse,
    /// Holding the connection open, no reads or writes.
    Idling,
    /// Cleanly closed.
    Closed,
    /// A send or receive failed.
    Failed,
}

/// Result of one bounded read attempt.
///
/// A broker that never responds to a request it does not support is
/// expected behavior, so a timeout is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes received within the timeout. Zero bytes means the broker
    /// closed the connection instead of answering.
    Data(Bytes),
    /// No data arrived within the read timeout.
    TimedOut,
}

/// A single client connection to the broker under test.
#[derive(Debug)]
pub struct ClientSession {
    id: usize,
    stream: TcpStream,
    state: SessionState,
}

impl ClientSession {
    /// Open a connection, bounded by `connect_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Connection`] if the peer refuses, the
    /// address is unreachable, or the timeout elapses.
    pub async fn connect(
        id: usize,
        addr: SocketAddr,
        connect_timeout: Duration,
    ) -> Result<Self> {
        match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                tracing::debug!(client = id, %addr, "connected");
                Ok(Self {
                    id,
                    stream,
                    state: SessionState::Connected,
                })
            }
            Ok(Err(e)) => Err(HarnessError::Connection(format!(
                "client {id}: connect to {addr} failed: {e}"
            ))),
            Err(_) => Err(HarnessError::Connection(format!(
                "client {id}: connect to {addr} timed out after {connect_timeout:?}"
            ))),
        }
    }

    /// Client identifier assigned by the simulator.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Write the full encoded message and flush.
    ///
    /// Partial writes are completed before returning; the frame is either
    /// fully on the wire or the session is marked failed.
    pub async fn send(&mut self, message: &EncodedMessage) -> Result<()> {
        let result = async {
            self.stream.write_all(message.as_bytes()).await?;
            self.stream.flush().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state = SessionState::Failed;
                Err(HarnessError::Connection(format!(
                    "client {}: send failed: {e}",
                    self.id
                )))
            }
        }
    }

    /// Attempt one bounded read of up to [`READ_BUFFER_SIZE`] bytes.
    ///
    /// Returns [`ReadOutcome::TimedOut`] if nothing arrives within
    /// `read_timeout`. EOF is reported as zero-byte [`ReadOutcome::Data`].
    pub async fn try_receive(&mut self, read_timeout: Duration) -> Result<ReadOutcome> {
        self.state = SessionState::AwaitingResponse;
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        match tokio::time::timeout(read_timeout, self.stream.read(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                self.state = SessionState::Connected;
                Ok(ReadOutcome::Data(Bytes::from(buf)))
            }
            Ok(Err(e)) => {
                self.state = SessionState::Failed;
                Err(HarnessError::Connection(format!(
                    "client {}: read failed: {e}",
                    self.id
                )))
            }
            Err(_) => {
                tracing::debug!(client = self.id, "no response within {:?}", read_timeout);
                self.state = SessionState::Connected;
                Ok(ReadOutcome::TimedOut)
            }
        }
    }

    /// Keep the connection idle for `duration`.
    ///
    /// No reads or writes happen during the hold; bytes the broker sends
    /// in this window stay in the socket buffer and are ignored. Used to
    /// make sure the connection is still open when a shutdown signal
    /// reaches the broker.
    pub async fn hold_open(&mut self, duration: Duration) {
        self.state = SessionState::Idling;
        tokio::time::sleep(duration).await;
        self.state = SessionState::Connected;
    }

    /// Close the connection.
    pub fn close(mut self) {
        self.state = SessionState::Closed;
        // Dropping the stream closes the socket.
    }
}
