//! Minimal in-repo broker stand-in for the harness's own tests.
//!
//! This is *not* the broker under test and implements none of the
//! protocol catalog. It accepts connections, consumes request frames,
//! echoes each frame's correlation id back in a minimal response, and
//! exits cleanly on SIGINT — just enough real behavior for the
//! integration tests to run full scenarios against a real child process.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::Result;
use crate::protocol::LENGTH_PREFIX_SIZE;

/// Serve until SIGINT (Ctrl-C), then stop accepting and return.
///
/// In-flight connection tasks are dropped with the runtime when the
/// process exits; clients observe a clean close.
pub async fn run(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "mock broker listening");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("mock broker received interrupt, shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                tracing::debug!(%peer, "mock broker accepted connection");
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream).await {
                        tracing::debug!("mock broker connection ended: {}", e);
                    }
                });
            }
        }
    }
}

/// Read length-prefixed frames and answer each with an 8-byte response:
/// a uint32 length of 4 followed by the request's correlation id.
async fn serve_connection(mut stream: TcpStream) -> std::io::Result<()> {
    loop {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        if stream.read_exact(&mut prefix).await.is_err() {
            return Ok(()); // Peer closed between frames.
        }
        let len = u32::from_be_bytes(prefix) as usize;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await?;

        // correlation_id sits after api_key(2) + api_version(2).
        if payload.len() >= 8 {
            let mut response = Vec::with_capacity(8);
            response.extend_from_slice(&4u32.to_be_bytes());
            response.extend_from_slice(&payload[4..8]);
            stream.write_all(&response).await?;
            stream.flush().await?;
        }
    }
}
