//! Concurrent client load against the broker.
//!
//! The [`ClientSimulator`] spawns one tokio task per emulated client,
//! staggering connection starts by a fixed delay so the broker is never
//! hit with simultaneous new connections. Each task runs its session to
//! completion and reports a [`SessionOutcome`]; one session's failure
//! never aborts the others, and the final join is bounded so a stuck
//! task cannot hang the whole run.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use super::session::{ClientSession, ReadOutcome};
use crate::protocol::EncodedMessage;

/// Configuration for one simulator run.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Broker address.
    pub addr: SocketAddr,
    /// Number of concurrent clients.
    pub clients: usize,
    /// Fixed delay between consecutive connection starts.
    pub stagger: Duration,
    /// Bound on each connect attempt.
    pub connect_timeout: Duration,
    /// Bound on each response read.
    pub read_timeout: Duration,
    /// If set, each client idles this long after its requests, emulating
    /// a long-lived connection that is still open when a shutdown signal
    /// arrives.
    pub hold_duration: Option<Duration>,
    /// Bound on joining each client task at the end of the run.
    pub join_timeout: Duration,
}

impl SimulatorConfig {
    /// Single client, no hold — the basic request/response shape.
    pub fn single(addr: SocketAddr) -> Self {
        Self {
            addr,
            clients: 1,
            stagger: Duration::ZERO,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            hold_duration: None,
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// What one bounded read produced, reduced to what the harness verifies:
/// byte length only. Response payloads are never parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseOutcome {
    /// Bytes arrived within the timeout (zero means the broker closed
    /// the connection instead of answering).
    Received {
        /// Number of bytes read.
        bytes: usize,
    },
    /// Nothing arrived within the read timeout.
    TimedOut,
}

impl From<&ReadOutcome> for ResponseOutcome {
    fn from(outcome: &ReadOutcome) -> Self {
        match outcome {
            ReadOutcome::Data(bytes) => Self::Received { bytes: bytes.len() },
            ReadOutcome::TimedOut => Self::TimedOut,
        }
    }
}

/// Final outcome of one simulated client.
///
/// Every spawned client produces exactly one of these — none are
/// silently dropped.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The session ran its full script.
    Completed {
        /// Client identifier (1-based, matching the log output).
        client: usize,
        /// Total request bytes written.
        bytes_sent: usize,
        /// One entry per request sent.
        responses: Vec<ResponseOutcome>,
    },
    /// Connect, send, or read failed; the error is recorded verbatim.
    Failed {
        /// Client identifier.
        client: usize,
        /// Human-readable failure.
        error: String,
    },
    /// The task did not finish within the join bound and was abandoned.
    Abandoned {
        /// Client identifier.
        client: usize,
    },
}

impl SessionOutcome {
    /// Client identifier this outcome belongs to.
    pub fn client(&self) -> usize {
        match self {
            Self::Completed { client, .. }
            | Self::Failed { client, .. }
            | Self::Abandoned { client } => *client,
        }
    }

    /// True unless the task had to be abandoned at join time.
    pub fn completed_or_failed(&self) -> bool {
        !matches!(self, Self::Abandoned { .. })
    }
}

/// Handle to a set of in-flight client tasks.
pub struct SimulatorHandle {
    tasks: Vec<(usize, JoinHandle<SessionOutcome>)>,
    join_timeout: Duration,
}

impl SimulatorHandle {
    /// Number of spawned clients.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when no clients were spawned.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Join every client task, each bounded by the configured join
    /// timeout. A task that overruns its bound is abandoned (dropped,
    /// not awaited further) and recorded as such; a panicked task is
    /// recorded as failed. The returned vector always has one entry per
    /// spawned client.
    pub async fn join_all(self) -> Vec<SessionOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for (client, task) in self.tasks {
            match tokio::time::timeout(self.join_timeout, task).await {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(join_err)) => {
                    tracing::error!(client, "client task panicked: {}", join_err);
                    outcomes.push(SessionOutcome::Failed {
                        client,
                        error: format!("task panicked: {join_err}"),
                    });
                }
                Err(_) => {
                    tracing::warn!(client, "client task did not finish within join bound");
                    outcomes.push(SessionOutcome::Abandoned { client });
                }
            }
        }
        outcomes
    }
}

/// Runs one or more [`ClientSession`]s concurrently.
pub struct ClientSimulator {
    config: SimulatorConfig,
    requests: Vec<EncodedMessage>,
}

impl ClientSimulator {
    /// Create a simulator that has every client send the given request
    /// sequence in order, with a bounded read after each.
    pub fn new(config: SimulatorConfig, requests: Vec<EncodedMessage>) -> Self {
        Self { config, requests }
    }

    /// Spawn all client tasks.
    ///
    /// Client `i` (0-based) sleeps `i * stagger` before connecting, so
    /// connection starts are spaced by the stagger delay. Returns once
    /// every task has been spawned — callers may rely on all clients
    /// having been started (not necessarily connected) afterwards.
    pub fn spawn(&self) -> SimulatorHandle {
        let mut tasks = Vec::with_capacity(self.config.clients);
        for i in 0..self.config.clients {
            let client = i + 1;
            let delay = self.config.stagger * i as u32;
            let config = self.config.clone();
            let requests = self.requests.clone();
            let task = tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                run_session(client, config, requests).await
            });
            tasks.push((client, task));
        }
        SimulatorHandle {
            tasks,
            join_timeout: self.config.join_timeout,
        }
    }

    /// Spawn all clients and join them with bounded timeouts.
    pub async fn run(&self) -> Vec<SessionOutcome> {
        self.spawn().join_all().await
    }
}

/// One client's full script: connect, send each request with a bounded
/// read after it, optionally hold the connection open, close.
///
/// All failures are converted into the outcome; this function never
/// panics and never propagates an error past the task boundary.
async fn run_session(
    client: usize,
    config: SimulatorConfig,
    requests: Vec<EncodedMessage>,
) -> SessionOutcome {
    tracing::info!(client, addr = %config.addr, "connecting");
    let mut session = match ClientSession::connect(client, config.addr, config.connect_timeout)
        .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(client, "connect failed: {}", e);
            return SessionOutcome::Failed {
                client,
                error: e.to_string(),
            };
        }
    };

    let mut bytes_sent = 0;
    let mut responses = Vec::with_capacity(requests.len());
    for request in &requests {
        if let Err(e) = session.send(request).await {
            tracing::warn!(client, "send failed: {}", e);
            return SessionOutcome::Failed {
                client,
                error: e.to_string(),
            };
        }
        bytes_sent += request.len();

        match session.try_receive(config.read_timeout).await {
            Ok(outcome) => responses.push(ResponseOutcome::from(&outcome)),
            Err(e) => {
                tracing::warn!(client, "read failed: {}", e);
                return SessionOutcome::Failed {
                    client,
                    error: e.to_string(),
                };
            }
        }
    }

    if let Some(hold) = config.hold_duration {
        tracing::info!(client, "holding connection open for {:?}", hold);
        session.hold_open(hold).await;
    }

    session.close();
    tracing::info!(client, "connection closed normally");
    SessionOutcome::Completed {
        client,
        bytes_sent,
        responses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{api_versions_request, SHUTDOWN_CLIENT_ID};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn test_config(addr: SocketAddr, clients: usize) -> SimulatorConfig {
        SimulatorConfig {
            addr,
            clients,
            stagger: Duration::from_millis(10),
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(100),
            hold_duration: None,
            join_timeout: Duration::from_secs(5),
        }
    }

    /// Accepts connections forever, reading and discarding client bytes.
    async fn silent_listener() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 256];
                    while matches!(stream.read(&mut buf).await, Ok(n) if n > 0) {}
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_all_clients_accounted_for() {
        let addr = silent_listener().await;
        let request = api_versions_request(1, SHUTDOWN_CLIENT_ID).unwrap();
        let simulator = ClientSimulator::new(test_config(addr, 3), vec![request]);

        let outcomes = simulator.run().await;
        assert_eq!(outcomes.len(), 3);
        let mut clients: Vec<usize> = outcomes.iter().map(SessionOutcome::client).collect();
        clients.sort_unstable();
        assert_eq!(clients, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_silent_broker_yields_timeouts_not_failures() {
        let addr = silent_listener().await;
        let request = api_versions_request(1, SHUTDOWN_CLIENT_ID).unwrap();
        let sent = request.len();
        let simulator = ClientSimulator::new(test_config(addr, 2), vec![request]);

        for outcome in simulator.run().await {
            match outcome {
                SessionOutcome::Completed {
                    bytes_sent,
                    responses,
                    ..
                } => {
                    assert_eq!(bytes_sent, sent);
                    assert_eq!(responses, vec![ResponseOutcome::TimedOut]);
                }
                other => panic!("expected completed outcome, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_connection_failure_does_not_abort_others() {
        // No listener at all: every client fails independently, and every
        // failure is still accounted for.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = api_versions_request(1, SHUTDOWN_CLIENT_ID).unwrap();
        let simulator = ClientSimulator::new(test_config(addr, 3), vec![request]);

        let outcomes = simulator.run().await;
        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert!(matches!(outcome, SessionOutcome::Failed { .. }));
        }
    }

    #[tokio::test]
    async fn test_stuck_client_is_abandoned_not_hung() {
        let addr = silent_listener().await;
        let request = api_versions_request(1, SHUTDOWN_CLIENT_ID).unwrap();
        let mut config = test_config(addr, 1);
        // Hold far longer than the join bound.
        config.hold_duration = Some(Duration::from_secs(60));
        config.join_timeout = Duration::from_millis(200);
        let simulator = ClientSimulator::new(config, vec![request]);

        let outcomes = simulator.run().await;
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], SessionOutcome::Abandoned { client: 1 }));
    }

    #[test]
    fn test_response_outcome_from_read_outcome() {
        let data = ReadOutcome::Data(bytes::Bytes::from_static(&[1, 2, 3]));
        assert_eq!(
            ResponseOutcome::from(&data),
            ResponseOutcome::Received { bytes: 3 }
        );
        assert_eq!(
            ResponseOutcome::from(&ReadOutcome::TimedOut),
            ResponseOutcome::TimedOut
        );
    }
}
