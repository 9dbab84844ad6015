//! Named test scenarios composing the encoder, client simulator, and
//! process controller.
//!
//! Each scenario drives the broker through start → load → signal →
//! bounded exit and produces exactly one [`ScenarioResult`]. Per-client
//! failures are captured into outcomes and never unwind a run; only a
//! broker launch failure is scenario-fatal.

mod basic;
mod shutdown;

pub use basic::run_basic;
pub use shutdown::run_graceful_shutdown;

use std::net::SocketAddr;
use std::time::Duration;

use nix::sys::signal::Signal;
use serde::Serialize;

use crate::client::SessionOutcome;
use crate::error::Result;
use crate::process::{ProcessController, ProcessSpec, WaitOutcome};

/// Scenario parameters. Defaults mirror the timing the harness has
/// always used against a loopback broker.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Command line that launches the broker.
    pub broker: ProcessSpec,
    /// Address the broker listens on.
    pub addr: SocketAddr,
    /// Delay after launch so the listener socket can bind.
    pub settle_delay: Duration,
    /// Bound on each client connect.
    pub connect_timeout: Duration,
    /// Bound on each response read.
    pub read_timeout: Duration,
    /// Number of concurrent clients in the graceful-shutdown check.
    pub clients: usize,
    /// Delay between consecutive client connection starts.
    pub stagger: Duration,
    /// How long each shutdown-check client holds its connection open.
    pub hold_duration: Duration,
    /// Delay between starting the clients and signaling the broker, so
    /// connections are established when the signal lands.
    pub pre_signal_delay: Duration,
    /// Bound on waiting for broker exit before force-kill escalation.
    pub shutdown_timeout: Duration,
    /// Bound on joining each client task.
    pub join_timeout: Duration,
}

impl ScenarioConfig {
    /// Configuration for the basic request/response check.
    pub fn basic(broker: ProcessSpec, addr: SocketAddr) -> Self {
        Self {
            broker,
            addr,
            settle_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            clients: 1,
            stagger: Duration::ZERO,
            hold_duration: Duration::ZERO,
            pre_signal_delay: Duration::ZERO,
            shutdown_timeout: Duration::from_secs(10),
            join_timeout: Duration::from_secs(5),
        }
    }

    /// Configuration for the graceful-shutdown-under-load check.
    pub fn graceful_shutdown(broker: ProcessSpec, addr: SocketAddr) -> Self {
        Self {
            broker,
            addr,
            settle_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            clients: 3,
            stagger: Duration::from_millis(500),
            hold_duration: Duration::from_secs(8),
            pre_signal_delay: Duration::from_secs(2),
            shutdown_timeout: Duration::from_secs(35),
            // The broker usually exits quickly, so joining starts while
            // clients are still inside their read timeout + hold window.
            // The bound must cover that window or healthy clients would
            // be misreported as stuck.
            join_timeout: Duration::from_secs(30),
        }
    }
}

/// How the broker went down, recorded distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownKind {
    /// Exited within the bound after the termination signal.
    Graceful,
    /// Overran the bound and required a forced kill.
    Forced,
}

/// Outcome of one scenario run.
#[derive(Debug, Serialize)]
pub struct ScenarioResult {
    /// Scenario name ("basic" or "graceful-shutdown").
    pub name: String,
    /// Overall verdict.
    pub passed: bool,
    /// One entry per spawned client, none dropped.
    pub clients: Vec<SessionOutcome>,
    /// Broker exit code (negated signal number if signal-terminated).
    pub exit_code: Option<i32>,
    /// Whether the broker exited on its own or had to be killed.
    pub shutdown: ShutdownKind,
    /// Wall-clock time from broker launch to reap, in milliseconds.
    pub elapsed_ms: u64,
    /// Combined broker stdout/stderr, for the human-readable report.
    #[serde(skip)]
    pub broker_output: String,
}

/// Wait for broker exit within `bound`, escalating to a forced kill on
/// timeout.
///
/// This is the single escalation path in the harness: if the broker
/// exits in time, `force_kill` is never invoked; otherwise it is invoked
/// exactly once, and either way the process ends up reaped.
pub(crate) async fn await_exit(
    controller: &mut ProcessController,
    bound: Duration,
) -> Result<(Option<i32>, ShutdownKind)> {
    match controller.wait(bound).await? {
        WaitOutcome::Exited(code) => Ok((code, ShutdownKind::Graceful)),
        WaitOutcome::TimedOut => {
            tracing::warn!("broker shutdown timed out after {:?}, escalating", bound);
            let code = controller.force_kill().await?;
            Ok((code, ShutdownKind::Forced))
        }
    }
}

/// The termination signal scenarios deliver, mirroring an operator's
/// Ctrl-C at the broker's terminal.
pub(crate) const TERMINATION_SIGNAL: Signal = Signal::SIGINT;
