//! Graceful-shutdown-under-load check.
//!
//! N clients connect with staggered starts, each sends an ApiVersions
//! request and then holds its connection open — long enough to still be
//! connected when the termination signal reaches the broker's process
//! group. The broker must then exit within a bounded time; overrunning
//! the bound triggers exactly one forced kill. Finally every client task
//! is joined with its own bound, so a stuck client can delay the verdict
//! but never hang the run.

use std::time::Instant;

use crate::client::{ClientSimulator, SimulatorConfig};
use crate::error::Result;
use crate::process::ProcessController;
use crate::protocol::{api_versions_request, SHUTDOWN_CLIENT_ID};

use super::{await_exit, ScenarioConfig, ScenarioResult, TERMINATION_SIGNAL};

/// Run the graceful-shutdown scenario.
///
/// # Errors
///
/// Only a broker launch failure (or a failed signal delivery) is
/// returned as an error; per-client failures are captured in the result.
pub async fn run_graceful_shutdown(config: &ScenarioConfig) -> Result<ScenarioResult> {
    let started = Instant::now();
    let mut controller = ProcessController::start(&config.broker).await?;

    tokio::time::sleep(config.settle_delay).await;

    let request = api_versions_request(1, SHUTDOWN_CLIENT_ID)?;
    let simulator = ClientSimulator::new(
        SimulatorConfig {
            addr: config.addr,
            clients: config.clients,
            stagger: config.stagger,
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            hold_duration: Some(config.hold_duration),
            join_timeout: config.join_timeout,
        },
        vec![request],
    );

    // All client tasks are started before the signal is sent; the extra
    // settle delay lets the staggered connections actually establish.
    let handle = simulator.spawn();
    tokio::time::sleep(config.pre_signal_delay).await;

    tracing::info!("delivering termination signal with {} clients connected", handle.len());
    controller.signal_group(TERMINATION_SIGNAL)?;

    let (exit_code, shutdown) = await_exit(&mut controller, config.shutdown_timeout).await?;
    let broker_output = controller.output().await;

    let clients = handle.join_all().await;

    // Pass requires the broker reaped (guaranteed above, its manner
    // recorded in `shutdown`) and every client thread accounted for and
    // finished — an abandoned task means a client never completed.
    let passed =
        clients.len() == config.clients && clients.iter().all(|c| c.completed_or_failed());

    Ok(ScenarioResult {
        name: "graceful-shutdown".to_string(),
        passed,
        clients,
        exit_code,
        shutdown,
        elapsed_ms: started.elapsed().as_millis() as u64,
        broker_output,
    })
}
