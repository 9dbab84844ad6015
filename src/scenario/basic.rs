//! Basic request/response check.
//!
//! One client, two hand-built frames on one connection: an ApiVersions
//! request with a non-null client id, then a Metadata request with a
//! null client id — exercising both branches of the broker's
//! nullable-string decoder. A bounded read follows each send; a silent
//! broker is recorded as a timeout, not a failure. The broker is then
//! signaled and must exit within a short bound.

use std::time::Instant;

use crate::client::{ClientSimulator, SessionOutcome, SimulatorConfig};
use crate::error::Result;
use crate::process::ProcessController;
use crate::protocol::{api_versions_request, metadata_request, DEFAULT_CLIENT_ID};

use super::{await_exit, ScenarioConfig, ScenarioResult, TERMINATION_SIGNAL};

/// Run the basic scenario.
///
/// # Errors
///
/// Only a broker launch failure (or a failed signal delivery) is
/// returned as an error; everything the client experiences is captured
/// in the result.
pub async fn run_basic(config: &ScenarioConfig) -> Result<ScenarioResult> {
    let started = Instant::now();
    let mut controller = ProcessController::start(&config.broker).await?;

    // Let the listener socket bind before the client connects.
    tokio::time::sleep(config.settle_delay).await;

    let requests = vec![
        api_versions_request(1, DEFAULT_CLIENT_ID)?,
        metadata_request(2)?,
    ];
    let simulator = ClientSimulator::new(
        SimulatorConfig {
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            join_timeout: config.join_timeout,
            ..SimulatorConfig::single(config.addr)
        },
        requests,
    );
    let clients = simulator.run().await;

    controller.signal_group(TERMINATION_SIGNAL)?;
    let (exit_code, shutdown) = await_exit(&mut controller, config.shutdown_timeout).await?;
    let broker_output = controller.output().await;

    // A forced kill is recorded distinctly but does not by itself fail
    // the basic check; the broker was reaped either way.
    let passed = clients
        .iter()
        .all(|outcome| matches!(outcome, SessionOutcome::Completed { .. }));

    Ok(ScenarioResult {
        name: "basic".to_string(),
        passed,
        clients,
        exit_code,
        shutdown,
        elapsed_ms: started.elapsed().as_millis() as u64,
        broker_output,
    })
}
