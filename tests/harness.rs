//! End-to-end scenario tests.
//!
//! These run the full scenarios against a real child process: the
//! harness binary's own hidden `mock-broker` subcommand, which echoes
//! each request's correlation id and exits cleanly on SIGINT. Timings
//! are compressed relative to the defaults so the suite stays fast.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use broker_harness::client::SessionOutcome;
use broker_harness::process::{ProcessController, ProcessSpec, SignalOutcome, WaitOutcome};
use broker_harness::scenario::{
    run_basic, run_graceful_shutdown, ScenarioConfig, ShutdownKind,
};

/// Path to the compiled `broker-harness` binary, derived from the test
/// binary's own location (`target/<profile>/deps/<test>` → sibling of
/// `deps`).
fn harness_binary() -> PathBuf {
    let mut path = std::env::current_exe().expect("test binary path");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.join("broker-harness")
}

/// Bind to an ephemeral port and release it, yielding a free address.
fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("ephemeral bind");
    listener.local_addr().expect("local addr")
}

fn mock_broker_spec(addr: SocketAddr) -> ProcessSpec {
    ProcessSpec::new(
        harness_binary().to_string_lossy().into_owned(),
        ["mock-broker".to_string(), "--addr".to_string(), addr.to_string()],
    )
}

fn sh(script: &str) -> ProcessSpec {
    ProcessSpec::new("sh", ["-c".to_string(), script.to_string()])
}

/// Compressed scenario timings suitable for the mock broker, which
/// binds within milliseconds and exits on SIGINT immediately.
fn fast_basic_config(addr: SocketAddr) -> ScenarioConfig {
    let mut config = ScenarioConfig::basic(mock_broker_spec(addr), addr);
    config.settle_delay = Duration::from_millis(500);
    config.connect_timeout = Duration::from_secs(2);
    config.read_timeout = Duration::from_secs(2);
    config.shutdown_timeout = Duration::from_secs(5);
    config.join_timeout = Duration::from_secs(5);
    config
}

async fn wait_for_listener(addr: SocketAddr) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("no listener came up on {addr}");
}

#[tokio::test]
async fn test_controller_interrupts_mock_broker_cleanly() {
    let addr = free_addr();
    let mut controller = ProcessController::start(&mock_broker_spec(addr)).await.unwrap();
    wait_for_listener(addr).await;

    assert_eq!(
        controller.signal_group(nix::sys::signal::Signal::SIGINT).unwrap(),
        SignalOutcome::Delivered
    );
    let outcome = controller.wait(Duration::from_secs(5)).await.unwrap();
    assert_eq!(outcome, WaitOutcome::Exited(Some(0)));
}

#[tokio::test]
async fn test_basic_scenario_passes_against_mock_broker() {
    let addr = free_addr();
    let result = run_basic(&fast_basic_config(addr)).await.unwrap();

    assert!(result.passed, "basic scenario failed: {result:?}");
    assert_eq!(result.name, "basic");
    assert_eq!(result.shutdown, ShutdownKind::Graceful);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.clients.len(), 1);

    // The mock broker answers both frames with 8-byte echo responses.
    match &result.clients[0] {
        SessionOutcome::Completed {
            bytes_sent,
            responses,
            ..
        } => {
            assert_eq!(*bytes_sent, 26 + 19);
            assert_eq!(responses.len(), 2);
        }
        other => panic!("expected completed client, got {other:?}"),
    }
}

#[tokio::test]
async fn test_graceful_shutdown_scenario_passes_against_mock_broker() {
    let addr = free_addr();
    let mut config = ScenarioConfig::graceful_shutdown(mock_broker_spec(addr), addr);
    config.settle_delay = Duration::from_millis(500);
    config.connect_timeout = Duration::from_secs(2);
    config.read_timeout = Duration::from_secs(2);
    config.stagger = Duration::from_millis(50);
    config.hold_duration = Duration::from_millis(800);
    config.pre_signal_delay = Duration::from_millis(400);
    config.shutdown_timeout = Duration::from_secs(10);
    config.join_timeout = Duration::from_secs(10);

    let result = run_graceful_shutdown(&config).await.unwrap();

    assert!(result.passed, "shutdown scenario failed: {result:?}");
    assert_eq!(result.name, "graceful-shutdown");
    assert_eq!(result.shutdown, ShutdownKind::Graceful);
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.clients.len(), 3);
    for client in &result.clients {
        assert!(client.completed_or_failed(), "abandoned client: {client:?}");
    }
}

#[tokio::test]
async fn test_unresponsive_broker_is_force_killed_and_reported() {
    // A stand-in that never listens and ignores graceful signals: the
    // client connect fails, the bounded wait times out, and the single
    // forced-kill escalation must reap it.
    let addr = free_addr();
    let mut config = ScenarioConfig::basic(sh("trap '' INT TERM; sleep 600"), addr);
    config.settle_delay = Duration::from_millis(100);
    config.connect_timeout = Duration::from_millis(500);
    config.read_timeout = Duration::from_millis(500);
    config.shutdown_timeout = Duration::from_millis(500);
    config.join_timeout = Duration::from_secs(2);

    let result = run_basic(&config).await.unwrap();

    assert!(!result.passed);
    assert_eq!(result.shutdown, ShutdownKind::Forced);
    assert_eq!(result.exit_code, Some(-9));
    assert!(matches!(result.clients[0], SessionOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_broker_that_exits_early_still_yields_a_result() {
    // The broker dies before the client connects. Signal delivery finds
    // the group already gone, which must be benign; the scenario still
    // produces a complete (failing) result instead of erroring out.
    let addr = free_addr();
    let mut config = ScenarioConfig::basic(sh("exit 0"), addr);
    config.settle_delay = Duration::from_millis(200);
    config.connect_timeout = Duration::from_millis(500);
    config.read_timeout = Duration::from_millis(500);
    config.shutdown_timeout = Duration::from_secs(2);
    config.join_timeout = Duration::from_secs(2);

    let result = run_basic(&config).await.unwrap();

    assert!(!result.passed);
    assert_eq!(result.shutdown, ShutdownKind::Graceful);
    assert_eq!(result.exit_code, Some(0));
    assert!(matches!(result.clients[0], SessionOutcome::Failed { .. }));
}
