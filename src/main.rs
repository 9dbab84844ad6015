//! Command-line entry point for the broker harness.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use broker_harness::process::ProcessSpec;
use broker_harness::protocol::{api_versions_request, metadata_request, DEFAULT_CLIENT_ID};
use broker_harness::report;
use broker_harness::scenario::{
    run_basic, run_graceful_shutdown, ScenarioConfig, ScenarioResult,
};
use broker_harness::{mockbroker, HarnessError, Result};

#[derive(Parser)]
#[command(name = "broker-harness", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Options shared by every scenario.
#[derive(Args)]
struct ScenarioArgs {
    /// Address the broker listens on.
    #[arg(long, default_value = "127.0.0.1:9092")]
    addr: SocketAddr,

    /// Emit a machine-readable JSON report instead of the plain summary.
    #[arg(long)]
    json: bool,

    /// Command line that launches the broker (e.g. `-- cargo run`).
    #[arg(trailing_var_arg = true, required = true)]
    broker_command: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Basic request/response check against a freshly started broker.
    Basic(ScenarioArgs),
    /// Graceful-shutdown check with concurrent long-lived clients.
    GracefulShutdown(ScenarioArgs),
    /// Run both scenarios back to back.
    All(ScenarioArgs),
    /// Minimal broker stand-in used by the harness's own tests.
    #[command(hide = true)]
    MockBroker {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1:9092")]
        addr: SocketAddr,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn broker_spec(args: &ScenarioArgs) -> Result<ProcessSpec> {
    ProcessSpec::from_command_line(&args.broker_command)
        .ok_or_else(|| HarnessError::Launch("empty broker command line".to_string()))
}

/// Show the exact frames a scenario will put on the wire, then run it.
async fn run_scenarios(args: &ScenarioArgs, basic: bool, graceful: bool) -> Result<ExitCode> {
    if !args.json {
        report::print_frame("ApiVersions", &api_versions_request(1, DEFAULT_CLIENT_ID)?);
        report::print_frame("Metadata", &metadata_request(2)?);
    }

    let mut results: Vec<ScenarioResult> = Vec::new();
    if basic {
        let config = ScenarioConfig::basic(broker_spec(args)?, args.addr);
        results.push(run_basic(&config).await?);
    }
    if graceful {
        let config = ScenarioConfig::graceful_shutdown(broker_spec(args)?, args.addr);
        results.push(run_graceful_shutdown(&config).await?);
    }

    if args.json {
        report::print_json(&results)?;
    } else {
        for result in &results {
            report::print_summary(result);
        }
    }

    let passed = results.iter().all(|r| r.passed);
    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match &cli.command {
        Command::Basic(args) => run_scenarios(args, true, false).await,
        Command::GracefulShutdown(args) => run_scenarios(args, false, true).await,
        Command::All(args) => run_scenarios(args, true, true).await,
        Command::MockBroker { addr } => mockbroker::run(*addr).await.map(|()| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("harness failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
