//! Scenario result reporting.
//!
//! The human-readable summary goes to stdout; logs go to stderr via
//! `tracing`. The `--json` form emits one machine-readable document for
//! all scenarios, also on stdout.

use std::io::Write;

use serde::Serialize;

use crate::client::{ResponseOutcome, SessionOutcome};
use crate::error::Result;
use crate::protocol::EncodedMessage;
use crate::scenario::ScenarioResult;

/// Print the hex dump of a frame about to be exercised, the way a
/// protocol engineer would eyeball it against the wire format.
pub fn print_frame(label: &str, message: &EncodedMessage) {
    println!(
        "frame {label}: {} bytes (declared {}), hex {}",
        message.len(),
        message.declared_len(),
        message.to_hex()
    );
}

/// Print the human-readable summary of one scenario run.
pub fn print_summary(result: &ScenarioResult) {
    println!("=== scenario: {} ===", result.name);
    for outcome in &result.clients {
        match outcome {
            SessionOutcome::Completed {
                client,
                bytes_sent,
                responses,
            } => {
                println!("client {client}: sent {bytes_sent} bytes");
                for (i, response) in responses.iter().enumerate() {
                    match response {
                        ResponseOutcome::Received { bytes } => {
                            println!("client {client}: request {}: received {bytes} bytes", i + 1);
                        }
                        ResponseOutcome::TimedOut => {
                            println!(
                                "client {client}: request {}: no response (timeout)",
                                i + 1
                            );
                        }
                    }
                }
            }
            SessionOutcome::Failed { client, error } => {
                println!("client {client}: FAILED: {error}");
            }
            SessionOutcome::Abandoned { client } => {
                println!("client {client}: ABANDONED (did not finish within join bound)");
            }
        }
    }
    match result.exit_code {
        Some(code) => println!("broker exit code: {code} ({:?})", result.shutdown),
        None => println!("broker exit code: unavailable ({:?})", result.shutdown),
    }
    println!("elapsed: {} ms", result.elapsed_ms);
    if !result.broker_output.is_empty() {
        println!("--- broker output ---");
        print!("{}", result.broker_output);
        if !result.broker_output.ends_with('\n') {
            println!();
        }
        println!("---------------------");
    }
    println!("result: {}", if result.passed { "PASS" } else { "FAIL" });
}

/// Machine-readable wrapper for a full run.
#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    scenarios: &'a [ScenarioResult],
}

/// Write all scenario results as a single JSON document to stdout.
///
/// # Errors
///
/// Returns an error if serialization or the stdout write fails.
pub fn print_json(results: &[ScenarioResult]) -> Result<()> {
    let report = JsonReport {
        passed: results.iter().all(|r| r.passed),
        scenarios: results,
    };
    let json = serde_json::to_string_pretty(&report)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(json.as_bytes())?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}
