//! # broker-harness
//!
//! Conformance and resilience test harness for a message-broker server
//! speaking a length-prefixed, big-endian binary wire protocol.
//!
//! The harness does two things:
//!
//! - **Frame encoding** ([`protocol`]): hand-constructs request frames
//!   byte-for-byte, bypassing any client library, so the broker's
//!   decoder sees exact, known inputs.
//! - **Orchestration** ([`process`], [`client`], [`scenario`]): launches
//!   the broker in its own process group, drives concurrent client
//!   connections against it, delivers a termination signal, and verifies
//!   it drains or aborts within a bounded time — escalating to a forced
//!   kill exactly once when it does not.
//!
//! Every blocking step (connect, read, hold, wait, join) is
//! timeout-bounded; there are no unbounded waits anywhere in a scenario.
//!
//! ## Example
//!
//! ```ignore
//! use broker_harness::process::ProcessSpec;
//! use broker_harness::scenario::{run_basic, ScenarioConfig};
//!
//! #[tokio::main]
//! async fn main() -> broker_harness::Result<()> {
//!     let broker = ProcessSpec::new("cargo", ["run".to_string()]);
//!     let config = ScenarioConfig::basic(broker, "127.0.0.1:9092".parse().unwrap());
//!     let result = run_basic(&config).await?;
//!     std::process::exit(if result.passed { 0 } else { 1 });
//! }
//! ```

pub mod client;
pub mod error;
pub mod mockbroker;
pub mod process;
pub mod protocol;
pub mod report;
pub mod scenario;

pub use error::{HarnessError, Result};
