//! Error types for the broker harness.

use thiserror::Error;

/// Main error type for all harness operations.
///
/// Expected outcomes are deliberately *not* represented here: a read that
/// times out, a signal delivered to a process that already exited, or a
/// broker that needs a forced kill are all facts the scenario records
/// (`ReadOutcome`, `SignalOutcome`, `WaitOutcome`, `ShutdownKind`), not
/// failures that unwind it.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// I/O error during socket or process operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (report output only).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Value out of the representable range for its wire type.
    ///
    /// This is a programmer error: request parameters are chosen by the
    /// harness, so an out-of-range value means a broken scenario, not a
    /// broken broker.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Connection refused, unreachable, or connect timeout elapsed.
    ///
    /// Recorded into the owning client's outcome; never fatal to the
    /// scenario.
    #[error("connection error: {0}")]
    Connection(String),

    /// The broker process could not be launched. Scenario-fatal.
    #[error("broker launch failed: {0}")]
    Launch(String),

    /// Signal delivery to the broker's process group failed for a reason
    /// other than the group being gone. Scenario-fatal.
    #[error("signal delivery failed: {0}")]
    Signal(String),
}

/// Result type alias using [`HarnessError`].
pub type Result<T> = std::result::Result<T, HarnessError>;
