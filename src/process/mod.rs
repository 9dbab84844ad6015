//! Broker process lifecycle: spawn, signal, bounded wait, forced kill.

mod controller;

pub use controller::{
    ProcessController, ProcessSpec, ProcessState, SignalOutcome, WaitOutcome,
};
