//! Client emulation: single sessions and concurrent simulation.

mod session;
mod simulator;

pub use session::{ClientSession, ReadOutcome, SessionState, READ_BUFFER_SIZE};
pub use simulator::{
    ClientSimulator, ResponseOutcome, SessionOutcome, SimulatorConfig, SimulatorHandle,
};
