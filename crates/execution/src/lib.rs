pub mod ledger;
pub mod service;
pub mod simulator;

pub use ledger::{PositionLedger, RejectReason};
pub use service::{SimCommand, SimulatorHandle, SimulatorService};
pub use simulator::{
    ExecutionSimulator, FillOutcome, Session, SessionSummary, SimConfig, SimConfigPatch,
    SimSnapshot,
};
