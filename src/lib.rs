//! Offline exchange state simulation.
//!
//! Feeds captured websocket frames, in arrival order, through a per-exchange
//! [`simulator::Simulator`] that rebuilds the venue's order book and
//! subscriptions, then emits them back as wire-replay or checkpoint
//! snapshots.
pub mod config;
pub mod engine;
pub mod simulator;
pub mod snapshot;
pub mod telemetry;

pub use simulator::{new_simulator, Simulator, SimulatorError};
pub use snapshot::Snapshot;
