//! Per-exchange state simulation.
//!
//! A `Simulator` rebuilds what the exchange holds (subscriptions and the
//! order book) from captured frames alone, and can hand that state back as
//! snapshots. Frames must be fed in arrival order from a single thread;
//! nothing here re-orders or buffers.

pub mod bitmex;
pub mod bitmex_types;
pub mod error;
pub mod subscription;

use std::fmt;
use std::str::FromStr;

use crate::engine::book::OrderBookStore;
use crate::engine::diagnostics::{Anomaly, Diagnostics};
use crate::snapshot::Snapshot;

pub use error::{SimResult, SimulatorError};
pub use subscription::{ChannelFilter, SubscriptionTracker};

/// Channel returned when a line could not be attributed to any channel.
pub const CHANNEL_UNKNOWN: &str = "!unknown";
/// State channel carrying the serialized subscription set.
pub const STATE_CHANNEL_SUBSCRIBED: &str = "!subscribed";

pub trait Simulator {
    /// Client setup frame captured before the first server response.
    fn process_start(&mut self, line: &[u8]) -> SimResult<()>;

    /// Client frame sent after connecting.
    fn process_send(&mut self, line: &[u8]) -> SimResult<String>;

    /// Server frame; returns the channel it resolved to.
    fn process_message_websocket(&mut self, line: &[u8]) -> SimResult<String>;

    /// Same as `process_message_websocket`, but fails if the line resolves to
    /// a channel other than `channel`.
    fn process_message_channel_known(&mut self, channel: &str, line: &[u8]) -> SimResult<()> {
        let resolved = self.process_message_websocket(line)?;
        if resolved != channel {
            return Err(SimulatorError::ChannelMismatch { resolved, declared: channel.to_string() });
        }
        Ok(())
    }

    /// Checkpoint line produced by `take_state_snapshot`, addressed by channel.
    fn process_state(&mut self, channel: &str, line: &[u8]) -> SimResult<()>;

    /// Wire frames equivalent to a fresh connect + subscribe.
    fn take_snapshot(&self) -> SimResult<Vec<Snapshot>>;

    /// Internal checkpoint of the whole state. Fails while filtering.
    fn take_state_snapshot(&self) -> SimResult<Vec<Snapshot>>;

    fn order_book(&self) -> &OrderBookStore;

    fn subscriptions(&self) -> &SubscriptionTracker;

    fn diagnostics(&self) -> &Diagnostics;

    fn drain_anomalies(&mut self) -> Vec<Anomaly>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Bitmex,
}

impl FromStr for Exchange {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitmex" => Ok(Exchange::Bitmex),
            _ => Err(SimulatorError::UnsupportedExchange(s.to_string())),
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Bitmex => write!(f, "bitmex"),
        }
    }
}

/// Builds the simulator for `exchange`. `filter` of `None` tracks every
/// channel; `Some(list)` restricts to `list`, even when it is empty.
pub fn new_simulator(exchange: &str, filter: Option<Vec<String>>) -> SimResult<Box<dyn Simulator>> {
    let exchange: Exchange = exchange.parse()?;
    Ok(for_exchange(exchange, ChannelFilter::from_list(filter)))
}

pub fn for_exchange(exchange: Exchange, filter: ChannelFilter) -> Box<dyn Simulator> {
    match exchange {
        Exchange::Bitmex => Box::new(bitmex::BitmexSimulator::new(filter)),
    }
}
