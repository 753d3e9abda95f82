//! Soft, non-fatal anomalies seen while reconstructing a book.
//!
//! None of these interrupt processing. They are counted here, logged through
//! `tracing` and mirrored to `metrics` counters so a caller can decide for
//! itself whether a captured stream looks trustworthy.

use std::collections::VecDeque;

use tracing::warn;

use crate::engine::types::{OrderEntry, OrderKey};

#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    /// A resting order on the opposite side was purged because a new order
    /// crossed it.
    CrossedPurge {
        purged: OrderKey,
        purged_entry: OrderEntry,
        trigger: OrderKey,
        trigger_price: f64,
    },
    /// `update` referenced an order that is not in the book.
    UpdateMissing { key: OrderKey, size: u64 },
}

/// Pending events kept between drains. Older events past this are dropped
/// and only counted.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Counters are exact for the whole session. The event list is a bounded
/// buffer: callers that want every event must call `drain` regularly.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub crossed_purged: u64,
    pub update_missing: u64,
    /// Events discarded because the buffer was full.
    pub events_dropped: u64,
    events: VecDeque<Anomaly>,
    capacity: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { crossed_purged: 0, update_missing: 0, events_dropped: 0, events: VecDeque::new(), capacity }
    }

    pub fn record(&mut self, anomaly: Anomaly) {
        match &anomaly {
            Anomaly::CrossedPurge { purged, purged_entry, trigger, trigger_price } => {
                self.crossed_purged += 1;
                metrics::counter!("streamsim_crossed_purged_total").increment(1);
                warn!(
                    symbol = %purged.symbol,
                    purged_side = %purged.side,
                    purged_id = purged.id,
                    purged_price = purged_entry.price,
                    purged_size = purged_entry.size,
                    trigger_id = trigger.id,
                    trigger_price = trigger_price,
                    "Purged crossed order"
                );
            }
            Anomaly::UpdateMissing { key, size } => {
                self.update_missing += 1;
                metrics::counter!("streamsim_update_missing_total").increment(1);
                warn!(symbol = %key.symbol, side = %key.side, id = key.id, size = size, "Update for unknown order id");
            }
        }
        if self.capacity == 0 {
            self.events_dropped += 1;
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.events_dropped += 1;
        }
        self.events.push_back(anomaly);
    }

    pub fn total(&self) -> u64 {
        self.crossed_purged + self.update_missing
    }

    /// Anomalies buffered since the last drain, oldest first.
    pub fn events(&self) -> &VecDeque<Anomaly> {
        &self.events
    }

    /// Hands the pending events to the caller. Counters are kept.
    pub fn drain(&mut self) -> Vec<Anomaly> {
        self.events.drain(..).collect()
    }
}
