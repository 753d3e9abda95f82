use tracing::debug;

use crate::engine::book::OrderBookStore;
use crate::simulator::bitmex_types::{BitmexSubscribeAck, BitmexTableFrame, TABLE_ORDER_BOOK_L2};
use crate::simulator::error::{SimResult, SimulatorError};
use crate::simulator::subscription::SubscriptionTracker;
use crate::snapshot::{bitmex_elements, Snapshot};

/// Frames Bitmex would send a client that connects now and subscribes to
/// every tracked channel: one ack per channel (ascending), then one
/// `partial` holding the whole book if `orderBookL2` is tracked.
pub fn bitmex_snapshot(subs: &SubscriptionTracker, book: &OrderBookStore) -> SimResult<Vec<Snapshot>> {
    let mut out = Vec::with_capacity(subs.len() + 1);

    for channel in subs.channels() {
        let ack = serde_json::to_vec(&BitmexSubscribeAck::new(channel)).map_err(SimulatorError::Encode)?;
        out.push(Snapshot::new(channel, ack));
    }

    if subs.is_subscribed(TABLE_ORDER_BOOK_L2) {
        let data = bitmex_elements(book);
        let frame = BitmexTableFrame { table: TABLE_ORDER_BOOK_L2, action: "partial", data: &data };
        let bytes = serde_json::to_vec(&frame).map_err(SimulatorError::Encode)?;
        debug!(entries = data.len(), bytes = bytes.len(), "Encoded orderBookL2 partial");
        out.push(Snapshot::new(TABLE_ORDER_BOOK_L2, bytes));
    }

    Ok(out)
}
