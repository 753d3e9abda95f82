//! Internal checkpoint encoding.
//!
//! Pure conversions only: this file never decides what to do with a decoded
//! line, the simulator does.

use tracing::debug;

use crate::engine::book::OrderBookStore;
use crate::engine::types::BookDelta;
use crate::simulator::bitmex_types::{BitmexOrderBookL2Element, TABLE_ORDER_BOOK_L2};
use crate::simulator::error::{SimResult, SimulatorError};
use crate::simulator::subscription::SubscriptionTracker;
use crate::simulator::STATE_CHANNEL_SUBSCRIBED;
use crate::snapshot::{bitmex_elements, Snapshot};

/// `("!subscribed", [channels..])` followed by `("orderBookL2", [rows..])`.
/// Refuses to run while a channel filter is active.
pub fn bitmex_state_snapshot(subs: &SubscriptionTracker, book: &OrderBookStore) -> SimResult<Vec<Snapshot>> {
    if subs.filter().is_active() {
        return Err(SimulatorError::FilteredStateIncomplete);
    }

    let channels: Vec<&str> = subs.channels().collect();
    let subscribed = serde_json::to_vec(&channels).map_err(SimulatorError::Encode)?;

    let rows = bitmex_elements(book);
    let book_bytes = serde_json::to_vec(&rows).map_err(SimulatorError::Encode)?;
    debug!(channels = channels.len(), entries = rows.len(), "Encoded state snapshot");

    Ok(vec![
        Snapshot::new(STATE_CHANNEL_SUBSCRIBED, subscribed),
        Snapshot::new(TABLE_ORDER_BOOK_L2, book_bytes),
    ])
}

pub fn decode_subscribed(line: &[u8]) -> SimResult<Vec<String>> {
    serde_json::from_slice(line).map_err(SimulatorError::decode("subscribed channel list"))
}

pub fn decode_order_book(line: &[u8]) -> SimResult<Vec<BookDelta>> {
    let rows: Vec<BitmexOrderBookL2Element> =
        serde_json::from_slice(line).map_err(SimulatorError::decode("orderBookL2 state"))?;
    Ok(rows.into_iter().map(BookDelta::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Side;
    use crate::simulator::subscription::ChannelFilter;

    #[test]
    fn test_empty_state() {
        let subs = SubscriptionTracker::new(ChannelFilter::Absent);
        let snaps = bitmex_state_snapshot(&subs, &OrderBookStore::new()).unwrap();
        assert_eq!(snaps[0], Snapshot::new("!subscribed", b"[]".to_vec()));
        assert_eq!(snaps[1], Snapshot::new("orderBookL2", b"[]".to_vec()));
    }

    #[test]
    fn test_filtered_refuses() {
        let subs = SubscriptionTracker::new(ChannelFilter::from_list(Some(vec!["orderBookL2".into()])));
        let err = bitmex_state_snapshot(&subs, &OrderBookStore::new()).unwrap_err();
        assert!(matches!(err, SimulatorError::FilteredStateIncomplete));
    }

    #[test]
    fn test_decode_rows() {
        let rows = decode_order_book(br#"[{"symbol":"XBTUSD","id":7,"side":"Buy","size":3,"price":99.5}]"#).unwrap();
        assert_eq!(rows, vec![BookDelta { symbol: "XBTUSD".into(), side: Side::Buy, id: 7, price: 99.5, size: 3 }]);

        let err = decode_order_book(b"{not json").unwrap_err();
        assert!(matches!(err, SimulatorError::Decode { structure: "orderBookL2 state", .. }));
        assert!(decode_subscribed(br#"["a","b"]"#).unwrap() == vec!["a".to_string(), "b".to_string()]);
    }
}
