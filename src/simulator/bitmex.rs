use tracing::{debug, instrument, trace};

use super::bitmex_types::{BitmexEnvelope, BitmexOrderBookL2Element, TABLE_ORDER_BOOK_L2};
use super::error::{SimResult, SimulatorError};
use super::subscription::{ChannelFilter, SubscriptionTracker};
use super::{Simulator, CHANNEL_UNKNOWN, STATE_CHANNEL_SUBSCRIBED};
use crate::engine::book::OrderBookStore;
use crate::engine::diagnostics::{Anomaly, Diagnostics};
use crate::engine::types::{BookAction, BookDelta};
use crate::snapshot::{state, wire, Snapshot};

pub const CHANNEL_INFO: &str = "info";
pub const CHANNEL_ERROR: &str = "error";

/// Bitmex realtime feed state machine. Only `orderBookL2` carries state;
/// other tables are classified and otherwise ignored.
#[derive(Debug, Default)]
pub struct BitmexSimulator {
    subs: SubscriptionTracker,
    book: OrderBookStore,
    diag: Diagnostics,
}

impl BitmexSimulator {
    pub fn new(filter: ChannelFilter) -> Self {
        Self {
            subs: SubscriptionTracker::new(filter),
            book: OrderBookStore::new(),
            diag: Diagnostics::new(),
        }
    }

    fn apply_order_book(&mut self, action: BookAction, data: serde_json::Value) -> SimResult<()> {
        let rows: Vec<BitmexOrderBookL2Element> =
            serde_json::from_value(data).map_err(SimulatorError::decode("orderBookL2 data"))?;
        let deltas: Vec<BookDelta> = rows.into_iter().map(BookDelta::from).collect();
        self.book.apply(action, &deltas, &mut self.diag);
        Ok(())
    }
}

impl Simulator for BitmexSimulator {
    fn process_start(&mut self, _line: &[u8]) -> SimResult<()> {
        Ok(())
    }

    // Bitmex clients only subscribe through the connect URL.
    fn process_send(&mut self, _line: &[u8]) -> SimResult<String> {
        Ok(CHANNEL_UNKNOWN.to_string())
    }

    #[instrument(level = "trace", skip_all)]
    fn process_message_websocket(&mut self, line: &[u8]) -> SimResult<String> {
        let frame: BitmexEnvelope = serde_json::from_slice(line).map_err(SimulatorError::decode("bitmex frame"))?;

        if frame.success == Some(true) {
            if let Some(channel) = frame.subscribe {
                self.subs.subscribe(&channel);
                return Ok(channel);
            }
        }
        if frame.info.is_some() {
            return Ok(CHANNEL_INFO.to_string());
        }
        if frame.error.is_some() {
            debug!(error = ?frame.error, "Bitmex error frame");
            return Ok(CHANNEL_ERROR.to_string());
        }

        let Some(table) = frame.table else {
            return Ok(CHANNEL_UNKNOWN.to_string());
        };
        if table != TABLE_ORDER_BOOK_L2 {
            trace!(table = %table, "Ignoring table");
            return Ok(table);
        }
        if !self.subs.filter().allows(&table) {
            trace!(table = %table, "Table outside filter");
            return Ok(table);
        }

        let action: BookAction = frame.action.as_deref().unwrap_or_default().parse()?;
        let data = frame.data.unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
        self.apply_order_book(action, data)?;
        Ok(table)
    }

    #[instrument(level = "debug", skip(self, line))]
    fn process_state(&mut self, channel: &str, line: &[u8]) -> SimResult<()> {
        if channel == STATE_CHANNEL_SUBSCRIBED {
            for subscribed in state::decode_subscribed(line)? {
                self.subs.subscribe(&subscribed);
            }
            return Ok(());
        }
        if !self.subs.filter().allows(channel) {
            return Ok(());
        }
        if channel == TABLE_ORDER_BOOK_L2 {
            let deltas = state::decode_order_book(line)?;
            debug!(entries = deltas.len(), "Restoring orderBookL2");
            self.book.apply(BookAction::Partial, &deltas, &mut self.diag);
        }
        Ok(())
    }

    fn take_snapshot(&self) -> SimResult<Vec<Snapshot>> {
        wire::bitmex_snapshot(&self.subs, &self.book)
    }

    fn take_state_snapshot(&self) -> SimResult<Vec<Snapshot>> {
        state::bitmex_state_snapshot(&self.subs, &self.book)
    }

    fn order_book(&self) -> &OrderBookStore {
        &self.book
    }

    fn subscriptions(&self) -> &SubscriptionTracker {
        &self.subs
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    fn drain_anomalies(&mut self) -> Vec<Anomaly> {
        self.diag.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{OrderEntry, OrderKey, Side};

    const ACK: &[u8] = br#"{"success":true,"subscribe":"orderBookL2","request":{"op":"subscribe","args":["orderBookL2"]}}"#;
    const PARTIAL: &[u8] = br#"{"table":"orderBookL2","action":"partial","keys":["symbol","id","side"],"data":[{"symbol":"XBTUSD","id":17999992000,"side":"Sell","size":100,"price":80},{"symbol":"XBTUSD","id":17999993000,"side":"Buy","size":20,"price":70}]}"#;

    fn key(id: i64, side: Side) -> OrderKey {
        OrderKey::new("XBTUSD", side, id)
    }

    #[test]
    fn test_subscribe_ack() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        assert_eq!(sim.process_message_websocket(ACK).unwrap(), "orderBookL2");
        assert!(sim.subscriptions().is_subscribed("orderBookL2"));
    }

    #[test]
    fn test_side_channels() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        let info = br#"{"info":"Welcome to the BitMEX Realtime API.","version":"2.0.0","timestamp":"2020-01-01T00:00:00.000Z","docs":"https://www.bitmex.com/app/wsAPI"}"#;
        let error = br#"{"status":400,"error":"Unknown table: orderBookL3","request":{"op":"subscribe","args":["orderBookL3"]}}"#;
        let failed = br#"{"success":false,"error":"rate limited"}"#;
        assert_eq!(sim.process_message_websocket(info).unwrap(), CHANNEL_INFO);
        assert_eq!(sim.process_message_websocket(error).unwrap(), CHANNEL_ERROR);
        assert_eq!(sim.process_message_websocket(failed).unwrap(), CHANNEL_ERROR);
        assert!(sim.subscriptions().is_empty());
        assert!(sim.order_book().is_empty());
    }

    #[test]
    fn test_partial_then_deltas() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        sim.process_message_websocket(ACK).unwrap();
        sim.process_message_websocket(PARTIAL).unwrap();
        assert_eq!(sim.order_book().len(), 2);

        let update = br#"{"table":"orderBookL2","action":"update","data":[{"symbol":"XBTUSD","id":17999993000,"side":"Buy","size":25}]}"#;
        sim.process_message_websocket(update).unwrap();
        assert_eq!(
            sim.order_book().get(&key(17999993000, Side::Buy)),
            Some(&OrderEntry { price: 70.0, size: 25 })
        );

        let delete = br#"{"table":"orderBookL2","action":"delete","data":[{"symbol":"XBTUSD","id":17999992000,"side":"Sell"}]}"#;
        sim.process_message_websocket(delete).unwrap();
        assert!(sim.order_book().get(&key(17999992000, Side::Sell)).is_none());
        assert_eq!(sim.diagnostics().total(), 0);
    }

    #[test]
    fn test_crossed_insert_is_soft() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        sim.process_message_websocket(PARTIAL).unwrap();
        let insert = br#"{"table":"orderBookL2","action":"insert","data":[{"symbol":"XBTUSD","id":1,"side":"Buy","size":3,"price":85}]}"#;
        assert_eq!(sim.process_message_websocket(insert).unwrap(), "orderBookL2");
        assert!(sim.order_book().get(&key(17999992000, Side::Sell)).is_none());
        assert_eq!(sim.diagnostics().crossed_purged, 1);
        assert_eq!(sim.drain_anomalies().len(), 1);
        assert!(sim.diagnostics().events().is_empty());
    }

    #[test]
    fn test_unknown_action_is_fatal() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        let line = br#"{"table":"orderBookL2","action":"replace","data":[]}"#;
        let err = sim.process_message_websocket(line).unwrap_err();
        assert!(matches!(err, SimulatorError::UnknownAction(a) if a == "replace"));
    }

    #[test]
    fn test_malformed_is_fatal() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        let err = sim.process_message_websocket(b"pong").unwrap_err();
        assert!(matches!(err, SimulatorError::Decode { structure: "bitmex frame", .. }));

        let bad_rows = br#"{"table":"orderBookL2","action":"insert","data":[{"symbol":"XBTUSD","id":"x","side":"Buy"}]}"#;
        let err = sim.process_message_websocket(bad_rows).unwrap_err();
        assert!(matches!(err, SimulatorError::Decode { structure: "orderBookL2 data", .. }));
    }

    #[test]
    fn test_other_tables_ignored() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        let trade = br#"{"table":"trade","action":"insert","data":[{"symbol":"XBTUSD","side":"Buy","size":1,"price":70}]}"#;
        assert_eq!(sim.process_message_websocket(trade).unwrap(), "trade");
        assert!(sim.order_book().is_empty());
    }

    #[test]
    fn test_filter_blocks_tracking_and_mutation() {
        let mut sim = BitmexSimulator::new(ChannelFilter::from_list(Some(vec!["trade".into()])));
        assert_eq!(sim.process_message_websocket(ACK).unwrap(), "orderBookL2");
        assert!(!sim.subscriptions().is_subscribed("orderBookL2"));
        assert_eq!(sim.process_message_websocket(PARTIAL).unwrap(), "orderBookL2");
        assert!(sim.order_book().is_empty());

        sim.process_state("orderBookL2", br#"[{"symbol":"XBTUSD","id":1,"side":"Buy","size":1,"price":1}]"#)
            .unwrap();
        assert!(sim.order_book().is_empty());
        assert!(matches!(sim.take_state_snapshot(), Err(SimulatorError::FilteredStateIncomplete)));
    }

    #[test]
    fn test_state_roundtrip() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        sim.process_message_websocket(ACK).unwrap();
        sim.process_message_websocket(PARTIAL).unwrap();
        let snaps = sim.take_state_snapshot().unwrap();

        let mut restored = BitmexSimulator::new(ChannelFilter::Absent);
        for snap in &snaps {
            restored.process_state(&snap.channel, &snap.payload).unwrap();
        }
        assert_eq!(restored.order_book(), sim.order_book());
        assert!(restored.subscriptions().is_subscribed("orderBookL2"));
        assert_eq!(restored.take_state_snapshot().unwrap(), snaps);
    }

    #[test]
    fn test_send_and_start_are_inert() {
        let mut sim = BitmexSimulator::new(ChannelFilter::Absent);
        sim.process_start(b"wss://www.bitmex.com/realtime?subscribe=orderBookL2").unwrap();
        assert_eq!(sim.process_send(br#"{"op":"ping"}"#).unwrap(), CHANNEL_UNKNOWN);
        assert!(sim.subscriptions().is_empty());
    }
}
