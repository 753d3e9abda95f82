//! Snapshot codecs over a simulator's book and subscriptions.
//!
//! - `wire`: frames a freshly subscribing client would receive from the venue.
//! - `state`: canonical checkpoint lines, only readable by `process_state`.
//!
//! Both walk the store in key order, so identical logical state always
//! produces identical bytes.

pub mod state;
pub mod wire;

use crate::engine::book::OrderBookStore;
use crate::simulator::bitmex_types::BitmexOrderBookL2Element;

/// One emitted frame: the channel it belongs to and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub channel: String,
    pub payload: Vec<u8>,
}

impl Snapshot {
    pub fn new(channel: impl Into<String>, payload: Vec<u8>) -> Self {
        Self { channel: channel.into(), payload }
    }

    /// `<channel>\t<payload>`; compact JSON never contains a raw tab.
    pub fn to_line(&self) -> String {
        format!("{}\t{}", self.channel, String::from_utf8_lossy(&self.payload))
    }

    pub fn parse_line(line: &str) -> Option<Snapshot> {
        let (channel, payload) = line.split_once('\t')?;
        Some(Snapshot::new(channel, payload.as_bytes().to_vec()))
    }
}

pub(crate) fn bitmex_elements(book: &OrderBookStore) -> Vec<BitmexOrderBookL2Element> {
    book.iter()
        .map(|(key, entry)| BitmexOrderBookL2Element {
            symbol: key.symbol.clone(),
            id: key.id,
            side: key.side,
            size: entry.size,
            price: entry.price,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_roundtrip() {
        let snap = Snapshot::new("orderBookL2", br#"[{"symbol":"XBTUSD"}]"#.to_vec());
        let line = snap.to_line();
        assert_eq!(line, "orderBookL2\t[{\"symbol\":\"XBTUSD\"}]");
        assert_eq!(Snapshot::parse_line(&line), Some(snap));
        assert_eq!(Snapshot::parse_line("no tab here"), None);
    }
}
