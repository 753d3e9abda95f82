// Bitmex realtime API wire shapes.
// Source: https://www.bitmex.com/app/wsAPI (subscribe acks, info/error, table frames)

use serde::{Deserialize, Serialize};

use crate::engine::types::{BookDelta, Side};

pub const TABLE_ORDER_BOOK_L2: &str = "orderBookL2";

/// Every server frame decoded loosely; which fields are present decides the
/// kind of frame.
#[derive(Debug, Deserialize)]
pub struct BitmexEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub subscribe: Option<String>,
    #[serde(default)]
    pub info: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

// {"success":true,"subscribe":"orderBookL2","request":{"op":"subscribe","args":["orderBookL2"]}}
#[derive(Debug, Serialize)]
pub struct BitmexSubscribeAck<'a> {
    pub success: bool,
    pub subscribe: &'a str,
    pub request: BitmexRequest<'a>,
}

#[derive(Debug, Serialize)]
pub struct BitmexRequest<'a> {
    pub op: &'a str,
    pub args: Vec<&'a str>,
}

impl<'a> BitmexSubscribeAck<'a> {
    pub fn new(channel: &'a str) -> Self {
        Self {
            success: true,
            subscribe: channel,
            request: BitmexRequest { op: "subscribe", args: vec![channel] },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BitmexTableFrame<'a> {
    pub table: &'a str,
    pub action: &'a str,
    pub data: &'a [BitmexOrderBookL2Element],
}

/// One row of the orderBookL2 table. `update` rows omit price and `delete`
/// rows omit size, hence the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitmexOrderBookL2Element {
    pub symbol: String,
    pub id: i64,
    pub side: Side,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub price: f64,
}

impl From<BitmexOrderBookL2Element> for BookDelta {
    fn from(e: BitmexOrderBookL2Element) -> Self {
        BookDelta { symbol: e.symbol, side: e.side, id: e.id, price: e.price, size: e.size }
    }
}
