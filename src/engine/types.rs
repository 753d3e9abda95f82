use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::simulator::error::SimulatorError;

/// Book side. The derived ordering (Buy < Sell) is the emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// Composite key of a resting order: (symbol, side, order id).
///
/// Field order matters: the derived `Ord` sorts by symbol, then side, then id,
/// which is exactly the order both snapshot forms emit entries in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey {
    pub symbol: String,
    pub side: Side,
    pub id: i64,
}

impl OrderKey {
    pub fn new(symbol: impl Into<String>, side: Side, id: i64) -> Self {
        Self { symbol: symbol.into(), side, id }
    }
}

// Resting order payload. Price and side never change once inserted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderEntry {
    pub price: f64,
    pub size: u64,
}

/// Incremental instruction carried by an order-book data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookAction {
    Partial,
    Insert,
    Update,
    Delete,
}

impl BookAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookAction::Partial => "partial",
            BookAction::Insert => "insert",
            BookAction::Update => "update",
            BookAction::Delete => "delete",
        }
    }
}

impl FromStr for BookAction {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partial" => Ok(BookAction::Partial),
            "insert" => Ok(BookAction::Insert),
            "update" => Ok(BookAction::Update),
            "delete" => Ok(BookAction::Delete),
            other => Err(SimulatorError::UnknownAction(other.to_string())),
        }
    }
}

/// One typed element of a delta, already decoded from the venue's wire shape.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDelta {
    pub symbol: String,
    pub side: Side,
    pub id: i64,
    pub price: f64,
    pub size: u64,
}

impl BookDelta {
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.symbol.clone(), self.side, self.id)
    }
}
