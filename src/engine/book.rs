use std::collections::BTreeMap;
use std::ops::Bound;

use tracing::{debug, error, instrument, trace};

use crate::engine::diagnostics::{Anomaly, Diagnostics};
use crate::engine::types::{BookAction, BookDelta, OrderEntry, OrderKey, Side};

/// Level-3 book for every symbol of one venue, flattened under a single
/// composite key. The `BTreeMap` keeps entries in emission order, so
/// snapshots never depend on hashing or insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OrderBookStore {
    orders: BTreeMap<OrderKey, OrderEntry>,
}

impl OrderBookStore {
    pub fn new() -> Self {
        Self { orders: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn get(&self, key: &OrderKey) -> Option<&OrderEntry> {
        self.orders.get(key)
    }

    /// All entries ordered by symbol, then side (Buy first), then id.
    pub fn iter(&self) -> impl Iterator<Item = (&OrderKey, &OrderEntry)> {
        self.orders.iter()
    }

    /// Distinct symbols, ascending.
    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for key in self.orders.keys() {
            if out.last() != Some(&key.symbol.as_str()) {
                out.push(key.symbol.as_str());
            }
        }
        out
    }

    /// Entries of one side of one symbol, ordered by id.
    pub fn side<'a>(&'a self, symbol: &'a str, side: Side) -> impl Iterator<Item = (&'a OrderKey, &'a OrderEntry)> + 'a {
        let lo = OrderKey::new(symbol, side, i64::MIN);
        self.orders
            .range::<OrderKey, _>((Bound::Included(lo), Bound::Unbounded))
            .take_while(move |(k, _)| k.symbol == symbol && k.side == side)
    }

    // Same walk as `side`, starting from a caller-built lower bound.
    fn side_from<'a>(&'a self, lo: &'a OrderKey) -> impl Iterator<Item = (&'a OrderKey, &'a OrderEntry)> + 'a {
        self.orders
            .range::<OrderKey, _>((Bound::Included(lo), Bound::Unbounded))
            .take_while(move |(k, _)| k.symbol == lo.symbol && k.side == lo.side)
    }

    /// Highest bid price with the aggregated size resting at it.
    pub fn best_bid(&self, symbol: &str) -> Option<(f64, u64)> {
        let best = self
            .side(symbol, Side::Buy)
            .map(|(_, e)| e.price)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))))?;
        trace!(symbol, price = best, "Found best bid");
        Some((best, self.size_at(symbol, Side::Buy, best)))
    }

    /// Lowest ask price with the aggregated size resting at it.
    pub fn best_ask(&self, symbol: &str) -> Option<(f64, u64)> {
        let best = self
            .side(symbol, Side::Sell)
            .map(|(_, e)| e.price)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p))))?;
        trace!(symbol, price = best, "Found best ask");
        Some((best, self.size_at(symbol, Side::Sell, best)))
    }

    fn size_at(&self, symbol: &str, side: Side, price: f64) -> u64 {
        self.side(symbol, side)
            .filter(|(_, e)| e.price == price)
            .map(|(_, e)| e.size)
            .fold(0u64, |acc, size| {
                acc.checked_add(size).unwrap_or_else(|| {
                    error!(symbol, side = %side, price, "Aggregated size overflows u64, saturating");
                    u64::MAX
                })
            })
    }

    /// Applies every element of one delta frame in order. Nothing here fails;
    /// soft anomalies are recorded into `diag`.
    #[instrument(level = "debug", skip_all, fields(action = action.as_str(), n = deltas.len()))]
    pub fn apply(&mut self, action: BookAction, deltas: &[BookDelta], diag: &mut Diagnostics) {
        for delta in deltas {
            match action {
                BookAction::Partial | BookAction::Insert => self.upsert(delta, diag),
                BookAction::Update => self.update_size(delta, diag),
                BookAction::Delete => self.remove(delta),
            }
        }
    }

    fn upsert(&mut self, delta: &BookDelta, diag: &mut Diagnostics) {
        let mut bound = delta.key();
        self.orders.insert(bound.clone(), OrderEntry { price: delta.price, size: delta.size });
        trace!(symbol = %delta.symbol, side = %delta.side, id = delta.id, price = delta.price, size = delta.size, "Upserted order");

        // reuse the key as the lower bound of the opposite side
        bound.side = delta.side.opposite();
        bound.id = i64::MIN;
        self.purge_crossed(&bound, delta, diag);
    }

    // A new bid above a resting ask (or a new ask below a resting bid) means
    // the resting order is stale. Only the opposite side of the same symbol
    // is scanned.
    fn purge_crossed(&mut self, opposite: &OrderKey, trigger: &BookDelta, diag: &mut Diagnostics) {
        let crossed: Vec<(OrderKey, OrderEntry)> = self
            .side_from(opposite)
            .filter(|(_, e)| match trigger.side {
                Side::Buy => e.price < trigger.price,
                Side::Sell => e.price > trigger.price,
            })
            .map(|(k, e)| (k.clone(), *e))
            .collect();

        for (key, entry) in crossed {
            self.orders.remove(&key);
            diag.record(Anomaly::CrossedPurge {
                purged: key,
                purged_entry: entry,
                trigger: trigger.key(),
                trigger_price: trigger.price,
            });
        }
    }

    fn update_size(&mut self, delta: &BookDelta, diag: &mut Diagnostics) {
        let key = delta.key();
        match self.orders.get_mut(&key) {
            Some(entry) => {
                entry.size = delta.size;
                trace!(symbol = %key.symbol, id = key.id, size = delta.size, "Updated order size");
            }
            None => diag.record(Anomaly::UpdateMissing { key, size: delta.size }),
        }
    }

    fn remove(&mut self, delta: &BookDelta) {
        if self.orders.remove(&delta.key()).is_none() {
            debug!(symbol = %delta.symbol, side = %delta.side, id = delta.id, "Delete for absent order ignored");
        }
    }
}
