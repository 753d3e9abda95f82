// Order-book reconstruction core
pub mod types;       // composite key, entries, typed deltas
pub mod book;        // flat keyed store + delta application
pub mod diagnostics; // soft anomaly counters
