//! In-memory stock status tracking for the current run
//!
//! Cheaply filters out steady-state products before the durable store is
//! consulted. Starts empty on every process start.

use crate::stock::ProductRecord;
use std::collections::HashMap;

/// Outcome of comparing a new stock status against the last known one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub changed: bool,
    /// `None` when this layer has never seen the product
    pub previous: Option<bool>,
}

impl Observation {
    /// Shared change rule: a first sighting counts only when in stock,
    /// afterwards any differing value counts.
    pub fn compare(previous: Option<bool>, current: bool) -> Self {
        let changed = match previous {
            None => current,
            Some(prev) => prev != current,
        };
        Self { changed, previous }
    }

    /// True for a change that ends in stock (out-of-stock or unseen before)
    pub fn is_restock(&self, current: bool) -> bool {
        self.changed && current && self.previous != Some(true)
    }
}

/// Last seen stock status per product id, for this run only
#[derive(Debug, Default)]
pub struct StockState {
    last_status: HashMap<String, bool>,
}

impl StockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the product's current status and report whether it changed.
    pub fn observe(&mut self, record: &ProductRecord) -> Observation {
        let previous = self
            .last_status
            .insert(record.id.clone(), record.in_stock);
        Observation::compare(previous, record.in_stock)
    }

    pub fn get(&self, id: &str) -> Option<bool> {
        self.last_status.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.last_status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_status.is_empty()
    }
}
