//! Usage ledger for translation keys
//!
//! Records which cache keys were actually resolved, and on which day, so
//! the server can garbage-collect translations nobody reads anymore. The
//! ledger accumulates in memory and is drained when a report is sent;
//! on a failed send the drained entries are put back.

use chrono::Utc;
use std::collections::HashMap;

/// In-memory record of key usage, keyed by lookup key with the last
/// day of use as the value
#[derive(Debug, Default, Clone)]
pub struct UsageLedger {
    entries: HashMap<String, String>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a key as used today, overwriting any earlier date
    pub fn record(&mut self, key: &str) {
        self.entries.insert(key.to_string(), today());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Takes every accumulated entry, leaving the ledger empty
    pub fn drain(&mut self) -> HashMap<String, String> {
        std::mem::take(&mut self.entries)
    }

    /// Puts entries back after a failed report
    ///
    /// Keys recorded again since the drain keep their newer date.
    pub fn restore(&mut self, entries: HashMap<String, String>) {
        for (key, date) in entries {
            self.entries.entry(key).or_insert(date);
        }
    }
}

pub(crate) fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}
