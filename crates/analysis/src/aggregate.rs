//! Grouping entries into per-namespace totals.
//!
//! A key's namespace is the text before its first `:`. Keys without one, or
//! with an empty prefix, cannot be attributed and are skipped.

use chrono::{DateTime, Utc};
use rdb::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::table::OverheadTable;

/// Memory attributed to one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceOverhead {
    pub namespace: String,
    pub key_count: u64,
    #[serde(rename = "expireKeyCount")]
    pub expiring_key_count: u64,
    /// Estimated heap bytes, including this namespace's share of the
    /// keyspace and expires dict buckets.
    pub overhead: u64,
    #[serde(rename = "analysisDate")]
    pub analyzed_at: DateTime<Utc>,
}

impl NamespaceOverhead {
    fn new(namespace: &str, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            namespace: namespace.to_string(),
            key_count: 0,
            expiring_key_count: 0,
            overhead: 0,
            analyzed_at,
        }
    }
}

/// Returns the namespace of `key`, or `None` if the key has none.
#[must_use]
pub fn namespace_of(key: &str) -> Option<&str> {
    match key.split_once(':') {
        Some((prefix, _)) if !prefix.is_empty() => Some(prefix),
        _ => None,
    }
}

/// Accumulates entries for one pass.
#[derive(Debug)]
pub struct Aggregator {
    rows: BTreeMap<String, NamespaceOverhead>,
    analyzed_at: DateTime<Utc>,
    skipped_keys: u64,
    scripts: u64,
}

impl Aggregator {
    pub fn new(analyzed_at: DateTime<Utc>) -> Self {
        Self {
            rows: BTreeMap::new(),
            analyzed_at,
            skipped_keys: 0,
            scripts: 0,
        }
    }

    /// Folds one entry into its namespace.
    pub fn add(&mut self, entry: &Entry) {
        if entry.is_script() {
            self.scripts += 1;
            debug!(id = entry.id, "script entry not attributed");
            return;
        }
        let Some(namespace) = namespace_of(&entry.key) else {
            self.skipped_keys += 1;
            warn!(key = %entry.key, "key has no namespace prefix, skipping");
            return;
        };

        let analyzed_at = self.analyzed_at;
        let row = self
            .rows
            .entry(namespace.to_string())
            .or_insert_with(|| NamespaceOverhead::new(namespace, analyzed_at));
        row.key_count += 1;
        row.overhead += entry.overhead;
        if entry.is_expiring {
            row.expiring_key_count += 1;
        }
    }

    #[must_use]
    pub fn skipped_keys(&self) -> u64 {
        self.skipped_keys
    }

    /// Adds the database-level bucket costs and freezes the table.
    pub fn finish(mut self) -> OverheadTable {
        apportion_buckets(&mut self.rows, |row| row.key_count);
        apportion_buckets(&mut self.rows, |row| row.expiring_key_count);
        OverheadTable::new(self.analyzed_at, self.rows, self.skipped_keys, self.scripts)
    }
}

/// Spreads `bucket_overhead(total)` over the rows in proportion to `share`,
/// rounding each row's part down. Does nothing when the total is zero.
fn apportion_buckets<F>(rows: &mut BTreeMap<String, NamespaceOverhead>, share: F)
where
    F: Fn(&NamespaceOverhead) -> u64,
{
    let total: u64 = rows.values().map(&share).sum();
    if total == 0 {
        return;
    }
    let cost = u128::from(memprofile::bucket_overhead(total));
    for row in rows.values_mut() {
        let part = cost * u128::from(share(row)) / u128::from(total);
        row.overhead += part as u64;
    }
}
