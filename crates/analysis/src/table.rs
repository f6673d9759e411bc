//! The published result of the last successful pass.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::aggregate::NamespaceOverhead;

/// Per-namespace totals from one completed pass. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverheadTable {
    analyzed_at: DateTime<Utc>,
    rows: BTreeMap<String, NamespaceOverhead>,
    skipped_keys: u64,
    scripts: u64,
}

impl OverheadTable {
    pub(crate) fn new(
        analyzed_at: DateTime<Utc>,
        rows: BTreeMap<String, NamespaceOverhead>,
        skipped_keys: u64,
        scripts: u64,
    ) -> Self {
        Self {
            analyzed_at,
            rows,
            skipped_keys,
            scripts,
        }
    }

    #[must_use]
    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }

    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&NamespaceOverhead> {
        self.rows.get(namespace)
    }

    /// Rows in namespace order.
    pub fn iter(&self) -> impl Iterator<Item = &NamespaceOverhead> {
        self.rows.values()
    }

    /// Rows by overhead, largest first; ties by namespace.
    #[must_use]
    pub fn by_overhead(&self) -> Vec<&NamespaceOverhead> {
        let mut rows: Vec<_> = self.rows.values().collect();
        rows.sort_by(|a, b| {
            b.overhead
                .cmp(&a.overhead)
                .then_with(|| a.namespace.cmp(&b.namespace))
        });
        rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn total_keys(&self) -> u64 {
        self.rows.values().map(|r| r.key_count).sum()
    }

    #[must_use]
    pub fn total_overhead(&self) -> u64 {
        self.rows.values().map(|r| r.overhead).sum()
    }

    /// Keys dropped because they had no namespace prefix.
    #[must_use]
    pub fn skipped_keys(&self) -> u64 {
        self.skipped_keys
    }

    /// Embedded script entries seen (never attributed).
    #[must_use]
    pub fn scripts(&self) -> u64 {
        self.scripts
    }
}

/// Shared handle to the latest table.
///
/// Readers get an `Arc` snapshot and never see a half-built table; a pass
/// swaps in its table in a single write only after it completes.
#[derive(Debug, Clone, Default)]
pub struct PublishedTable {
    inner: Arc<RwLock<Option<Arc<OverheadTable>>>>,
}

impl PublishedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current table, if any pass has completed.
    #[must_use]
    pub fn current(&self) -> Option<Arc<OverheadTable>> {
        self.inner.read().clone()
    }

    /// Replaces the current table and returns the one it replaced.
    pub fn publish(&self, table: Arc<OverheadTable>) -> Option<Arc<OverheadTable>> {
        self.inner.write().replace(table)
    }
}
