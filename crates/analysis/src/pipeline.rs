//! One analysis pass: walker thread, bounded channel, aggregator.
//!
//! ```text
//! walker thread                          calling thread
//! Loader::run ──► bounded(cap) ──► Aggregator::add ... ──► finish
//!      │                                                     │
//!      └──────────────── join ◄──────────────────────────────┘
//!                          │ Ok                 │ Err
//!                    publish table        keep previous table
//! ```

use chrono::Utc;
use config::AnalyzerConfig;
use rdb::{AlwaysEligible, EligibilityProbe, LoadSummary, Loader, RdbError};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::driver::{prepare_snapshot, RoleProbe, SnapshotDriver};
use crate::error::{AnalysisError, Result};
use crate::table::{OverheadTable, PublishedTable};

/// Knobs for a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOptions {
    /// Capacity of the walker-to-aggregator channel. At least 1.
    pub channel_capacity: usize,
    /// Minimum spacing between eligibility checks.
    pub check_interval: Duration,
    /// Fixed seed for skip-list levels; random when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self::from(&AnalyzerConfig::default())
    }
}

impl From<&AnalyzerConfig> for PassOptions {
    fn from(cfg: &AnalyzerConfig) -> Self {
        Self {
            channel_capacity: cfg.channel_capacity.max(1),
            check_interval: cfg.check_interval,
            rng_seed: None,
        }
    }
}

/// Outcome of a completed pass.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub summary: LoadSummary,
    pub table: Arc<OverheadTable>,
}

/// Runs passes and owns the published table they feed.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: PassOptions,
    published: PublishedTable,
}

impl Analyzer {
    pub fn new(options: PassOptions) -> Self {
        Self {
            options,
            published: PublishedTable::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &PassOptions {
        &self.options
    }

    /// Handle to the latest published table, shareable with readers.
    #[must_use]
    pub fn published(&self) -> PublishedTable {
        self.published.clone()
    }

    /// Analyzes a snapshot file with no cancellation source.
    pub fn run_file<P: AsRef<Path>>(&self, path: P) -> Result<PassReport> {
        self.run_file_with_probe(path, Box::new(AlwaysEligible))
    }

    pub fn run_file_with_probe<P: AsRef<Path>>(
        &self,
        path: P,
        probe: Box<dyn EligibilityProbe>,
    ) -> Result<PassReport> {
        let path = path.as_ref();
        let file = File::open(path).map_err(RdbError::from)?;
        info!(path = %path.display(), "starting analysis pass");
        self.run_reader(BufReader::new(file), probe)
    }

    /// Snapshots a replica through `driver`, then analyzes the file it
    /// wrote, cancelling if the node stops being a replica mid-pass.
    pub fn run_replica<D, P>(
        &self,
        mut driver: D,
        path: P,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Result<PassReport>
    where
        D: SnapshotDriver + 'static,
        P: AsRef<Path>,
    {
        prepare_snapshot(&mut driver, poll_interval, max_polls)?;
        self.run_file_with_probe(path, Box::new(RoleProbe::new(driver)))
    }

    /// Runs a pass over any byte source.
    ///
    /// The table is published only if the walker finished cleanly; on any
    /// error the previously published table stays in place.
    pub fn run_reader<R>(&self, reader: R, probe: Box<dyn EligibilityProbe>) -> Result<PassReport>
    where
        R: Read + Send + 'static,
    {
        let result = self.pass(reader, probe);
        match &result {
            Ok(report) => {
                self.published.publish(Arc::clone(&report.table));
                info!(
                    namespaces = report.table.len(),
                    keys = report.table.total_keys(),
                    overhead = report.table.total_overhead(),
                    skipped = report.table.skipped_keys(),
                    "analysis published"
                );
            }
            Err(e) => warn!(error = %e, "analysis pass failed, keeping previous table"),
        }
        result
    }

    fn pass<R>(&self, reader: R, probe: Box<dyn EligibilityProbe>) -> Result<PassReport>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(self.options.channel_capacity.max(1));
        let mut loader = Loader::from_reader(reader, tx)
            .with_probe(probe)
            .with_check_interval(self.options.check_interval);
        if let Some(seed) = self.options.rng_seed {
            loader = loader.with_rng_seed(seed);
        }

        let walker = thread::Builder::new()
            .name("rdb-walker".to_string())
            .spawn(move || loader.run())
            .map_err(RdbError::from)?;

        let mut aggregator = Aggregator::new(Utc::now());
        for entry in rx.iter() {
            aggregator.add(&entry);
        }

        let summary = walker
            .join()
            .map_err(|_| AnalysisError::WorkerPanicked)??;

        Ok(PassReport {
            summary,
            table: Arc::new(aggregator.finish()),
        })
    }
}
