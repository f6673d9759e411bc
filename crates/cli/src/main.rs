//! # rdbmem - per-namespace memory report for a Redis snapshot
//!
//! Runs one analysis pass over an RDB file and prints how much memory each
//! key namespace (the text before the first `:`) would occupy once loaded.
//!
//! ## Usage
//!
//! ```text
//! rdbmem [FILE] [--channel-cap N] [--check-interval-ms N] [--top N] [--json] [--seed N]
//! ```
//!
//! ## Configuration
//!
//! Flags override environment variables, which override defaults:
//!
//! ```text
//! RDBMEM_FILE               snapshot path                 (default: "dump.rdb")
//! RDBMEM_CHANNEL_CAP        walker channel capacity       (default: 4096)
//! RDBMEM_CHECK_INTERVAL_MS  eligibility check spacing     (default: 1000)
//! RDBMEM_LOG                log filter if RUST_LOG unset  (default: "info")
//! RDBMEM_TOP                rows to print, 0 = all        (default: 0)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ rdbmem dump.rdb --top 2
//! NAMESPACE                    KEYS   EXPIRING        OVERHEAD       SIZE
//! session                    120000     120000        38400000   36.6 MiB
//! acct                         5000          0         1200000    1.1 MiB
//! (2 of 7 namespaces, 131042 keys, 12 skipped, 1 scripts)
//! ```

use analysis::{Analyzer, NamespaceOverhead, OverheadTable, PassOptions};
use anyhow::{Context, Result};
use clap::Parser;
use config::AnalyzerConfig;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rdbmem", author, version, about, long_about = None)]
struct Args {
    /// Snapshot file to analyze
    file: Option<PathBuf>,

    /// Capacity of the walker-to-aggregator channel
    #[arg(long)]
    channel_cap: Option<usize>,

    /// Minimum milliseconds between eligibility checks
    #[arg(long)]
    check_interval_ms: Option<u64>,

    /// Print only the N largest namespaces (0 = all)
    #[arg(long)]
    top: Option<usize>,

    /// Emit one JSON object per namespace instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Fixed seed for skip-list level sampling
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn apply(&self, cfg: &mut AnalyzerConfig) {
        if let Some(file) = &self.file {
            cfg.file = file.clone();
        }
        if let Some(cap) = self.channel_cap {
            cfg.channel_capacity = cap.max(1);
        }
        if let Some(ms) = self.check_interval_ms {
            cfg.check_interval = Duration::from_millis(ms);
        }
        if let Some(top) = self.top {
            cfg.top = top;
        }
    }
}

/// Formats a byte count with binary units, one decimal above bytes.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn selected(table: &OverheadTable, top: usize) -> Vec<&NamespaceOverhead> {
    let mut rows = table.by_overhead();
    if top > 0 {
        rows.truncate(top);
    }
    rows
}

fn print_table<W: Write>(out: &mut W, table: &OverheadTable, top: usize) -> io::Result<()> {
    let rows = selected(table, top);
    writeln!(
        out,
        "{:<24} {:>10} {:>10} {:>15} {:>10}",
        "NAMESPACE", "KEYS", "EXPIRING", "OVERHEAD", "SIZE"
    )?;
    for row in &rows {
        writeln!(
            out,
            "{:<24} {:>10} {:>10} {:>15} {:>10}",
            row.namespace,
            row.key_count,
            row.expiring_key_count,
            row.overhead,
            human_size(row.overhead)
        )?;
    }
    writeln!(
        out,
        "({} of {} namespaces, {} keys, {} skipped, {} scripts)",
        rows.len(),
        table.len(),
        table.total_keys(),
        table.skipped_keys(),
        table.scripts()
    )
}

fn print_json<W: Write>(out: &mut W, table: &OverheadTable, top: usize) -> Result<()> {
    for row in selected(table, top) {
        serde_json::to_writer(&mut *out, row).context("failed to serialize row")?;
        writeln!(out)?;
    }
    Ok(())
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut cfg = AnalyzerConfig::from_env();
    args.apply(&mut cfg);
    init_logging(&cfg.log_filter);

    let mut options = PassOptions::from(&cfg);
    options.rng_seed = args.seed;
    info!(
        file = %cfg.file.display(),
        channel_capacity = options.channel_capacity,
        check_interval_ms = options.check_interval.as_millis() as u64,
        "rdbmem starting"
    );

    let analyzer = Analyzer::new(options);
    let report = analyzer
        .run_file(&cfg.file)
        .with_context(|| format!("analysis of {} failed", cfg.file.display()))?;
    info!(
        version = report.summary.version,
        entries = report.summary.entries,
        bytes = report.summary.bytes_read,
        "snapshot walked"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        print_json(&mut out, &report.table, cfg.top)?;
    } else {
        print_table(&mut out, &report.table, cfg.top)?;
    }
    out.flush()?;
    Ok(())
}
