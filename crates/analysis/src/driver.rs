//! Triggering a fresh snapshot on a replica.
//!
//! The node is reached through [`SnapshotDriver`]; no concrete client ships
//! with this crate. The sequence is:
//!
//! ```text
//! INFO replication ── role:master? ──► PrimaryNode
//!        │
//!     BGSAVE
//!        │
//! INFO persistence ◄─┐  rdb_bgsave_in_progress:1, sleep
//!        │───────────┘
//!        │ rdb_bgsave_in_progress:0
//! rdb_last_bgsave_status:ok? ──► otherwise SnapshotFailed
//! ```

use rdb::EligibilityProbe;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{AnalysisError, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// One hour at the default poll interval.
pub const DEFAULT_MAX_POLLS: u32 = 3600;

/// Minimal command surface needed to snapshot a node.
pub trait SnapshotDriver: Send {
    /// Raw `INFO <section>` reply.
    fn info(&mut self, section: &str) -> Result<String>;
    /// Issues `BGSAVE`.
    fn bgsave(&mut self) -> Result<()>;
}

/// Looks up `prop` in an `INFO` reply.
///
/// Lines are `name:value`, separated by `\r\n` (bare `\n` is accepted).
/// Section headers and blank lines have no `:` and are ignored.
#[must_use]
pub fn parse_info_prop<'a>(info: &'a str, prop: &str) -> Option<&'a str> {
    info.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| *name == prop)
        .map(|(_, value)| value)
}

/// Runs the role check, `BGSAVE` and completion polling.
///
/// Returns once the save has finished with status `ok`. Polls at most
/// `max_polls` times, sleeping `poll_interval` between polls.
pub fn prepare_snapshot<D>(driver: &mut D, poll_interval: Duration, max_polls: u32) -> Result<()>
where
    D: SnapshotDriver + ?Sized,
{
    let replication = driver.info("replication")?;
    if parse_info_prop(&replication, "role") == Some("master") {
        return Err(AnalysisError::PrimaryNode);
    }

    driver.bgsave()?;
    info!("background save started");

    let mut polls = 0u32;
    let persistence = loop {
        let reply = driver.info("persistence")?;
        polls += 1;
        if parse_info_prop(&reply, "rdb_bgsave_in_progress") == Some("0") {
            break reply;
        }
        if polls >= max_polls {
            return Err(AnalysisError::SnapshotTimeout(polls));
        }
        thread::sleep(poll_interval);
    };

    match parse_info_prop(&persistence, "rdb_last_bgsave_status") {
        Some("ok") => {
            info!(polls, "background save finished");
            Ok(())
        }
        other => Err(AnalysisError::SnapshotFailed(
            other.unwrap_or("missing").to_string(),
        )),
    }
}

/// Keeps a pass alive only while the node is still a replica.
#[derive(Debug)]
pub struct RoleProbe<D> {
    driver: D,
}

impl<D: SnapshotDriver> RoleProbe<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }
}

impl<D: SnapshotDriver> EligibilityProbe for RoleProbe<D> {
    fn is_eligible(&mut self) -> bool {
        match self.driver.info("replication") {
            Ok(reply) => parse_info_prop(&reply, "role") != Some("master"),
            Err(e) => {
                warn!(error = %e, "role check failed, assuming still a replica");
                true
            }
        }
    }
}
