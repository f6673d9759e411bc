use crate::{AnalysisError, Result, SnapshotDriver};
use rdb::Entry;
use std::collections::VecDeque;

/// Scripted driver. Each queue repeats its last reply once drained.
#[derive(Debug, Default)]
pub struct FakeDriver {
    pub roles: VecDeque<String>,
    pub persistence: VecDeque<String>,
    pub fail_info: bool,
    pub bgsaves: u32,
    pub info_calls: u32,
}

impl FakeDriver {
    pub fn replica() -> Self {
        Self {
            roles: VecDeque::from(vec!["slave".to_string()]),
            persistence: VecDeque::from(vec![persistence(0, "ok")]),
            ..Self::default()
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_persistence(mut self, replies: Vec<String>) -> Self {
        self.persistence = replies.into();
        self
    }
}

fn next(queue: &mut VecDeque<String>) -> String {
    if queue.len() > 1 {
        queue.pop_front().unwrap_or_default()
    } else {
        queue.front().cloned().unwrap_or_default()
    }
}

impl SnapshotDriver for FakeDriver {
    fn info(&mut self, section: &str) -> Result<String> {
        self.info_calls += 1;
        if self.fail_info {
            return Err(AnalysisError::Driver("connection refused".to_string()));
        }
        match section {
            "replication" => Ok(format!("# Replication\r\nrole:{}\r\nconnected_slaves:0\r\n", next(&mut self.roles))),
            "persistence" => Ok(next(&mut self.persistence)),
            other => Err(AnalysisError::Driver(format!("unexpected section {}", other))),
        }
    }

    fn bgsave(&mut self) -> Result<()> {
        self.bgsaves += 1;
        Ok(())
    }
}

pub fn persistence(in_progress: u8, status: &str) -> String {
    format!(
        "# Persistence\r\nloading:0\r\nrdb_bgsave_in_progress:{}\r\nrdb_last_bgsave_status:{}\r\n",
        in_progress, status
    )
}

pub fn entry(id: u64, key: &str, overhead: u64, expiring: bool) -> Entry {
    Entry {
        id,
        db: 0,
        key: key.to_string(),
        is_base: true,
        is_expiring: expiring,
        expire_ms: if expiring { 60_000 } else { 0 },
        overhead,
        script: None,
    }
}
