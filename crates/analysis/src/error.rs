use rdb::RdbError;
use thiserror::Error;

/// Why an analysis pass did not publish a table.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The snapshot could not be decoded, or the walker was cancelled.
    #[error(transparent)]
    Rdb(#[from] RdbError),

    /// The node reports `role:master`; snapshots are only taken on replicas.
    #[error("node is a primary, refusing to snapshot it")]
    PrimaryNode,

    /// `rdb_last_bgsave_status` was not `ok` after the save finished.
    #[error("background save failed with status {0:?}")]
    SnapshotFailed(String),

    #[error("background save still running after {0} polls")]
    SnapshotTimeout(u32),

    /// The driver could not talk to the node.
    #[error("driver error: {0}")]
    Driver(String),

    #[error("snapshot walker thread panicked")]
    WorkerPanicked,
}

impl AnalysisError {
    /// `true` when the source itself is unavailable (primary role, failed or
    /// stuck save, or cancelled mid-pass) rather than the file being bad.
    #[must_use]
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            AnalysisError::PrimaryNode
                | AnalysisError::SnapshotFailed(_)
                | AnalysisError::SnapshotTimeout(_)
                | AnalysisError::Rdb(RdbError::SourceIneligible)
        )
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
