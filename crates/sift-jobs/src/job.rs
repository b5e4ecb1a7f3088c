//! Index job identifiers and records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an index job.
///
/// Internally represented as a UUID v4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a job ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The index-affecting operation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Rebuild the schema from configuration.
    CreateIndex,
    /// Reindex every item.
    UpdateIndex,
    /// Drop every document.
    DeleteIndex,
    /// Drop and recreate the collection, then rebuild and reindex.
    RecreateIndex,
    /// Reindex one item.
    ReindexItem,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::CreateIndex => write!(f, "create_index"),
            JobKind::UpdateIndex => write!(f, "update_index"),
            JobKind::DeleteIndex => write!(f, "delete_index"),
            JobKind::RecreateIndex => write!(f, "recreate_index"),
            JobKind::ReindexItem => write!(f, "reindex_item"),
        }
    }
}

/// Lifecycle state of a job: created, then running, then done or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Recorded, not yet started.
    Created,
    /// Work in progress.
    Running,
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Error,
}

impl JobStatus {
    /// Returns `true` for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    /// Returns `true` if a job may move from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Created, JobStatus::Running)
                | (JobStatus::Created, JobStatus::Error)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "created"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// One asynchronous index-affecting operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexJob {
    /// Job id.
    pub id: JobId,
    /// Operation performed.
    pub kind: JobKind,
    /// Lock guarding the job.
    pub lock_resource: String,
    /// Current status.
    pub status: JobStatus,
    /// Error message of a failed job.
    pub error: Option<String>,
    /// When the job was recorded.
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl IndexJob {
    /// Record a new job.
    pub fn new(kind: JobKind, lock_resource: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            kind,
            lock_resource: lock_resource.into(),
            status: JobStatus::Created,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_job_id_display_parse() {
        let id = JobId::new();
        let parsed: JobId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(JobStatus::Created.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Done));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Error));
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Created.can_transition_to(JobStatus::Done));
        assert!(JobStatus::Error.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_new_job() {
        let job = IndexJob::new(JobKind::RecreateIndex, "index");
        assert_eq!(job.status, JobStatus::Created);
        assert_eq!(job.kind.to_string(), "recreate_index");
        assert!(job.finished_at.is_none());
    }

    proptest! {
        #[test]
        fn test_job_id_roundtrip(raw in any::<u128>()) {
            let id = JobId::from_uuid(Uuid::from_u128(raw));
            let parsed: JobId = id.to_string().parse().unwrap();
            prop_assert_eq!(id, parsed);
            prop_assert_eq!(id.as_uuid(), &Uuid::from_u128(raw));
        }
    }
}
