//! Background caching tasks and their observable progress.
//!
//! A [`TaskRegistry`] hands out a [`TaskHandle`] per task. The handle is the
//! only writer of that task's [`TaskProgress`]; every update replaces the
//! whole record, so readers never see a half-written one. Blocking work runs
//! on a [`WorkerPool`], and observers either poll with
//! [`TaskRegistry::snapshot`] or follow a [`progress_stream`].

mod pool;
mod registry;
mod stream;

use rooftally_core::CachedArea;
use serde::{Deserialize, Serialize};

pub use pool::{DEFAULT_WORKERS, PoolError, WorkerPool};
pub use registry::{DEFAULT_GRACE, TaskHandle, TaskRegistry};
pub use stream::{DEFAULT_POLL_WINDOW, ProgressStream, progress_stream};

/// Message of a task that found nothing to cache.
pub const NO_BUILDINGS_MESSAGE: &str = "No buildings found in this area.";

/// Twelve lowercase hex characters identifying a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut hex = uuid::Uuid::new_v4().simple().to_string();
        hex.truncate(12);
        Self(hex)
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, not yet started.
    Queued,
    /// Downloading or writing.
    Running,
    /// Finished, with or without an area.
    Complete,
    /// Failed; see [`TaskProgress::error`].
    Error,
}

impl TaskStatus {
    /// Whether no further updates will follow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Snapshot of a task's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    /// Task the record belongs to.
    pub task_id: TaskId,
    /// Lifecycle stage.
    pub status: TaskStatus,
    /// Percent complete, 0 to 100.
    pub progress: u8,
    /// Human-readable phase description.
    pub message: String,
    /// The cached area, once complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<CachedArea>,
    /// Failure text, once errored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskProgress {
    /// Initial record of a new task.
    #[must_use]
    pub fn queued(task_id: TaskId) -> Self {
        Self {
            task_id,
            status: TaskStatus::Queued,
            progress: 0,
            message: "Queued...".to_owned(),
            area: None,
            error: None,
        }
    }

    /// Whether the task has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn generated_ids_are_twelve_hex_chars() {
        let id = TaskId::generate();
        assert_eq!(id.as_str().len(), 12);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[rstest]
    #[case(TaskStatus::Queued, "\"queued\"", false)]
    #[case(TaskStatus::Running, "\"running\"", false)]
    #[case(TaskStatus::Complete, "\"complete\"", true)]
    #[case(TaskStatus::Error, "\"error\"", true)]
    fn status_wire_names(#[case] status: TaskStatus, #[case] json: &str, #[case] terminal: bool) {
        assert_eq!(serde_json::to_string(&status).expect("serialise"), json);
        assert_eq!(status.is_terminal(), terminal);
    }

    #[rstest]
    fn queued_record_omits_empty_fields() {
        let record = TaskProgress::queued(TaskId::from("abc123abc123"));
        let json = serde_json::to_value(&record).expect("serialise");

        assert_eq!(json["status"], "queued");
        assert_eq!(json["progress"], 0);
        assert_eq!(json["message"], "Queued...");
        assert!(json.get("area").is_none());
        assert!(json.get("error").is_none());
    }
}
