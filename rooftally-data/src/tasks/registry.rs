//! In-memory registry of task progress channels.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use rooftally_core::CachedArea;
use tokio::sync::watch;

use super::{NO_BUILDINGS_MESSAGE, TaskId, TaskProgress, TaskStatus};
use crate::area_store::ProgressSink;

/// How long a finished task stays visible.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(30);

struct TaskSlot {
    sender: Arc<watch::Sender<TaskProgress>>,
    finished_at: Option<Instant>,
}

type Slots = HashMap<TaskId, TaskSlot>;

/// Registry of live and recently finished tasks.
///
/// Clones share the same tasks.
#[derive(Clone)]
pub struct TaskRegistry {
    slots: Arc<Mutex<Slots>>,
    grace: Duration,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.lock().len())
            .field("grace", &self.grace)
            .finish()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE)
    }
}

impl TaskRegistry {
    /// Create an empty registry keeping finished tasks for `grace`.
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            grace,
        }
    }

    /// Register a new queued task and return its writer.
    #[must_use]
    pub fn create(&self) -> TaskHandle {
        self.purge_expired();
        let id = TaskId::generate();
        let (sender, _) = watch::channel(TaskProgress::queued(id.clone()));
        let sender = Arc::new(sender);
        self.lock().insert(
            id.clone(),
            TaskSlot {
                sender: Arc::clone(&sender),
                finished_at: None,
            },
        );
        debug!("created task {id}");
        TaskHandle {
            id,
            sender,
            registry: self.clone(),
            finished: false,
        }
    }

    /// Latest record for `id`, or `None` if unknown or expired.
    #[must_use]
    pub fn snapshot(&self, id: &TaskId) -> Option<TaskProgress> {
        self.purge_expired();
        self.lock()
            .get(id)
            .map(|slot| slot.sender.borrow().clone())
    }

    /// Receiver observing every replacement of `id`'s record.
    #[must_use]
    pub fn subscribe(&self, id: &TaskId) -> Option<watch::Receiver<TaskProgress>> {
        self.lock().get(id).map(|slot| slot.sender.subscribe())
    }

    /// Drop finished tasks older than the grace period.
    pub fn purge_expired(&self) {
        self.purge_expired_at(Instant::now());
    }

    /// [`Self::purge_expired`] evaluated at `now`.
    pub fn purge_expired_at(&self, now: Instant) {
        let grace = self.grace;
        self.lock().retain(|_, slot| {
            slot.finished_at
                .is_none_or(|finished| now.saturating_duration_since(finished) < grace)
        });
    }

    /// Number of tracked tasks, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no tasks are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn mark_finished(&self, id: &TaskId) {
        if let Some(slot) = self.lock().get_mut(id) {
            slot.finished_at = Some(Instant::now());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sole writer of one task's progress.
///
/// Dropping a handle that never reached a terminal state records an error,
/// so observers are not left waiting on a task that died.
pub struct TaskHandle {
    id: TaskId,
    sender: Arc<watch::Sender<TaskProgress>>,
    registry: TaskRegistry,
    finished: bool,
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl TaskHandle {
    /// Identifier of the task.
    #[must_use]
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Publish a running update. Progress never moves backwards.
    pub fn update(&self, percent: u8, message: &str) {
        let current = self.sender.borrow().clone();
        self.sender.send_replace(TaskProgress {
            status: TaskStatus::Running,
            progress: current.progress.max(percent.min(100)),
            message: message.to_owned(),
            ..current
        });
    }

    /// Finish successfully. `None` means the region held no footprints.
    pub fn complete(mut self, area: Option<CachedArea>) {
        let message = area.as_ref().map_or_else(
            || NO_BUILDINGS_MESSAGE.to_owned(),
            |area| {
                format!(
                    "Cached {} buildings ({:.1} MB)",
                    area.entity_count,
                    area.file_size_mb()
                )
            },
        );
        self.finish(TaskProgress {
            task_id: self.id.clone(),
            status: TaskStatus::Complete,
            progress: 100,
            message,
            area,
            error: None,
        });
    }

    /// Finish with a failure.
    pub fn fail(mut self, error: impl Into<String>) {
        let error = error.into();
        self.finish(TaskProgress {
            task_id: self.id.clone(),
            status: TaskStatus::Error,
            progress: 0,
            message: error.clone(),
            area: None,
            error: Some(error),
        });
    }

    fn finish(&mut self, record: TaskProgress) {
        self.sender.send_replace(record);
        self.finished = true;
        self.registry.mark_finished(&self.id);
    }
}

impl ProgressSink for TaskHandle {
    fn report(&self, percent: u8, message: &str) {
        self.update(percent, message);
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if !self.finished {
            let id = self.id.clone();
            self.finish(TaskProgress {
                task_id: id,
                status: TaskStatus::Error,
                progress: 0,
                message: "task ended without a result".to_owned(),
                area: None,
                error: Some("task ended without a result".to_owned()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn registry() -> TaskRegistry {
        TaskRegistry::default()
    }

    #[rstest]
    fn new_task_is_queued(registry: TaskRegistry) {
        let handle = registry.create();
        let snapshot = registry.snapshot(handle.id()).expect("known task");

        assert_eq!(snapshot.status, TaskStatus::Queued);
        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.message, "Queued...");
        handle.fail("test over");
    }

    #[rstest]
    fn progress_never_moves_backwards(registry: TaskRegistry) {
        let handle = registry.create();
        handle.update(40, "Downloaded 10 buildings...");
        handle.update(20, "late report");

        let snapshot = registry.snapshot(handle.id()).expect("known task");
        assert_eq!(snapshot.status, TaskStatus::Running);
        assert_eq!(snapshot.progress, 40);
        assert_eq!(snapshot.message, "late report");
        handle.fail("test over");
    }

    #[rstest]
    fn empty_completion_has_no_area(registry: TaskRegistry) {
        let handle = registry.create();
        let id = handle.id().clone();
        handle.complete(None);

        let snapshot = registry.snapshot(&id).expect("known task");
        assert_eq!(snapshot.status, TaskStatus::Complete);
        assert_eq!(snapshot.progress, 100);
        assert_eq!(snapshot.message, NO_BUILDINGS_MESSAGE);
        assert!(snapshot.area.is_none());
    }

    #[rstest]
    fn failure_records_message(registry: TaskRegistry) {
        let handle = registry.create();
        let id = handle.id().clone();
        handle.update(30, "Downloading building footprints...");
        handle.fail("network error: connection reset");

        let snapshot = registry.snapshot(&id).expect("known task");
        assert_eq!(snapshot.status, TaskStatus::Error);
        assert_eq!(snapshot.progress, 0);
        assert_eq!(snapshot.error.as_deref(), Some("network error: connection reset"));
    }

    #[rstest]
    fn dropped_handle_records_error(registry: TaskRegistry) {
        let id = {
            let handle = registry.create();
            handle.id().clone()
        };

        let snapshot = registry.snapshot(&id).expect("known task");
        assert_eq!(snapshot.status, TaskStatus::Error);
    }

    #[rstest]
    fn finished_tasks_expire_after_grace(registry: TaskRegistry) {
        let handle = registry.create();
        let id = handle.id().clone();
        let running = registry.create();
        handle.complete(None);

        let later = Instant::now() + DEFAULT_GRACE + Duration::from_secs(1);
        registry.purge_expired_at(later);

        assert!(registry.snapshot(&id).is_none());
        assert!(registry.snapshot(running.id()).is_some(), "running tasks never expire");
        running.fail("test over");
    }

    #[rstest]
    fn unknown_id_has_no_snapshot(registry: TaskRegistry) {
        assert!(registry.snapshot(&TaskId::from("000000000000")).is_none());
        assert!(registry.subscribe(&TaskId::from("000000000000")).is_none());
    }
}
