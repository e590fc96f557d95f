//! Push-style progress observation.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tokio::sync::watch;
use tokio::time::{Instant, timeout_at};

use super::{TaskId, TaskProgress, TaskRegistry};

/// Default time an observer follows a task before giving up.
pub const DEFAULT_POLL_WINDOW: Duration = Duration::from_secs(600);

/// Stream of progress records for one task.
pub type ProgressStream = BoxStream<'static, TaskProgress>;

enum Follow {
    Start(watch::Receiver<TaskProgress>),
    Watching(watch::Receiver<TaskProgress>),
    Done,
}

/// Follow task `id`: yield its current record, then each replacement.
///
/// The stream ends after a terminal record, when the task is dropped from the
/// registry, or once `window` has elapsed. The window bounds observation
/// only; the task itself keeps running. Returns `None` for unknown ids.
#[must_use]
pub fn progress_stream(
    registry: &TaskRegistry,
    id: &TaskId,
    window: Duration,
) -> Option<ProgressStream> {
    let receiver = registry.subscribe(id)?;
    let deadline = Instant::now() + window;
    let records = stream::unfold(Follow::Start(receiver), move |state| async move {
        match state {
            Follow::Start(receiver) => Some(emit(receiver)),
            Follow::Watching(mut receiver) => {
                match timeout_at(deadline, receiver.changed()).await {
                    Ok(Ok(())) => Some(emit(receiver)),
                    Ok(Err(_)) | Err(_) => None,
                }
            }
            Follow::Done => None,
        }
    });
    Some(records.boxed())
}

fn emit(mut receiver: watch::Receiver<TaskProgress>) -> (TaskProgress, Follow) {
    let record = receiver.borrow_and_update().clone();
    let state = if record.is_terminal() {
        Follow::Done
    } else {
        Follow::Watching(receiver)
    };
    (record, state)
}
