//! Bookkeeping for outstanding fetch tasks.

use crate::fetcher::Fetcher;
use crate::metrics::{bump, Metrics};
use crate::task::{FetchTask, TaskId};

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use parking_lot::Mutex;

struct Tasks<K> {
  by_id: HashMap<TaskId, Arc<FetchTask<K>>>,
  /// Newest task per key.
  live: HashMap<K, TaskId>,
}

/// Tracks every fetch task from registration until its completion has been
/// settled, and guarantees at most one outstanding task per key.
pub struct TaskRegistry<K: Eq + Hash + Clone + Send + Sync, V: Send> {
  tasks: Mutex<Tasks<K>>,
  fetcher: Fetcher<K, V>,
  metrics: Arc<Metrics>,
}

impl<K, V> fmt::Debug for TaskRegistry<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + 'static,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskRegistry")
      .field("registered", &self.len())
      .finish_non_exhaustive()
  }
}

impl<K, V> TaskRegistry<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + 'static,
  V: Send + 'static,
{
  pub(crate) fn new(fetcher: Fetcher<K, V>, metrics: Arc<Metrics>) -> Self {
    Self {
      tasks: Mutex::new(Tasks {
        by_id: HashMap::new(),
        live: HashMap::new(),
      }),
      fetcher,
      metrics,
    }
  }

  /// Creates and starts a fetch for `key` unless one is already pending or
  /// running.
  ///
  /// Returns `true` if a new task was started. A task whose cancellation was
  /// requested no longer blocks its key.
  pub fn try_register(&self, key: &K) -> bool {
    bump(&self.metrics.register_attempts);

    let task = {
      let mut tasks = self.tasks.lock();
      let outstanding = tasks
        .live
        .get(key)
        .and_then(|id| tasks.by_id.get(id))
        .is_some_and(|task| task.is_outstanding());
      if outstanding {
        drop(tasks);
        bump(&self.metrics.registrations_deduplicated);
        tracing::trace!("fetch already outstanding, skipping");
        return false;
      }

      let task = Arc::new(FetchTask::new(key.clone()));
      tasks.by_id.insert(task.id(), task.clone());
      tasks.live.insert(key.clone(), task.id());
      task
    };

    self.fetcher.launch(task);
    true
  }

  /// Requests cancellation of every registered task without waiting for any
  /// worker.
  ///
  /// Returns the number of tasks this call moved to `Cancelled`.
  pub fn cancel_all(&self) -> usize {
    let snapshot = self.outstanding();
    let mut cancelled = 0;
    for task in snapshot {
      if task.cancel() {
        cancelled += 1;
        bump(&self.metrics.tasks_cancelled);
      }
    }
    if cancelled > 0 {
      tracing::debug!(cancelled, "cancelled outstanding fetches");
    }
    cancelled
  }

  /// Forgets a settled task. Idempotent.
  pub fn remove(&self, task: &FetchTask<K>) {
    let mut tasks = self.tasks.lock();
    if tasks.by_id.remove(&task.id()).is_none() {
      return;
    }
    if tasks.live.get(task.key()) == Some(&task.id()) {
      tasks.live.remove(task.key());
    }
  }

  /// Whether `key` has a pending or running task.
  pub fn is_outstanding(&self, key: &K) -> bool {
    let tasks = self.tasks.lock();
    tasks
      .live
      .get(key)
      .and_then(|id| tasks.by_id.get(id))
      .is_some_and(|task| task.is_outstanding())
  }

  /// Handles to every registered task that is still pending or running.
  pub fn outstanding(&self) -> Vec<Arc<FetchTask<K>>> {
    self
      .tasks
      .lock()
      .by_id
      .values()
      .filter(|task| task.is_outstanding())
      .cloned()
      .collect()
  }

  /// Registered tasks, including cancelled ones whose completion has not been
  /// settled yet.
  pub fn len(&self) -> usize {
    self.tasks.lock().by_id.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
