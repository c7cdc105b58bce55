//! A single cancellable fetch and its state machine.

use crate::error::FetchError;

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a fetch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
  fn next() -> Self {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
  }
}

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Lifecycle of a fetch task.
///
/// `Pending → Running → {Succeeded, Failed, Cancelled}`, or straight from
/// `Pending` to `Cancelled`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
  Pending = 0,
  Running = 1,
  Succeeded = 2,
  Failed = 3,
  Cancelled = 4,
}

impl TaskState {
  fn from_u8(raw: u8) -> Self {
    match raw {
      0 => TaskState::Pending,
      1 => TaskState::Running,
      2 => TaskState::Succeeded,
      3 => TaskState::Failed,
      _ => TaskState::Cancelled,
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      TaskState::Succeeded | TaskState::Failed | TaskState::Cancelled
    )
  }
}

/// What a worker produced for a task.
pub(crate) enum Outcome<V> {
  Fetched(V),
  Failed(FetchError),
  /// The worker saw the cancellation and stopped early.
  Abandoned,
}

/// One fetch+decode unit of work for a key.
///
/// Shared between the registry, the worker running it and the completion
/// that reports it; every state change is a compare-and-swap so exactly one
/// terminal transition can win.
pub struct FetchTask<K> {
  id: TaskId,
  key: K,
  state: AtomicU8,
}

impl<K: fmt::Debug> fmt::Debug for FetchTask<K> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FetchTask")
      .field("id", &self.id)
      .field("key", &self.key)
      .field("state", &self.state())
      .finish()
  }
}

impl<K> FetchTask<K> {
  pub(crate) fn new(key: K) -> Self {
    Self {
      id: TaskId::next(),
      key,
      state: AtomicU8::new(TaskState::Pending as u8),
    }
  }

  pub fn id(&self) -> TaskId {
    self.id
  }

  pub fn key(&self) -> &K {
    &self.key
  }

  pub fn state(&self) -> TaskState {
    TaskState::from_u8(self.state.load(Ordering::Acquire))
  }

  /// Pending or Running.
  pub fn is_outstanding(&self) -> bool {
    !self.state().is_terminal()
  }

  pub fn is_cancelled(&self) -> bool {
    self.state() == TaskState::Cancelled
  }

  fn transition(&self, from: TaskState, to: TaskState) -> bool {
    self
      .state
      .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  /// Requests cooperative cancellation.
  ///
  /// Returns `true` if this call moved the task to `Cancelled`; `false` if it
  /// had already reached a terminal state.
  pub fn cancel(&self) -> bool {
    let mut current = self.state.load(Ordering::Acquire);
    loop {
      if TaskState::from_u8(current).is_terminal() {
        return false;
      }
      match self.state.compare_exchange_weak(
        current,
        TaskState::Cancelled as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
      ) {
        Ok(_) => return true,
        Err(actual) => current = actual,
      }
    }
  }

  /// Worker picked the task up. Fails if it was cancelled while queued.
  pub(crate) fn begin(&self) -> bool {
    self.transition(TaskState::Pending, TaskState::Running)
  }

  /// Fails if the task was cancelled after its result was produced.
  pub(crate) fn succeed(&self) -> bool {
    self.transition(TaskState::Running, TaskState::Succeeded)
  }

  pub(crate) fn fail(&self) -> bool {
    self.transition(TaskState::Running, TaskState::Failed)
  }
}
