//! The completion queue between fetch workers and the scheduler thread.

use crate::task::{FetchTask, Outcome};

use std::sync::Arc;

use fibre::mpsc;

/// Default number of unsettled completions buffered before workers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A worker's report for one task.
pub(crate) struct Completion<K, V> {
  pub(crate) task: Arc<FetchTask<K>>,
  pub(crate) outcome: Outcome<V>,
}

/// Worker side of the queue. Cheap to clone; one per in-flight job.
pub(crate) struct CompletionSender<K: Send + Sync, V: Send> {
  tx: mpsc::BoundedSender<Completion<K, V>>,
}

impl<K: Send + Sync, V: Send> Clone for CompletionSender<K, V> {
  fn clone(&self) -> Self {
    Self { tx: self.tx.clone() }
  }
}

impl<K: Send + Sync, V: Send> CompletionSender<K, V> {
  /// Blocks while the queue is full. Returns `false` once the scheduler has
  /// shut down and the completion was dropped.
  pub(crate) fn post(&self, completion: Completion<K, V>) -> bool {
    self.tx.send(completion).is_ok()
  }
}

/// Scheduler side of the queue.
pub(crate) struct CompletionReceiver<K: Send + Sync, V: Send> {
  rx: mpsc::BoundedReceiver<Completion<K, V>>,
}

impl<K: Send + Sync, V: Send> CompletionReceiver<K, V> {
  /// The next completion, if one is ready.
  pub(crate) fn poll(&self) -> Option<Completion<K, V>> {
    self.rx.try_recv().ok()
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.rx.len()
  }
}

pub(crate) fn completion_queue<K: Send + Sync, V: Send>(
  capacity: usize,
) -> (CompletionSender<K, V>, CompletionReceiver<K, V>) {
  let (tx, rx): (
    mpsc::BoundedSender<Completion<K, V>>,
    mpsc::BoundedReceiver<Completion<K, V>>,
  ) = mpsc::bounded(capacity);
  (CompletionSender { tx }, CompletionReceiver { rx })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn completions_arrive_in_post_order_from_one_worker() {
    let (tx, rx) = completion_queue::<u32, u32>(4);
    for n in 0..3 {
      let task = Arc::new(FetchTask::new(n));
      assert!(tx.post(Completion {
        task,
        outcome: Outcome::Fetched(n * 10),
      }));
    }
    assert_eq!(rx.len(), 3);

    let mut seen = Vec::new();
    while let Some(completion) = rx.poll() {
      if let Outcome::Fetched(value) = completion.outcome {
        seen.push((*completion.task.key(), value));
      }
    }
    assert_eq!(seen, vec![(0, 0), (1, 10), (2, 20)]);
  }

  #[test]
  fn post_fails_after_receiver_is_dropped() {
    let (tx, rx) = completion_queue::<u32, u32>(4);
    drop(rx);
    let posted = tx.post(Completion {
      task: Arc::new(FetchTask::new(1)),
      outcome: Outcome::Abandoned,
    });
    assert!(!posted);
  }
}
