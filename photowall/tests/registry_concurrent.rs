mod common;

use common::{harness, keys, settle, Gate};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_concurrent_registration_creates_one_task() {
  const THREADS: usize = 16;
  let mut h = harness(keys(1), Gate::closed());
  let registry = h.scheduler.registry().clone();
  let barrier = Arc::new(Barrier::new(THREADS));
  let winners = Arc::new(AtomicUsize::new(0));

  let handles: Vec<_> = (0..THREADS)
    .map(|_| {
      let registry = registry.clone();
      let barrier = barrier.clone();
      let winners = winners.clone();
      thread::spawn(move || {
        barrier.wait();
        if registry.try_register(&"img-0".to_string()) {
          winners.fetch_add(1, Ordering::SeqCst);
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  assert_eq!(winners.load(Ordering::SeqCst), 1);
  assert_eq!(registry.len(), 1);
  let metrics = h.scheduler.metrics();
  assert_eq!(metrics.register_attempts, THREADS as u64);
  assert_eq!(metrics.registrations_deduplicated, THREADS as u64 - 1);
  assert_eq!(metrics.tasks_started, 1);

  h.gate.open();
  assert_eq!(settle(&mut h.scheduler, 1), 1);
  assert!(registry.is_empty());
}

#[test]
fn test_register_cancel_and_remove_race_freely() {
  const THREADS: usize = 8;
  const ROUNDS: usize = 20;
  let h = harness(keys(0), Gate::opened());
  let registry = h.scheduler.registry().clone();
  let barrier = Arc::new(Barrier::new(THREADS + 1));

  let workers: Vec<_> = (0..THREADS)
    .map(|t| {
      let registry = registry.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        for round in 0..ROUNDS {
          let key = format!("k-{}", (t + round) % 5);
          registry.try_register(&key);
          for task in registry.outstanding() {
            if task.key() == &key {
              task.cancel();
              registry.remove(&task);
            }
          }
        }
      })
    })
    .collect();

  barrier.wait();
  for _ in 0..ROUNDS {
    registry.cancel_all();
  }
  for worker in workers {
    worker.join().unwrap();
  }

  // Everything has been cancelled at least once; nothing can be outstanding
  // after a final sweep, and the key index stays consistent.
  registry.cancel_all();
  assert!(registry.outstanding().is_empty());
  for i in 0..5 {
    assert!(!registry.is_outstanding(&format!("k-{}", i)));
    assert!(registry.try_register(&format!("k-{}", i)));
  }
}
