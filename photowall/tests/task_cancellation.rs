mod common;

use common::{bytes_decoder, recording_binder, settle, wait_until};
use photowall::{
  ByteStream, FetchListener, FetchError, ScrollState, TaskState, ThreadSpawner, TransportError,
  WallBuilder,
};

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
struct DiscardCounter(Arc<AtomicUsize>);

impl FetchListener<String> for DiscardCounter {
  fn on_fetch_failed(&self, _key: &String, _error: &FetchError) {}

  fn on_result_discarded(&self, _key: &String) {
    self.0.fetch_add(1, Ordering::SeqCst);
  }
}

#[test]
fn test_cancelled_result_never_reaches_cache_or_display() {
  let decoded = Arc::new(AtomicBool::new(false));
  let discards = DiscardCounter::default();
  let (delivered, binder) = recording_binder();

  let flag = decoded.clone();
  let decoder = bytes_decoder();
  let mut scheduler = WallBuilder::<String, Vec<u8>>::custom()
    .size_of(|v: &Vec<u8>| v.len() as u64)
    .worker_pool(ThreadSpawner)
    .transport(|key: &String| -> Result<ByteStream, TransportError> {
      Ok(Box::new(Cursor::new(key.clone().into_bytes())))
    })
    .decoder(move |bytes: &[u8]| {
      let value = decoder(bytes);
      flag.store(true, Ordering::SeqCst);
      value
    })
    .fetch_listener(discards.clone())
    .build(vec!["img-0".to_string()], binder)
    .unwrap();

  // 1. Let the worker finish decoding before the scroll starts.
  scheduler.on_visible_range_changed(0, 1);
  let task = scheduler.registry().outstanding().pop().unwrap();
  assert!(wait_until(|| decoded.load(Ordering::SeqCst)));

  // 2. Cancel after the result exists but before it is settled.
  scheduler.on_scroll_state_changed(ScrollState::Scrolling);
  assert_eq!(task.state(), TaskState::Cancelled);
  assert_eq!(settle(&mut scheduler, 1), 1);

  // 3. No cache write and no delivery, whichever check caught the cancel.
  assert!(scheduler.cache().is_empty());
  assert!(delivered.lock().is_empty());
  let metrics = scheduler.metrics();
  assert_eq!(metrics.tasks_succeeded, 0);
  assert_eq!(metrics.results_discarded as usize, discards.0.load(Ordering::SeqCst));
  assert!(scheduler.registry().is_empty());
}

#[test]
fn test_cancel_reports_whether_it_transitioned() {
  let h = common::harness(common::keys(2), common::Gate::closed());
  let mut scheduler = h.scheduler;
  scheduler.on_visible_range_changed(0, 2);
  let tasks = scheduler.registry().outstanding();
  assert_eq!(tasks.len(), 2);

  assert!(tasks[0].cancel());
  assert!(!tasks[0].cancel());
  assert_eq!(scheduler.registry().cancel_all(), 1);
  assert!(tasks.iter().all(|task| task.state() == TaskState::Cancelled));

  h.gate.open();
  assert_eq!(settle(&mut scheduler, 2), 2);
  assert!(scheduler.registry().is_empty());
}

#[test]
fn test_oversized_bodies_fail_the_task() {
  let (delivered, binder) = recording_binder();
  let mut scheduler = common::builder()
    .max_body_bytes(4)
    .transport(|key: &String| -> Result<ByteStream, TransportError> {
      Ok(Box::new(Cursor::new(key.clone().into_bytes())))
    })
    .build(vec!["tiny".to_string(), "too-large".to_string()], binder)
    .unwrap();

  scheduler.on_visible_range_changed(0, 2);
  assert_eq!(settle(&mut scheduler, 2), 2);

  assert_eq!(*delivered.lock(), vec!["tiny".to_string()]);
  assert_eq!(scheduler.metrics().tasks_failed, 1);
}
