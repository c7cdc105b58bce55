mod common;

use common::{bytes_decoder, keys, recording_binder, Gate};
use photowall::{TokioPool, WallBuilder};

use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fetches_run_on_tokio_blocking_pool() {
  let (delivered, binder) = recording_binder();
  let gate = Gate::opened();
  let mut scheduler = WallBuilder::<String, Vec<u8>>::custom()
    .size_of(|v: &Vec<u8>| v.len() as u64)
    .decoder(bytes_decoder())
    .transport(common::gated_transport(gate, Arc::default()))
    .worker_pool(TokioPool::new())
    .build(keys(4), binder)
    .unwrap();

  scheduler.on_visible_range_changed(0, 4);

  // Settle from the async side without blocking a runtime worker for long.
  let deadline = Instant::now() + Duration::from_secs(5);
  let mut settled = 0;
  while settled < 4 && Instant::now() < deadline {
    settled += scheduler.dispatch_completions();
    tokio::time::sleep(Duration::from_millis(5)).await;
  }

  assert_eq!(settled, 4);
  assert_eq!(delivered.lock().len(), 4);
  assert_eq!(scheduler.metrics().tasks_succeeded, 4);
}
