#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use photowall::{
  ByteStream, DecodeError, DisplayBinder, ThreadSpawner, TransportError, ViewportScheduler,
  WallBuilder,
};

pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

// A latch that holds fetch workers inside `open_stream` until the test opens it.
#[derive(Default)]
pub struct Gate {
  open: Mutex<bool>,
  cv: Condvar,
}

impl Gate {
  pub fn closed() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn opened() -> Arc<Self> {
    let gate = Self::closed();
    gate.open();
    gate
  }

  pub fn open(&self) {
    *self.open.lock() = true;
    self.cv.notify_all();
  }

  pub fn wait(&self) {
    let mut open = self.open.lock();
    while !*open {
      self.cv.wait(&mut open);
    }
  }
}

// Serves each key's own bytes, after the gate opens. Keys starting with
// "fail" answer with HTTP 500.
pub fn gated_transport(
  gate: Arc<Gate>,
  opened: Arc<AtomicUsize>,
) -> impl Fn(&String) -> Result<ByteStream, TransportError> + Send + Sync + 'static {
  move |key: &String| {
    opened.fetch_add(1, Ordering::SeqCst);
    gate.wait();
    if key.starts_with("fail") {
      return Err(TransportError::Status(500));
    }
    Ok(Box::new(Cursor::new(key.clone().into_bytes())) as ByteStream)
  }
}

pub fn bytes_decoder() -> impl Fn(&[u8]) -> Result<Vec<u8>, DecodeError> + Send + Sync + 'static {
  |bytes: &[u8]| {
    if bytes.is_empty() {
      Err(DecodeError::Empty)
    } else {
      Ok(bytes.to_vec())
    }
  }
}

pub fn keys(n: usize) -> Vec<String> {
  (0..n).map(|i| format!("img-{}", i)).collect()
}

// Records every delivered key, in order.
pub type Deliveries = Arc<Mutex<Vec<String>>>;

pub fn recording_binder() -> (Deliveries, impl DisplayBinder<String, Vec<u8>> + 'static) {
  let delivered: Deliveries = Arc::new(Mutex::new(Vec::new()));
  let sink = delivered.clone();
  let binder = move |key: &String, _image: Arc<Vec<u8>>| sink.lock().push(key.clone());
  (delivered, binder)
}

pub struct Harness {
  pub scheduler: ViewportScheduler<String, Vec<u8>>,
  pub delivered: Deliveries,
  pub gate: Arc<Gate>,
  pub opened: Arc<AtomicUsize>,
}

pub fn builder() -> WallBuilder<String, Vec<u8>> {
  WallBuilder::custom()
    .capacity(1024)
    .size_of(|v: &Vec<u8>| v.len() as u64)
    .decoder(bytes_decoder())
    .worker_pool(ThreadSpawner)
}

// A scheduler over `keys` whose fetches block until `gate` opens.
pub fn harness(keys: Vec<String>, gate: Arc<Gate>) -> Harness {
  let opened = Arc::new(AtomicUsize::new(0));
  let (delivered, binder) = recording_binder();
  let scheduler = builder()
    .transport(gated_transport(gate.clone(), opened.clone()))
    .build(keys, binder)
    .unwrap();
  Harness {
    scheduler,
    delivered,
    gate,
    opened,
  }
}

// Settles completions until `expected` have been handled or the timeout hits.
// Returns the number settled.
pub fn settle(scheduler: &mut ViewportScheduler<String, Vec<u8>>, expected: usize) -> usize {
  let deadline = Instant::now() + SETTLE_TIMEOUT;
  let mut settled = 0;
  while settled < expected && Instant::now() < deadline {
    settled += scheduler.wait_for_completions(Duration::from_millis(50));
  }
  settled
}

// Spins until `condition` holds or the timeout hits.
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
  let deadline = Instant::now() + SETTLE_TIMEOUT;
  while Instant::now() < deadline {
    if condition() {
      return true;
    }
    std::thread::sleep(Duration::from_millis(1));
  }
  condition()
}
