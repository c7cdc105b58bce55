//! Running fetch tasks on the worker pool.

use crate::decode::Decoder;
use crate::delivery::{Completion, CompletionSender};
use crate::error::{FetchError, TransportError};
use crate::metrics::{bump, Metrics};
use crate::runtime::WorkerPool;
use crate::task::{FetchTask, Outcome};
use crate::transport::Transport;

use std::io::{self, Read};
use std::sync::Arc;

/// Default upper bound on a response body.
pub const DEFAULT_MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

const READ_CHUNK: usize = 16 * 1024;

/// Why a body read stopped before the end of the stream.
enum ReadStop {
  Cancelled,
  Failed(TransportError),
}

/// Reads `stream` to the end in bounded chunks, checking `is_cancelled`
/// before every chunk.
fn read_body(
  stream: &mut dyn Read,
  max_body_bytes: u64,
  is_cancelled: impl Fn() -> bool,
) -> Result<Vec<u8>, ReadStop> {
  let mut body = Vec::new();
  let mut chunk = [0u8; READ_CHUNK];
  loop {
    if is_cancelled() {
      return Err(ReadStop::Cancelled);
    }
    let read = match stream.read(&mut chunk) {
      Ok(0) => return Ok(body),
      Ok(n) => n,
      Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
      Err(e) => return Err(ReadStop::Failed(e.into())),
    };
    if (body.len() + read) as u64 > max_body_bytes {
      return Err(ReadStop::Failed(TransportError::BodyTooLarge {
        limit: max_body_bytes,
      }));
    }
    body.extend_from_slice(&chunk[..read]);
  }
}

/// Everything a worker needs to turn a key into a completion.
pub(crate) struct Fetcher<K: Send + Sync, V: Send> {
  transport: Arc<dyn Transport<K>>,
  decoder: Arc<dyn Decoder<V>>,
  pool: Arc<dyn WorkerPool>,
  completions: CompletionSender<K, V>,
  max_body_bytes: u64,
  metrics: Arc<Metrics>,
}

impl<K, V> Fetcher<K, V>
where
  K: Send + Sync + 'static,
  V: Send + 'static,
{
  pub(crate) fn new(
    transport: Arc<dyn Transport<K>>,
    decoder: Arc<dyn Decoder<V>>,
    pool: Arc<dyn WorkerPool>,
    completions: CompletionSender<K, V>,
    max_body_bytes: u64,
    metrics: Arc<Metrics>,
  ) -> Self {
    Self {
      transport,
      decoder,
      pool,
      completions,
      max_body_bytes,
      metrics,
    }
  }

  /// Submits the task's fetch+decode job and returns immediately.
  pub(crate) fn launch(&self, task: Arc<FetchTask<K>>) {
    bump(&self.metrics.tasks_started);
    tracing::debug!(task = %task.id(), "starting fetch");

    let transport = self.transport.clone();
    let decoder = self.decoder.clone();
    let completions = self.completions.clone();
    let max_body_bytes = self.max_body_bytes;

    self.pool.execute(Box::new(move || {
      let outcome = run(&task, transport.as_ref(), decoder.as_ref(), max_body_bytes);
      if !completions.post(Completion { task, outcome }) {
        tracing::trace!("scheduler gone, dropping completion");
      }
    }));
  }
}

fn run<K, V>(
  task: &FetchTask<K>,
  transport: &dyn Transport<K>,
  decoder: &dyn Decoder<V>,
  max_body_bytes: u64,
) -> Outcome<V> {
  if !task.begin() {
    return Outcome::Abandoned;
  }

  let mut stream = match transport.open_stream(task.key()) {
    Ok(stream) => stream,
    Err(e) => return Outcome::Failed(e.into()),
  };
  let body = match read_body(stream.as_mut(), max_body_bytes, || task.is_cancelled()) {
    Ok(body) => body,
    Err(ReadStop::Cancelled) => return Outcome::Abandoned,
    Err(ReadStop::Failed(e)) => return Outcome::Failed(e.into()),
  };
  drop(stream);

  if task.is_cancelled() {
    return Outcome::Abandoned;
  }
  let decoded = match decoder.decode(&body) {
    Ok(value) => value,
    Err(e) => return Outcome::Failed(FetchError::Decode(e)),
  };
  if task.is_cancelled() {
    return Outcome::Abandoned;
  }
  Outcome::Fetched(decoded)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::delivery::completion_queue;
  use crate::error::DecodeError;
  use crate::runtime::ThreadSpawner;
  use crate::transport::ByteStream;
  use std::io::Cursor;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::{Duration, Instant};

  /// Yields one byte per read.
  struct Trickle(Vec<u8>, usize);

  impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      if self.1 >= self.0.len() || buf.is_empty() {
        return Ok(0);
      }
      buf[0] = self.0[self.1];
      self.1 += 1;
      Ok(1)
    }
  }

  #[test]
  fn read_body_collects_all_chunks() {
    let mut stream = Trickle(b"abcdef".to_vec(), 0);
    let body = read_body(&mut stream, 1024, || false).ok().unwrap();
    assert_eq!(body, b"abcdef");
  }

  #[test]
  fn read_body_stops_on_cancellation_between_chunks() {
    let mut stream = Trickle(vec![7; 100], 0);
    let reads = AtomicUsize::new(0);
    let result = read_body(&mut stream, 1024, || reads.fetch_add(1, Ordering::SeqCst) >= 3);
    assert!(matches!(result, Err(ReadStop::Cancelled)));
    assert_eq!(stream.1, 3, "no chunk is read after cancellation is seen");
  }

  #[test]
  fn read_body_enforces_limit() {
    let mut stream = Cursor::new(vec![0u8; 64]);
    let result = read_body(&mut stream, 63, || false);
    assert!(matches!(
      result,
      Err(ReadStop::Failed(TransportError::BodyTooLarge { limit: 63 }))
    ));

    let mut stream = Cursor::new(vec![0u8; 64]);
    assert!(read_body(&mut stream, 64, || false).is_ok());
  }

  fn echo_transport() -> Arc<dyn Transport<String>> {
    Arc::new(|key: &String| -> Result<ByteStream, TransportError> {
      if key == "missing" {
        Err(TransportError::Status(404))
      } else {
        Ok(Box::new(Cursor::new(key.clone().into_bytes())))
      }
    })
  }

  fn length_decoder() -> Arc<dyn Decoder<usize>> {
    Arc::new(|bytes: &[u8]| -> Result<usize, DecodeError> {
      if bytes.is_empty() {
        Err(DecodeError::Empty)
      } else {
        Ok(bytes.len())
      }
    })
  }

  fn launch_and_wait(key: &str) -> Outcome<usize> {
    let (tx, rx) = completion_queue(8);
    let fetcher = Fetcher::new(
      echo_transport(),
      length_decoder(),
      Arc::new(ThreadSpawner),
      tx,
      DEFAULT_MAX_BODY_BYTES,
      Arc::new(Metrics::new()),
    );
    fetcher.launch(Arc::new(FetchTask::new(key.to_string())));

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
      if let Some(completion) = rx.poll() {
        return completion.outcome;
      }
      assert!(Instant::now() < deadline, "worker never reported");
      std::thread::sleep(Duration::from_millis(1));
    }
  }

  #[test]
  fn launched_task_reports_decoded_value() {
    assert!(matches!(launch_and_wait("hello"), Outcome::Fetched(5)));
  }

  #[test]
  fn transport_and_decode_errors_become_failures() {
    assert!(matches!(
      launch_and_wait("missing"),
      Outcome::Failed(FetchError::Transport(TransportError::Status(404)))
    ));
    assert!(matches!(
      launch_and_wait(""),
      Outcome::Failed(FetchError::Decode(DecodeError::Empty))
    ));
  }

  #[test]
  fn task_cancelled_before_start_is_abandoned() {
    let task = FetchTask::new("hello".to_string());
    task.cancel();
    let outcome = run(&task, echo_transport().as_ref(), length_decoder().as_ref(), 1024);
    assert!(matches!(outcome, Outcome::Abandoned));
  }
}
