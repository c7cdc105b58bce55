use std::thread;

/// A unit of blocking fetch work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A trait for running blocking fetch jobs off the scheduler thread.
pub trait WorkerPool: Send + Sync + 'static {
  /// Runs a job on some worker. Must return without waiting for the job.
  fn execute(&self, job: Job);
}

/// Runs every job on a freshly spawned OS thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSpawner;

impl WorkerPool for ThreadSpawner {
  fn execute(&self, job: Job) {
    thread::spawn(job);
  }
}

/// Runs jobs on a dedicated rayon thread pool.
#[cfg(feature = "rayon")]
pub struct RayonPool(rayon::ThreadPool);

#[cfg(feature = "rayon")]
impl RayonPool {
  /// Starts a pool with `threads` named worker threads.
  pub fn new(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(threads)
      .thread_name(|index| format!("photowall-fetch-{}", index))
      .build()?;
    Ok(Self(pool))
  }

  pub fn threads(&self) -> usize {
    self.0.current_num_threads()
  }
}

#[cfg(feature = "rayon")]
impl std::fmt::Debug for RayonPool {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RayonPool")
      .field("threads", &self.threads())
      .finish()
  }
}

#[cfg(feature = "rayon")]
impl WorkerPool for RayonPool {
  fn execute(&self, job: Job) {
    self.0.spawn(job);
  }
}

/// Runs jobs on a Tokio runtime's blocking thread pool.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioPool(tokio::runtime::Handle);

#[cfg(feature = "tokio")]
impl TokioPool {
  /// Creates a pool that uses the current Tokio runtime context.
  /// Panics if called outside of a Tokio runtime.
  pub fn new() -> Self {
    Self(tokio::runtime::Handle::current())
  }

  pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
    Self(handle)
  }
}

#[cfg(feature = "tokio")]
impl WorkerPool for TokioPool {
  fn execute(&self, job: Job) {
    // The handle is only used to submit; the JoinHandle is not needed.
    let _ = self.0.spawn_blocking(job);
  }
}

/// The worker count used when none is configured.
pub fn default_worker_threads() -> usize {
  num_cpus::get().max(1)
}
