use crate::binder::DisplayBinder;
use crate::bitmap::Image;
use crate::cache::{ImageCache, SizeFn};
use crate::config::{WallConfig, DEFAULT_CAPACITY_BYTES};
use crate::decode::Decoder;
use crate::delivery::{completion_queue, DEFAULT_QUEUE_CAPACITY};
use crate::error::BuildError;
use crate::fetcher::{Fetcher, DEFAULT_MAX_BODY_BYTES};
use crate::listener::{EvictionListener, FetchListener};
use crate::metrics::Metrics;
use crate::registry::TaskRegistry;
use crate::runtime::{self, WorkerPool};
use crate::scheduler::ViewportScheduler;
use crate::source::KeySource;
use crate::transport::{Timeouts, Transport};

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

/// A builder for a `ViewportScheduler` and the cache, registry and worker
/// pool behind it.
pub struct WallBuilder<K, V = Image> {
  capacity: u64,
  timeouts: Timeouts,
  max_body_bytes: u64,
  worker_threads: Option<usize>,
  pool: Option<Arc<dyn WorkerPool>>,
  queue_capacity: usize,
  transport: Option<Arc<dyn Transport<K>>>,
  decoder: Option<Arc<dyn Decoder<V>>>,
  size_of: Option<SizeFn<V>>,
  eviction_listener: Option<Arc<dyn EvictionListener<K, V>>>,
  fetch_listener: Option<Arc<dyn FetchListener<K>>>,
}

impl<K, V> fmt::Debug for WallBuilder<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WallBuilder")
      .field("capacity", &self.capacity)
      .field("timeouts", &self.timeouts)
      .field("max_body_bytes", &self.max_body_bytes)
      .field("worker_threads", &self.worker_threads)
      .field("queue_capacity", &self.queue_capacity)
      .field("has_transport", &self.transport.is_some())
      .field("has_decoder", &self.decoder.is_some())
      .field("has_pool", &self.pool.is_some())
      .finish_non_exhaustive()
  }
}

impl<K> WallBuilder<K, Image> {
  /// Creates a builder for decoded `Image`s, charged by pixel byte count.
  ///
  /// With the `codec` feature the `image`-crate decoder is preset.
  ///
  /// The cache starts at a fixed [`DEFAULT_CAPACITY_BYTES`]; the host's
  /// memory is not consulted. Hosts that know their budget should call
  /// [`memory_budget`](Self::memory_budget), which reserves one eighth of it
  /// for images, or set [`capacity`](Self::capacity) directly.
  pub fn new() -> Self {
    let mut builder = Self::custom();
    builder.size_of = Some(Arc::new(Image::byte_size));
    #[cfg(feature = "codec")]
    {
      builder.decoder = Some(Arc::new(crate::decode::ImageDecoder));
    }
    builder
  }
}

impl<K> Default for WallBuilder<K, Image> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V> WallBuilder<K, V> {
  /// Creates a builder for an arbitrary value type. A decoder and a size
  /// function must be supplied before building. The capacity defaults to
  /// [`DEFAULT_CAPACITY_BYTES`] as with [`new`](WallBuilder::new).
  pub fn custom() -> Self {
    Self {
      capacity: DEFAULT_CAPACITY_BYTES,
      timeouts: Timeouts::default(),
      max_body_bytes: DEFAULT_MAX_BODY_BYTES,
      worker_threads: None,
      pool: None,
      queue_capacity: DEFAULT_QUEUE_CAPACITY,
      transport: None,
      decoder: None,
      size_of: None,
      eviction_listener: None,
      fetch_listener: None,
    }
  }

  /// Sets the total byte size the cache may hold.
  pub fn capacity(mut self, bytes: u64) -> Self {
    self.capacity = bytes;
    self
  }

  /// Sizes the cache to one eighth of the given memory budget.
  pub fn memory_budget(mut self, bytes: u64) -> Self {
    self.capacity = bytes / 8;
    self
  }

  pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
    self.timeouts = timeouts;
    self
  }

  pub fn connect_timeout(mut self, timeout: Duration) -> Self {
    self.timeouts.connect = timeout;
    self
  }

  pub fn read_timeout(mut self, timeout: Duration) -> Self {
    self.timeouts.read = timeout;
    self
  }

  /// Responses larger than this fail with `TransportError::BodyTooLarge`.
  pub fn max_body_bytes(mut self, bytes: u64) -> Self {
    self.max_body_bytes = bytes;
    self
  }

  /// Sets the size of the default worker pool. Ignored when a custom pool is
  /// supplied.
  pub fn worker_threads(mut self, threads: usize) -> Self {
    self.worker_threads = Some(threads);
    self
  }

  /// Runs fetches on a custom pool instead of the default one.
  pub fn worker_pool<P: WorkerPool>(mut self, pool: P) -> Self {
    self.pool = Some(Arc::new(pool));
    self
  }

  /// Bounds the number of completions waiting for the scheduler thread.
  pub fn queue_capacity(mut self, capacity: usize) -> Self {
    self.queue_capacity = capacity;
    self
  }

  pub fn transport<T>(mut self, transport: T) -> Self
  where
    T: Transport<K> + 'static,
  {
    self.transport = Some(Arc::new(transport));
    self
  }

  pub fn decoder<D>(mut self, decoder: D) -> Self
  where
    D: Decoder<V> + 'static,
  {
    self.decoder = Some(Arc::new(decoder));
    self
  }

  /// Sets how many bytes a cached value counts against the capacity.
  pub fn size_of(mut self, f: impl Fn(&V) -> u64 + Send + Sync + 'static) -> Self {
    self.size_of = Some(Arc::new(f));
    self
  }

  pub fn eviction_listener<L>(mut self, listener: L) -> Self
  where
    L: EvictionListener<K, V> + 'static,
  {
    self.eviction_listener = Some(Arc::new(listener));
    self
  }

  pub fn fetch_listener<L>(mut self, listener: L) -> Self
  where
    L: FetchListener<K> + 'static,
  {
    self.fetch_listener = Some(Arc::new(listener));
    self
  }

  /// Applies every setting from `config`.
  pub fn config(mut self, config: &WallConfig) -> Self {
    self.capacity = config.resolved_capacity();
    self.timeouts = config.timeouts();
    self.max_body_bytes = config.max_body_bytes;
    self.worker_threads = config.worker_threads;
    self.queue_capacity = config.queue_capacity;
    self
  }
}

impl<K, V> WallBuilder<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
  V: Send + Sync + 'static,
{
  /// Builds the scheduler for `keys`, delivering images to `binder`.
  pub fn build<S, B>(mut self, keys: S, binder: B) -> Result<ViewportScheduler<K, V>, BuildError>
  where
    S: KeySource<K> + 'static,
    B: DisplayBinder<K, V> + 'static,
  {
    self.validate()?;
    let transport = self.transport.take().ok_or(BuildError::TransportRequired)?;
    let decoder = self.decoder.take().ok_or(BuildError::DecoderRequired)?;
    let size_of = self.size_of.take().ok_or(BuildError::SizerRequired)?;
    let pool = match self.pool.take() {
      Some(pool) => pool,
      None => default_pool(self.worker_threads.unwrap_or_else(runtime::default_worker_threads))?,
    };

    let metrics = Arc::new(Metrics::new());
    let cache = Arc::new(ImageCache::with_parts(
      self.capacity,
      size_of,
      self.eviction_listener.take(),
      metrics.clone(),
    ));
    let (sender, receiver) = completion_queue(self.queue_capacity);
    let fetcher = Fetcher::new(
      transport,
      decoder,
      pool,
      sender,
      self.max_body_bytes,
      metrics.clone(),
    );
    let registry = Arc::new(TaskRegistry::new(fetcher, metrics.clone()));

    tracing::debug!(
      capacity = self.capacity,
      keys = keys.len(),
      queue_capacity = self.queue_capacity,
      "building viewport scheduler"
    );
    Ok(ViewportScheduler::new(
      Box::new(keys),
      cache,
      registry,
      Arc::new(binder),
      self.fetch_listener.take(),
      receiver,
      metrics,
    ))
  }

  fn validate(&self) -> Result<(), BuildError> {
    if self.capacity == 0 {
      return Err(BuildError::ZeroCapacity);
    }
    if self.pool.is_none() && self.worker_threads == Some(0) {
      return Err(BuildError::ZeroWorkers);
    }
    if self.queue_capacity == 0 {
      return Err(BuildError::ZeroQueueCapacity);
    }
    Ok(())
  }
}

#[cfg(feature = "http")]
impl<K, V> WallBuilder<K, V>
where
  K: AsRef<str> + Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
  V: Send + Sync + 'static,
{
  /// Like `build`, fetching URL keys over HTTP with the configured timeouts
  /// unless a transport was set explicitly.
  pub fn build_http<S, B>(mut self, keys: S, binder: B) -> Result<ViewportScheduler<K, V>, BuildError>
  where
    S: KeySource<K> + 'static,
    B: DisplayBinder<K, V> + 'static,
  {
    if self.transport.is_none() {
      let http = crate::transport::HttpTransport::new(self.timeouts)
        .map_err(|e| BuildError::Transport(e.to_string()))?;
      self.transport = Some(Arc::new(http));
    }
    self.build(keys, binder)
  }
}

#[cfg(feature = "rayon")]
fn default_pool(threads: usize) -> Result<Arc<dyn WorkerPool>, BuildError> {
  let pool = runtime::RayonPool::new(threads).map_err(|e| BuildError::WorkerPool(e.to_string()))?;
  Ok(Arc::new(pool))
}

#[cfg(not(feature = "rayon"))]
fn default_pool(_threads: usize) -> Result<Arc<dyn WorkerPool>, BuildError> {
  Ok(Arc::new(runtime::ThreadSpawner))
}
