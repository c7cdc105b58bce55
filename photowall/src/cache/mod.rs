//! The bounded, size-aware LRU image store.

mod lru_list;

use crate::bitmap::Image;
use crate::listener::{EvictionListener, EvictionReason};
use crate::metrics::{bump, Metrics, MetricsSnapshot};

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use lru_list::{Evicted, LruList};
use parking_lot::Mutex;

/// Computes the byte cost of a cached value.
pub type SizeFn<V> = Arc<dyn Fn(&V) -> u64 + Send + Sync>;

/// A thread-safe key → image store bounded by total byte size.
///
/// Eviction is strict least-recently-used, where both a successful `get` and
/// an insert count as an access. The first image stored under a key wins;
/// later puts for the same key are ignored until the entry is evicted.
pub struct ImageCache<K: Eq + Hash + Clone, V = Image> {
  list: Mutex<LruList<K, V>>,
  capacity: u64,
  size_of: SizeFn<V>,
  listener: Option<Arc<dyn EvictionListener<K, V>>>,
  metrics: Arc<Metrics>,
}

impl<K: Eq + Hash + Clone, V> fmt::Debug for ImageCache<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ImageCache")
      .field("capacity", &self.capacity)
      .field("current_size", &self.current_size())
      .field("has_listener", &self.listener.is_some())
      .finish_non_exhaustive()
  }
}

impl<K: Eq + Hash + Clone> ImageCache<K, Image> {
  /// Creates an image cache that charges each image its raw pixel byte count.
  pub fn for_images(capacity_bytes: u64) -> Self {
    Self::new(capacity_bytes, Arc::new(Image::byte_size))
  }
}

impl<K: Eq + Hash + Clone, V> ImageCache<K, V> {
  pub fn new(capacity_bytes: u64, size_of: SizeFn<V>) -> Self {
    Self::with_parts(capacity_bytes, size_of, None, Arc::new(Metrics::new()))
  }

  pub(crate) fn with_parts(
    capacity_bytes: u64,
    size_of: SizeFn<V>,
    listener: Option<Arc<dyn EvictionListener<K, V>>>,
    metrics: Arc<Metrics>,
  ) -> Self {
    Self {
      list: Mutex::new(LruList::new()),
      capacity: capacity_bytes,
      size_of,
      listener,
      metrics,
    }
  }

  /// Registers a listener for evictions and oversized refusals.
  pub fn with_listener<L>(mut self, listener: L) -> Self
  where
    L: EvictionListener<K, V> + 'static,
  {
    self.listener = Some(Arc::new(listener));
    self
  }

  /// Returns the cached image and marks it most recently used.
  pub fn get(&self, key: &K) -> Option<Arc<V>> {
    let found = self.list.lock().get(key);
    if found.is_some() {
      bump(&self.metrics.hits);
    } else {
      bump(&self.metrics.misses);
    }
    found
  }

  /// Returns the cached image without touching its recency or the counters.
  pub fn peek(&self, key: &K) -> Option<Arc<V>> {
    self.list.lock().peek(key)
  }

  pub fn contains(&self, key: &K) -> bool {
    self.list.lock().contains(key)
  }

  /// Stores an image unless one is already cached under `key`.
  ///
  /// Returns `true` if the image was stored.
  pub fn put(&self, key: K, value: V) -> bool {
    self.put_arc(key, Arc::new(value))
  }

  /// Like `put`, for an image that is already shared.
  ///
  /// Least recently used entries are evicted until the new image fits; the
  /// new entry itself is never chosen as a victim.
  ///
  /// An image larger than the whole capacity is refused and reported to the
  /// listener as `Oversized`. Nothing is evicted for it, so the entries
  /// already cached stay usable.
  pub fn put_arc(&self, key: K, value: Arc<V>) -> bool {
    let cost = (self.size_of)(&value);
    if cost > self.capacity {
      bump(&self.metrics.rejected_oversized);
      tracing::debug!(cost, capacity = self.capacity, "refusing image larger than cache");
      self.notify(key, value, EvictionReason::Oversized);
      return false;
    }

    let mut victims: Vec<Evicted<K, V>> = Vec::new();
    {
      let mut list = self.list.lock();
      if list.contains(&key) {
        drop(list);
        bump(&self.metrics.duplicate_puts);
        return false;
      }
      // Make room first so the running total never exceeds the capacity.
      let room = self.capacity - cost;
      while list.current_total_cost() > room {
        match list.pop_back() {
          Some(evicted) => victims.push(evicted),
          None => break,
        }
      }
      list.insert_front(key, value, cost);
      self
        .metrics
        .current_size
        .store(list.current_total_cost(), Ordering::Relaxed);
    }

    bump(&self.metrics.inserts);
    for victim in victims {
      bump(&self.metrics.evicted_by_capacity);
      tracing::trace!(cost = victim.cost, "evicted least recently used image");
      self.notify(victim.key, victim.value, EvictionReason::Capacity);
    }
    true
  }

  fn notify(&self, key: K, value: Arc<V>, reason: EvictionReason) {
    if let Some(listener) = &self.listener {
      listener.on_evict(key, value, reason);
    }
  }

  pub fn len(&self) -> usize {
    self.list.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Total size of all cached images, in bytes.
  pub fn current_size(&self) -> u64 {
    self.list.lock().current_total_cost()
  }

  pub fn capacity(&self) -> u64 {
    self.capacity
  }

  /// Cached keys ordered from most to least recently used.
  pub fn keys_by_recency(&self) -> Vec<K> {
    self.list.lock().keys()
  }

  pub fn metrics(&self) -> MetricsSnapshot {
    self.metrics.snapshot()
  }
}
