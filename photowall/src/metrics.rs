use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// Thread-safe counters shared by the cache, the task registry and the
/// scheduler. All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub struct Metrics {
  // --- Cache lookups ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,

  // --- Cache writes ---
  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) duplicate_puts: CachePadded<AtomicU64>,
  pub(crate) rejected_oversized: CachePadded<AtomicU64>,
  pub(crate) evicted_by_capacity: CachePadded<AtomicU64>,
  pub(crate) current_size: CachePadded<AtomicU64>,

  // --- Task lifecycle ---
  pub(crate) register_attempts: CachePadded<AtomicU64>,
  pub(crate) registrations_deduplicated: CachePadded<AtomicU64>,
  pub(crate) tasks_started: CachePadded<AtomicU64>,
  pub(crate) tasks_succeeded: CachePadded<AtomicU64>,
  pub(crate) tasks_failed: CachePadded<AtomicU64>,
  pub(crate) tasks_cancelled: CachePadded<AtomicU64>,
  pub(crate) results_discarded: CachePadded<AtomicU64>,

  // --- Scheduler ---
  pub(crate) idle_passes: CachePadded<AtomicU64>,
  pub(crate) cancel_sweeps: CachePadded<AtomicU64>,
  pub(crate) deliveries: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      inserts: CachePadded::new(AtomicU64::new(0)),
      duplicate_puts: CachePadded::new(AtomicU64::new(0)),
      rejected_oversized: CachePadded::new(AtomicU64::new(0)),
      evicted_by_capacity: CachePadded::new(AtomicU64::new(0)),
      current_size: CachePadded::new(AtomicU64::new(0)),
      register_attempts: CachePadded::new(AtomicU64::new(0)),
      registrations_deduplicated: CachePadded::new(AtomicU64::new(0)),
      tasks_started: CachePadded::new(AtomicU64::new(0)),
      tasks_succeeded: CachePadded::new(AtomicU64::new(0)),
      tasks_failed: CachePadded::new(AtomicU64::new(0)),
      tasks_cancelled: CachePadded::new(AtomicU64::new(0)),
      results_discarded: CachePadded::new(AtomicU64::new(0)),
      idle_passes: CachePadded::new(AtomicU64::new(0)),
      cancel_sweeps: CachePadded::new(AtomicU64::new(0)),
      deliveries: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

#[inline]
pub(crate) fn bump(counter: &AtomicU64) {
  counter.fetch_add(1, Ordering::Relaxed);
}

impl Metrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      inserts: self.inserts.load(Ordering::Relaxed),
      duplicate_puts: self.duplicate_puts.load(Ordering::Relaxed),
      rejected_oversized: self.rejected_oversized.load(Ordering::Relaxed),
      evicted_by_capacity: self.evicted_by_capacity.load(Ordering::Relaxed),
      current_size: self.current_size.load(Ordering::Relaxed),
      register_attempts: self.register_attempts.load(Ordering::Relaxed),
      registrations_deduplicated: self.registrations_deduplicated.load(Ordering::Relaxed),
      tasks_started: self.tasks_started.load(Ordering::Relaxed),
      tasks_succeeded: self.tasks_succeeded.load(Ordering::Relaxed),
      tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
      tasks_cancelled: self.tasks_cancelled.load(Ordering::Relaxed),
      results_discarded: self.results_discarded.load(Ordering::Relaxed),
      idle_passes: self.idle_passes.load(Ordering::Relaxed),
      cancel_sweeps: self.cancel_sweeps.load(Ordering::Relaxed),
      deliveries: self.deliveries.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of the wall's metrics.
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// Cache lookups that found an image.
  pub hits: u64,
  /// Cache lookups that found nothing.
  pub misses: u64,
  /// hits / (hits + misses).
  pub hit_ratio: f64,
  /// Images stored in the cache.
  pub inserts: u64,
  /// Puts ignored because the key was already cached.
  pub duplicate_puts: u64,
  /// Puts refused because the image alone exceeds the cache capacity.
  pub rejected_oversized: u64,
  /// Images evicted to make room for newer ones.
  pub evicted_by_capacity: u64,
  /// Current total size of all cached images, in bytes.
  pub current_size: u64,
  /// Calls to `TaskRegistry::try_register`.
  pub register_attempts: u64,
  /// Registrations refused because the key already had an outstanding task.
  pub registrations_deduplicated: u64,
  /// Fetch tasks created and handed to the worker pool.
  pub tasks_started: u64,
  /// Tasks settled as `Succeeded`.
  pub tasks_succeeded: u64,
  /// Tasks settled as `Failed`.
  pub tasks_failed: u64,
  /// Tasks moved to `Cancelled`.
  pub tasks_cancelled: u64,
  /// Fully fetched results dropped because their task had been cancelled.
  pub results_discarded: u64,
  /// Idle-state fetch passes over the visible range.
  pub idle_passes: u64,
  /// Cancel-all sweeps triggered by scrolling or shutdown.
  pub cancel_sweeps: u64,
  /// Images handed to the display binder.
  pub deliveries: u64,
  /// Seconds since the metrics were created.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("inserts", &self.inserts)
      .field("duplicate_puts", &self.duplicate_puts)
      .field("rejected_oversized", &self.rejected_oversized)
      .field("evicted_by_capacity", &self.evicted_by_capacity)
      .field("current_size", &self.current_size)
      .field("register_attempts", &self.register_attempts)
      .field("registrations_deduplicated", &self.registrations_deduplicated)
      .field("tasks_started", &self.tasks_started)
      .field("tasks_succeeded", &self.tasks_succeeded)
      .field("tasks_failed", &self.tasks_failed)
      .field("tasks_cancelled", &self.tasks_cancelled)
      .field("results_discarded", &self.results_discarded)
      .field("idle_passes", &self.idle_passes)
      .field("cancel_sweeps", &self.cancel_sweeps)
      .field("deliveries", &self.deliveries)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
