//! Reacting to viewport changes: what to fetch now and what to cancel.

use crate::binder::DisplayBinder;
use crate::bitmap::Image;
use crate::cache::ImageCache;
use crate::delivery::{Completion, CompletionReceiver};
use crate::listener::FetchListener;
use crate::metrics::{bump, Metrics, MetricsSnapshot};
use crate::registry::TaskRegistry;
use crate::source::KeySource;
use crate::task::Outcome;

use std::fmt;
use std::hash::Hash;
use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Whether the grid is being moved by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
  #[default]
  Idle,
  Scrolling,
}

/// The window of the key list the grid currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
  pub first_visible: usize,
  pub visible_count: usize,
  pub scroll_state: ScrollState,
}

impl Viewport {
  /// Visible indices, clamped to a key list of `len` entries.
  pub fn range(&self, len: usize) -> Range<usize> {
    let start = self.first_visible.min(len);
    let end = self.first_visible.saturating_add(self.visible_count).min(len);
    start..end
  }
}

/// Where the scheduler is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  /// No non-empty visible range has been reported yet.
  AwaitingFirstRange,
  Active,
  /// Every input is ignored.
  ShutDown,
}

/// Drives fetching from the grid's viewport reports.
///
/// All methods are meant to be called from one thread, the host's event
/// loop, which is also where `DisplayBinder::deliver` runs.
pub struct ViewportScheduler<K, V = Image>
where
  K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
  V: Send + Sync + 'static,
{
  keys: Box<dyn KeySource<K>>,
  cache: Arc<ImageCache<K, V>>,
  registry: Arc<TaskRegistry<K, V>>,
  binder: Arc<dyn DisplayBinder<K, V>>,
  fetch_listener: Option<Arc<dyn FetchListener<K>>>,
  completions: Option<CompletionReceiver<K, V>>,
  viewport: Viewport,
  lifecycle: Lifecycle,
  metrics: Arc<Metrics>,
}

impl<K, V> fmt::Debug for ViewportScheduler<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
  V: Send + Sync + 'static,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ViewportScheduler")
      .field("viewport", &self.viewport)
      .field("lifecycle", &self.lifecycle)
      .field("keys", &self.keys.len())
      .field("cache", &self.cache)
      .field("registry", &self.registry)
      .finish_non_exhaustive()
  }
}

impl<K, V> ViewportScheduler<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
  V: Send + Sync + 'static,
{
  pub(crate) fn new(
    keys: Box<dyn KeySource<K>>,
    cache: Arc<ImageCache<K, V>>,
    registry: Arc<TaskRegistry<K, V>>,
    binder: Arc<dyn DisplayBinder<K, V>>,
    fetch_listener: Option<Arc<dyn FetchListener<K>>>,
    completions: CompletionReceiver<K, V>,
    metrics: Arc<Metrics>,
  ) -> Self {
    Self {
      keys,
      cache,
      registry,
      binder,
      fetch_listener,
      completions: Some(completions),
      viewport: Viewport::default(),
      lifecycle: Lifecycle::AwaitingFirstRange,
      metrics,
    }
  }

  /// The grid now shows `count` keys starting at `first`.
  ///
  /// The first report with `count > 0` runs an idle pass whatever the scroll
  /// state; later reports only record the range.
  pub fn on_visible_range_changed(&mut self, first: usize, count: usize) {
    if self.lifecycle == Lifecycle::ShutDown {
      return;
    }
    self.viewport.first_visible = first;
    self.viewport.visible_count = count;

    if self.lifecycle == Lifecycle::AwaitingFirstRange && count > 0 {
      self.lifecycle = Lifecycle::Active;
      tracing::debug!(first, count, "first visible range, activating");
      self.idle_pass();
    }
  }

  /// Scrolling cancels every outstanding fetch; settling back to idle fetches
  /// whatever is visible and not cached.
  pub fn on_scroll_state_changed(&mut self, state: ScrollState) {
    if self.lifecycle == Lifecycle::ShutDown {
      return;
    }
    self.viewport.scroll_state = state;
    match state {
      ScrollState::Idle => self.idle_pass(),
      ScrollState::Scrolling => {
        bump(&self.metrics.cancel_sweeps);
        let cancelled = self.registry.cancel_all();
        tracing::debug!(cancelled, "scroll started");
      }
    }
  }

  fn idle_pass(&self) {
    bump(&self.metrics.idle_passes);
    let range = self.viewport.range(self.keys.len());
    tracing::debug!(start = range.start, end = range.end, "idle pass");

    for index in range {
      let Some(key) = self.keys.key_at(index) else {
        break;
      };
      match self.cache.get(&key) {
        Some(image) => self.deliver(&key, image),
        None => {
          self.registry.try_register(&key);
        }
      }
    }
  }

  fn deliver(&self, key: &K, image: Arc<V>) {
    bump(&self.metrics.deliveries);
    self.binder.deliver(key, image);
  }

  /// Settles every completion workers have reported so far, on the calling
  /// thread. Returns how many were settled.
  pub fn dispatch_completions(&mut self) -> usize {
    let Some(completions) = &self.completions else {
      return 0;
    };
    let mut settled = 0;
    while let Some(completion) = completions.poll() {
      self.settle(completion);
      settled += 1;
    }
    settled
  }

  /// Blocks until at least one completion has been settled or `timeout`
  /// elapses. Returns the number settled.
  pub fn wait_for_completions(&mut self, timeout: Duration) -> usize {
    let deadline = Instant::now() + timeout;
    loop {
      let settled = self.dispatch_completions();
      if settled > 0 || self.completions.is_none() {
        return settled;
      }
      let now = Instant::now();
      if now >= deadline {
        return 0;
      }
      thread::sleep((deadline - now).min(Duration::from_millis(1)));
    }
  }

  fn settle(&self, completion: Completion<K, V>) {
    let Completion { task, outcome } = completion;
    let key = task.key();

    match outcome {
      Outcome::Fetched(value) => {
        if task.succeed() {
          bump(&self.metrics.tasks_succeeded);
          let image = Arc::new(value);
          self.cache.put_arc(key.clone(), image.clone());
          self.deliver(key, image);
        } else {
          bump(&self.metrics.results_discarded);
          tracing::trace!(?key, "discarding result of cancelled fetch");
          if let Some(listener) = &self.fetch_listener {
            listener.on_result_discarded(key);
          }
        }
      }
      Outcome::Failed(error) => {
        if task.fail() {
          bump(&self.metrics.tasks_failed);
          tracing::warn!(?key, %error, "image fetch failed");
          if let Some(listener) = &self.fetch_listener {
            listener.on_fetch_failed(key, &error);
          }
        } else {
          tracing::trace!(?key, %error, "cancelled fetch also failed");
        }
      }
      Outcome::Abandoned => {
        tracing::trace!(?key, "worker stopped on cancellation");
      }
    }

    self.registry.remove(&task);
  }

  /// Cancels everything, discards completions still on their way and ignores
  /// every later input. Also runs on drop.
  pub fn on_shutdown(&mut self) {
    if self.lifecycle == Lifecycle::ShutDown {
      return;
    }
    self.lifecycle = Lifecycle::ShutDown;
    bump(&self.metrics.cancel_sweeps);
    let cancelled = self.registry.cancel_all();
    self.completions = None;
    tracing::info!(cancelled, "viewport scheduler shut down");
  }

  pub fn cache(&self) -> &Arc<ImageCache<K, V>> {
    &self.cache
  }

  pub fn registry(&self) -> &Arc<TaskRegistry<K, V>> {
    &self.registry
  }

  pub fn viewport(&self) -> Viewport {
    self.viewport
  }

  pub fn lifecycle(&self) -> Lifecycle {
    self.lifecycle
  }

  /// Counters for the cache, the registry and this scheduler.
  pub fn metrics(&self) -> MetricsSnapshot {
    self.metrics.snapshot()
  }
}

impl<K, V> Drop for ViewportScheduler<K, V>
where
  K: Eq + Hash + Clone + Send + Sync + fmt::Debug + 'static,
  V: Send + Sync + 'static,
{
  fn drop(&mut self) {
    self.on_shutdown();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn range_is_clamped_to_key_count() {
    let viewport = Viewport {
      first_visible: 8,
      visible_count: 5,
      scroll_state: ScrollState::Idle,
    };
    assert_eq!(viewport.range(10), 8..10);
    assert_eq!(viewport.range(4), 4..4);
    assert_eq!(viewport.range(100), 8..13);

    let huge = Viewport {
      first_visible: usize::MAX - 1,
      visible_count: 10,
      ..Viewport::default()
    };
    assert_eq!(huge.range(usize::MAX), (usize::MAX - 1)..usize::MAX);
  }
}
