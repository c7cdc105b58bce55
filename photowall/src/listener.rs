use crate::error::FetchError;

use std::fmt;
use std::sync::Arc;

/// Describes why an image left (or never entered) the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
  /// The entry was removed to bring the cache back under its byte capacity.
  Capacity,
  /// The image was refused because it alone is larger than the whole cache.
  Oversized,
}

impl fmt::Display for EvictionReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EvictionReason::Capacity => write!(f, "evicted due to capacity"),
      EvictionReason::Oversized => write!(f, "refused: larger than cache capacity"),
    }
  }
}

/// A listener that can be registered with the cache to receive notifications
/// when images are evicted or refused.
///
/// Called on the thread that performed the `put`, after the cache lock has
/// been released.
pub trait EvictionListener<K, V>: Send + Sync {
  fn on_evict(&self, key: K, value: Arc<V>, reason: EvictionReason);
}

impl<K, V, F> EvictionListener<K, V> for F
where
  F: Fn(K, Arc<V>, EvictionReason) + Send + Sync,
{
  fn on_evict(&self, key: K, value: Arc<V>, reason: EvictionReason) {
    self(key, value, reason)
  }
}

/// Observability hook for fetch outcomes that never reach the display.
///
/// Invoked on the scheduler thread while completions are dispatched.
pub trait FetchListener<K>: Send + Sync {
  /// A fetch ended with a transport or decode error. The key stays unresolved
  /// until a later idle pass registers it again.
  fn on_fetch_failed(&self, key: &K, error: &FetchError);

  /// A fetch produced an image after its task had been cancelled; the image
  /// was dropped.
  fn on_result_discarded(&self, _key: &K) {}
}
