use std::sync::Arc;

/// The host's side of image delivery.
///
/// Called on the scheduler thread for cache hits during an idle pass and for
/// every successfully settled fetch. The binder decides whether a cell still
/// shows `key`; the scheduler does not track cell reuse.
pub trait DisplayBinder<K, V>: Send + Sync {
  fn deliver(&self, key: &K, image: Arc<V>);
}

impl<K, V, F> DisplayBinder<K, V> for F
where
  F: Fn(&K, Arc<V>) + Send + Sync,
{
  fn deliver(&self, key: &K, image: Arc<V>) {
    self(key, image)
  }
}
