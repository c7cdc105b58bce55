use std::sync::Arc;

/// The ordered list of keys the grid displays.
pub trait KeySource<K>: Send + Sync {
  fn len(&self) -> usize;

  /// The key at `index`, or `None` past the end.
  fn key_at(&self, index: usize) -> Option<K>;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<K: Clone + Send + Sync> KeySource<K> for Vec<K> {
  fn len(&self) -> usize {
    Vec::len(self)
  }

  fn key_at(&self, index: usize) -> Option<K> {
    self.get(index).cloned()
  }
}

impl<K: Clone + Send + Sync> KeySource<K> for Arc<[K]> {
  fn len(&self) -> usize {
    <[K]>::len(self)
  }

  fn key_at(&self, index: usize) -> Option<K> {
    self.get(index).cloned()
  }
}
