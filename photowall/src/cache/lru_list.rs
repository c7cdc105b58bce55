use std::hash::Hash;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node<K, V> {
  key: K,
  value: Arc<V>,
  cost: u64,
  next: Option<Index>,
  prev: Option<Index>,
}

/// An entry removed from the cold end of the list.
pub(crate) struct Evicted<K, V> {
  pub(crate) key: K,
  pub(crate) value: Arc<V>,
  pub(crate) cost: u64,
}

// Cost-tracking doubly linked list. Nodes live in an arena; the map gives
// O(1) key lookup. Head is the most recently used entry.
#[derive(Debug)]
pub(crate) struct LruList<K: Eq + Hash + Clone, V> {
  nodes: Arena<Node<K, V>>,
  lookup: HashMap<K, Index>,
  head: Option<Index>,
  tail: Option<Index>,
  current_cost: u64,
}

impl<K: Eq + Hash + Clone, V> LruList<K, V> {
  pub(crate) fn new() -> Self {
    Self {
      nodes: Arena::new(),
      lookup: HashMap::new(),
      head: None,
      tail: None,
      current_cost: 0,
    }
  }

  // Detaches a node from its neighbours. Leaves the arena and map untouched.
  fn unlink(&mut self, index: Index) {
    let (prev, next) = {
      let node = &self.nodes[index];
      (node.prev, node.next)
    };

    match prev {
      Some(prev_idx) => self.nodes[prev_idx].next = next,
      None => self.head = next,
    }
    match next {
      Some(next_idx) => self.nodes[next_idx].prev = prev,
      None => self.tail = prev,
    }
  }

  fn link_front(&mut self, index: Index) {
    let old_head = self.head;
    self.nodes[index].next = old_head;
    self.nodes[index].prev = None;
    self.head = Some(index);

    if let Some(old) = old_head {
      self.nodes[old].prev = Some(index);
    }
    if self.tail.is_none() {
      self.tail = Some(index);
    }
  }

  pub(crate) fn contains(&self, key: &K) -> bool {
    self.lookup.contains_key(key)
  }

  pub(crate) fn len(&self) -> usize {
    self.lookup.len()
  }

  pub(crate) fn current_total_cost(&self) -> u64 {
    self.current_cost
  }

  /// Inserts a new entry at the head. An existing key is left as it is.
  ///
  /// Returns `false` if the key was already present.
  pub(crate) fn insert_front(&mut self, key: K, value: Arc<V>, cost: u64) -> bool {
    if self.lookup.contains_key(&key) {
      return false;
    }
    let index = self.nodes.insert(Node {
      key: key.clone(),
      value,
      cost,
      next: None,
      prev: None,
    });
    self.lookup.insert(key, index);
    self.current_cost += cost;
    self.link_front(index);
    true
  }

  /// Looks up a key and marks it most recently used.
  pub(crate) fn get(&mut self, key: &K) -> Option<Arc<V>> {
    let index = *self.lookup.get(key)?;
    if self.head != Some(index) {
      self.unlink(index);
      self.link_front(index);
    }
    Some(self.nodes[index].value.clone())
  }

  /// Looks up a key without changing its position.
  pub(crate) fn peek(&self, key: &K) -> Option<Arc<V>> {
    let index = *self.lookup.get(key)?;
    Some(self.nodes[index].value.clone())
  }

  /// Removes and returns the least recently used entry.
  pub(crate) fn pop_back(&mut self) -> Option<Evicted<K, V>> {
    let tail = self.tail?;
    self.unlink(tail);
    let node = self.nodes.remove(tail)?;
    self.lookup.remove(&node.key);
    self.current_cost = self.current_cost.saturating_sub(node.cost);
    Some(Evicted {
      key: node.key,
      value: node.value,
      cost: node.cost,
    })
  }

  /// Keys from most to least recently used.
  pub(crate) fn keys(&self) -> Vec<K> {
    let mut keys = Vec::with_capacity(self.lookup.len());
    let mut current = self.head;
    while let Some(index) = current {
      keys.push(self.nodes[index].key.clone());
      current = self.nodes[index].next;
    }
    keys
  }
}
