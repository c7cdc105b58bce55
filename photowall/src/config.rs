use crate::fetcher::DEFAULT_MAX_BODY_BYTES;
use crate::delivery::DEFAULT_QUEUE_CAPACITY;
use crate::transport::Timeouts;

#[cfg(feature = "serde")]
use crate::error::ConfigError;

use std::time::Duration;

/// Cache capacity used when neither a capacity nor a memory budget is set.
///
/// A fixed value, independent of how much memory the host has.
pub const DEFAULT_CAPACITY_BYTES: u64 = 64 * 1024 * 1024;

/// Plain settings for a wall, loadable from YAML with the `serde` feature.
///
/// ```yaml
/// memory_budget_bytes: 268435456
/// connect_timeout_ms: 3000
/// worker_threads: 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
  feature = "serde",
  derive(serde::Deserialize),
  serde(default, deny_unknown_fields)
)]
pub struct WallConfig {
  /// Exact cache capacity. Takes precedence over `memory_budget_bytes`.
  pub capacity_bytes: Option<u64>,
  /// Memory available to the host; the cache gets one eighth of it.
  pub memory_budget_bytes: Option<u64>,
  pub connect_timeout_ms: u64,
  pub read_timeout_ms: u64,
  pub max_body_bytes: u64,
  /// Defaults to the number of CPUs.
  pub worker_threads: Option<usize>,
  pub queue_capacity: usize,
}

impl Default for WallConfig {
  fn default() -> Self {
    Self {
      capacity_bytes: None,
      memory_budget_bytes: None,
      connect_timeout_ms: Timeouts::DEFAULT_CONNECT.as_millis() as u64,
      read_timeout_ms: Timeouts::DEFAULT_READ.as_millis() as u64,
      max_body_bytes: DEFAULT_MAX_BODY_BYTES,
      worker_threads: None,
      queue_capacity: DEFAULT_QUEUE_CAPACITY,
    }
  }
}

impl WallConfig {
  /// The cache capacity these settings resolve to.
  pub fn resolved_capacity(&self) -> u64 {
    match (self.capacity_bytes, self.memory_budget_bytes) {
      (Some(capacity), _) => capacity,
      (None, Some(budget)) => budget / 8,
      (None, None) => DEFAULT_CAPACITY_BYTES,
    }
  }

  pub fn timeouts(&self) -> Timeouts {
    Timeouts {
      connect: Duration::from_millis(self.connect_timeout_ms),
      read: Duration::from_millis(self.read_timeout_ms),
    }
  }

  #[cfg(feature = "serde")]
  pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
    Ok(serde_yaml::from_str(yaml)?)
  }

  #[cfg(feature = "serde")]
  pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Self::from_yaml_str(&text)
  }
}
