use std::fmt;
use std::io;

/// Errors that can occur when building a wall scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// The image cache was configured with a capacity of zero bytes.
  ZeroCapacity,
  /// A worker pool size of zero was requested.
  ZeroWorkers,
  /// The completion queue was configured with a capacity of zero.
  ZeroQueueCapacity,
  /// No `Transport` was configured and none can be derived for the key type.
  TransportRequired,
  /// No `Decoder` was configured for a custom value type.
  DecoderRequired,
  /// No size function was configured for a custom value type.
  SizerRequired,
  /// The default worker pool could not be started.
  WorkerPool(String),
  /// The default HTTP transport could not be constructed.
  Transport(String),
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ZeroCapacity => write!(f, "image cache capacity cannot be zero"),
      BuildError::ZeroWorkers => write!(f, "worker thread count cannot be zero"),
      BuildError::ZeroQueueCapacity => write!(f, "completion queue capacity cannot be zero"),
      BuildError::TransportRequired => write!(
        f,
        "a transport is required; use `build_http` for string keys or set one with `transport`"
      ),
      BuildError::DecoderRequired => write!(f, "a decoder is required for this image type"),
      BuildError::SizerRequired => write!(f, "a size function is required for this image type"),
      BuildError::WorkerPool(reason) => write!(f, "failed to start worker pool: {}", reason),
      BuildError::Transport(reason) => write!(f, "failed to build http transport: {}", reason),
    }
  }
}

impl std::error::Error for BuildError {}

/// The phase of a transfer in which a timeout fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
  Connect,
  Read,
}

impl fmt::Display for TimeoutPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TimeoutPhase::Connect => write!(f, "connect"),
      TimeoutPhase::Read => write!(f, "read"),
    }
  }
}

/// Failure to open or read the byte stream for a key.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("connection failed: {0}")]
  Connect(String),
  #[error("{phase} timed out")]
  Timeout { phase: TimeoutPhase },
  #[error("server answered with status {0}")]
  Status(u16),
  #[error("response body exceeds the {limit} byte limit")]
  BodyTooLarge { limit: u64 },
  #[error("request failed: {0}")]
  Request(String),
  #[error("stream read failed: {0}")]
  Io(#[source] io::Error),
}

impl From<io::Error> for TransportError {
  fn from(err: io::Error) -> Self {
    match err.kind() {
      io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout {
        phase: TimeoutPhase::Read,
      },
      _ => TransportError::Io(err),
    }
  }
}

/// Failure to turn fetched bytes into an image.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
  #[error("no image data was received")]
  Empty,
  #[error("malformed image data: {0}")]
  Malformed(String),
}

/// The reason a single fetch task ended in the `Failed` state.
///
/// Never surfaces to the scheduler's caller; it is logged and handed to the
/// optional `FetchListener`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error(transparent)]
  Decode(#[from] DecodeError),
}

/// Errors raised while loading a `WallConfig`.
#[cfg(feature = "serde")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config file: {0}")]
  Io(#[from] io::Error),
  #[error("invalid config: {0}")]
  Parse(#[from] serde_yaml::Error),
}
