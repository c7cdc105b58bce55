//! Opening byte streams for keys.

use crate::error::TransportError;

use std::io::Read;
use std::time::Duration;

/// A readable body for one key.
pub type ByteStream = Box<dyn Read + Send>;

/// Connect and read timeouts applied to every fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
  pub connect: Duration,
  pub read: Duration,
}

impl Timeouts {
  pub const DEFAULT_CONNECT: Duration = Duration::from_millis(5_000);
  pub const DEFAULT_READ: Duration = Duration::from_millis(10_000);
}

impl Default for Timeouts {
  fn default() -> Self {
    Self {
      connect: Self::DEFAULT_CONNECT,
      read: Self::DEFAULT_READ,
    }
  }
}

/// Opens the byte stream behind a key.
///
/// Called on worker threads; implementations may block.
pub trait Transport<K>: Send + Sync {
  fn open_stream(&self, key: &K) -> Result<ByteStream, TransportError>;
}

impl<K, F> Transport<K> for F
where
  F: Fn(&K) -> Result<ByteStream, TransportError> + Send + Sync,
{
  fn open_stream(&self, key: &K) -> Result<ByteStream, TransportError> {
    self(key)
  }
}

/// Blocking HTTP(S) transport for URL keys.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
  client: reqwest::blocking::Client,
  timeouts: Timeouts,
}

#[cfg(feature = "http")]
impl HttpTransport {
  /// Builds a client with the given timeouts.
  ///
  /// `timeouts.read` bounds the whole response once the connection is up.
  /// Must not be called from inside an async context.
  pub fn new(timeouts: Timeouts) -> Result<Self, TransportError> {
    let client = reqwest::blocking::Client::builder()
      .connect_timeout(timeouts.connect)
      .timeout(timeouts.read)
      .build()
      .map_err(|e| TransportError::Request(e.to_string()))?;
    Ok(Self { client, timeouts })
  }

  pub fn timeouts(&self) -> Timeouts {
    self.timeouts
  }
}

#[cfg(feature = "http")]
fn classify(err: reqwest::Error) -> TransportError {
  use crate::error::TimeoutPhase;

  if err.is_connect() {
    if err.is_timeout() {
      TransportError::Timeout {
        phase: TimeoutPhase::Connect,
      }
    } else {
      TransportError::Connect(err.to_string())
    }
  } else if err.is_timeout() {
    TransportError::Timeout {
      phase: TimeoutPhase::Read,
    }
  } else {
    TransportError::Request(err.to_string())
  }
}

#[cfg(feature = "http")]
impl<K: AsRef<str>> Transport<K> for HttpTransport {
  fn open_stream(&self, key: &K) -> Result<ByteStream, TransportError> {
    let response = self.client.get(key.as_ref()).send().map_err(classify)?;
    let status = response.status();
    if !status.is_success() {
      return Err(TransportError::Status(status.as_u16()));
    }
    Ok(Box::new(response))
  }
}
