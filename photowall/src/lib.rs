//! Viewport-driven image fetching for large scrollable grids.
//!
//! Only the images the grid currently shows are fetched. Decoded images live
//! in a bounded, size-aware LRU cache, and fetches still running when the
//! user starts scrolling are cancelled.
//!
//! # Features
//! - **Size-aware LRU**: `ImageCache` evicts least recently used images until
//!   their total byte size fits the configured capacity.
//! - **Deduplicated fetches**: `TaskRegistry` keeps at most one outstanding
//!   fetch per key, no matter how often a key scrolls into view.
//! - **Cooperative cancellation**: a scroll cancels every outstanding fetch;
//!   results that arrive afterwards are dropped.
//! - **Single delivery thread**: workers report through a bounded channel and
//!   the host settles completions from its own loop, so `DisplayBinder` is
//!   never called concurrently.
//! - **Pluggable seams**: key lists, transports, decoders, worker pools and
//!   size functions are traits or closures; HTTP (`reqwest`) and the `image`
//!   crate are the defaults.

// Public modules that form the API
pub mod binder;
pub mod bitmap;
pub mod builder;
pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod source;
pub mod task;
pub mod transport;

// Internal, crate-only modules
mod delivery;
mod fetcher;

pub use binder::DisplayBinder;
pub use bitmap::Image;
pub use builder::WallBuilder;
pub use cache::ImageCache;
pub use config::WallConfig;
pub use decode::Decoder;
pub use delivery::DEFAULT_QUEUE_CAPACITY;
pub use error::{BuildError, DecodeError, FetchError, TimeoutPhase, TransportError};
pub use fetcher::DEFAULT_MAX_BODY_BYTES;
pub use listener::{EvictionListener, EvictionReason, FetchListener};
pub use metrics::MetricsSnapshot;
pub use registry::TaskRegistry;
pub use runtime::{ThreadSpawner, WorkerPool};
pub use scheduler::{Lifecycle, ScrollState, Viewport, ViewportScheduler};
pub use source::KeySource;
pub use task::{FetchTask, TaskId, TaskState};
pub use transport::{ByteStream, Timeouts, Transport};

#[cfg(feature = "serde")]
pub use error::ConfigError;

#[cfg(feature = "codec")]
pub use decode::ImageDecoder;

#[cfg(feature = "http")]
pub use transport::HttpTransport;

#[cfg(feature = "rayon")]
pub use runtime::RayonPool;

#[cfg(feature = "tokio")]
pub use runtime::TokioPool;
