//! Time-windowed request deduplication.
//!
//! - [`ExpiringRequestCache`]: request id -> insertion time, read through a TTL.
//! - [`CacheConfig`]: window and optional background sweep period.
//! - [`SweeperHandle`]: the background purge thread.

pub mod cache;
pub mod sweeper;
pub mod types;

pub use cache::ExpiringRequestCache;
pub use sweeper::SweeperHandle;
pub use types::{CacheConfig, CacheConfigBuilder, MAX_TTL, SWEEP_ENV, TTL_ENV};
