//! Expiring key-value cache with durable storage.
//!
//! This module provides:
//! - A namespaced key-value storage trait with a SQLite implementation
//! - Entries that carry their insertion time and time-to-live
//! - Lazy eviction: an expired entry is deleted by the read that finds it
//! - A cache-first `fetch` helper for wrapping remote reads

mod layer;
mod storage;
mod traits;

pub use layer::{ExpiringCache, DEFAULT_TTL_SECS};
pub use storage::{KvStorage, SqliteStorage};

#[cfg(test)]
pub use storage::testing::FlakyStorage;
#[cfg(test)]
pub use traits::testing::ManualClock;
