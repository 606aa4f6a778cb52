//! Expiring cache on top of a durable key-value storage.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::storage::KvStorage;
use super::traits::{CacheEntry, Clock, Lookup, SystemClock};

/// Default lifetime of a cache entry, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Key-value cache whose entries expire after a per-entry time-to-live.
///
/// Expired entries are removed lazily, when a read finds them.
pub struct ExpiringCache<S: KvStorage> {
  storage: Arc<S>,
  clock: Arc<dyn Clock>,
  default_ttl: u64,
}

impl<S: KvStorage> ExpiringCache<S> {
  /// Create a new cache with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
      default_ttl: DEFAULT_TTL_SECS,
    }
  }

  /// Use a different time source.
  pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
    self.clock = Arc::new(clock);
    self
  }

  /// Set the lifetime used when a caller does not pick one.
  pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
    self.default_ttl = ttl_secs;
    self
  }

  pub fn default_ttl(&self) -> u64 {
    self.default_ttl
  }

  pub(crate) fn storage(&self) -> &S {
    &self.storage
  }

  pub(crate) fn now_millis(&self) -> i64 {
    self.clock.now_millis()
  }

  /// Store `value` under `key` for `ttl_secs` seconds, replacing any previous entry.
  pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> Result<()> {
    let entry = CacheEntry::new(value, self.clock.now_millis(), ttl_secs);
    let data = serde_json::to_vec(&entry)
      .map_err(|e| eyre!("Failed to serialize cache entry '{}': {}", key, e))?;
    self.storage.write(key, &data)
  }

  /// Read a live value. Expired and missing keys both yield `None`.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    Ok(self.lookup(key)?.into_option())
  }

  /// Read `key`, evicting it if it has expired.
  pub(crate) fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Lookup<T>> {
    let Some(data) = self.storage.read(key)? else {
      return Ok(Lookup::Miss);
    };

    let entry: CacheEntry<T> = serde_json::from_slice(&data)
      .map_err(|e| eyre!("Failed to deserialize cache entry '{}': {}", key, e))?;

    if entry.is_live(self.clock.now_millis()) {
      Ok(Lookup::Hit(entry.value))
    } else {
      debug!(key, "evicting expired cache entry");
      self.storage.delete(key)?;
      Ok(Lookup::Expired)
    }
  }

  /// Delete `key` regardless of its lifetime.
  pub fn remove(&self, key: &str) -> Result<()> {
    self.storage.delete(key)
  }

  /// Delete every entry.
  pub fn clear(&self) -> Result<()> {
    self.storage.clear()
  }

  /// Cache-first read.
  ///
  /// 1. Return the cached value if it is live
  /// 2. Otherwise call `fetcher` and cache its result for `ttl_secs`
  ///
  /// Fetch errors propagate and leave the cache untouched.
  pub async fn fetch<T, F, Fut>(&self, key: &str, ttl_secs: u64, fetcher: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(cached) = self.get::<T>(key)? {
      debug!(key, "cache hit");
      return Ok(cached);
    }

    let data = fetcher().await?;
    self.set(key, &data, ttl_secs)?;
    Ok(data)
  }
}

impl<S: KvStorage> Clone for ExpiringCache<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      default_ttl: self.default_ttl,
    }
  }
}
