//! Core types for the expiring cache.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A value stored together with the moment it was written and its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  pub value: T,
  /// Milliseconds since the Unix epoch at write time
  pub inserted_at: i64,
  pub ttl_millis: u64,
}

impl<T> CacheEntry<T> {
  pub fn new(value: T, inserted_at: i64, ttl_secs: u64) -> Self {
    Self {
      value,
      inserted_at,
      ttl_millis: ttl_secs.saturating_mul(1000),
    }
  }

  /// An entry is live while `now - inserted_at <= ttl_millis`.
  pub fn is_live(&self, now: i64) -> bool {
    let age = now.saturating_sub(self.inserted_at);
    age <= i64::try_from(self.ttl_millis).unwrap_or(i64::MAX)
  }
}

/// Outcome of a raw lookup.
///
/// `Expired` is only seen inside the cache; callers get an `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
  Hit(T),
  Miss,
  Expired,
}

impl<T> Lookup<T> {
  pub fn into_option(self) -> Option<T> {
    match self {
      Lookup::Hit(value) => Some(value),
      Lookup::Miss | Lookup::Expired => None,
    }
  }
}

/// Source of the current time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
  fn now_millis(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_millis(&self) -> i64 {
    Utc::now().timestamp_millis()
  }
}

#[cfg(test)]
pub mod testing {
  use super::Clock;
  use std::sync::atomic::{AtomicI64, Ordering};
  use std::sync::Arc;

  /// Clock that only moves when told to.
  #[derive(Debug, Clone, Default)]
  pub struct ManualClock {
    now: Arc<AtomicI64>,
  }

  impl ManualClock {
    pub fn at(millis: i64) -> Self {
      Self {
        now: Arc::new(AtomicI64::new(millis)),
      }
    }

    pub fn advance_secs(&self, secs: i64) {
      self.now.fetch_add(secs * 1000, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, millis: i64) {
      self.now.fetch_add(millis, Ordering::SeqCst);
    }
  }

  impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
      self.now.load(Ordering::SeqCst)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_entry_live_at_boundary() {
    let entry = CacheEntry::new("v", 1_000, 2);
    assert!(entry.is_live(1_000));
    assert!(entry.is_live(3_000));
    assert!(!entry.is_live(3_001));
  }

  #[test]
  fn test_zero_ttl_expires_after_any_time() {
    let entry = CacheEntry::new(1u8, 500, 0);
    assert!(entry.is_live(500));
    assert!(!entry.is_live(501));
  }

  #[test]
  fn test_lookup_hides_expired() {
    assert_eq!(Lookup::Hit(3).into_option(), Some(3));
    assert_eq!(Lookup::<u8>::Miss.into_option(), None);
    assert_eq!(Lookup::<u8>::Expired.into_option(), None);
  }
}
