//! Offline write queue.
//!
//! Mutations that could not reach the remote store are appended here and
//! replayed in order by `drain`. Failed replays stay queued with an attempt
//! counter; after too many failures they are parked as dead letters.

mod offline;
mod types;

pub use offline::{apply, OfflineQueue, DEFAULT_MAX_ATTEMPTS};
pub use types::{DrainReport, Operation};
