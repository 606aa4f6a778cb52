//! Durable FIFO of mutations made while the remote store was unreachable.

use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::types::{DeadLetter, DrainReport, Operation, QueueState, QueuedOperation};
use crate::cache::{ExpiringCache, KvStorage};
use crate::remote::RemoteStore;

/// Storage key holding the queue. Shares the cache namespace, so a full
/// cache clear also empties the queue.
pub const QUEUE_KEY: &str = "offlineQueue";

/// Default number of failed replays before an operation is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Offline write queue persisted next to the cache.
pub struct OfflineQueue<S: KvStorage> {
  cache: ExpiringCache<S>,
  max_attempts: u32,
  /// Lowest sequence number this process may hand out; outlives a cache clear
  next_seq: Arc<AtomicU64>,
  /// Serializes read-modify-write of the persisted state
  state_lock: Arc<Mutex<()>>,
  /// Serializes drain passes
  drain_lock: Arc<Mutex<()>>,
}

impl<S: KvStorage> OfflineQueue<S> {
  pub fn new(cache: ExpiringCache<S>) -> Self {
    Self {
      cache,
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      next_seq: Arc::new(AtomicU64::new(0)),
      state_lock: Arc::new(Mutex::new(())),
      drain_lock: Arc::new(Mutex::new(())),
    }
  }

  /// Set the retry cap. Values below 1 are treated as 1.
  pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
    self.max_attempts = max_attempts.max(1);
    self
  }

  fn load(&self) -> Result<QueueState> {
    match self.cache.storage().read(QUEUE_KEY)? {
      Some(data) => serde_json::from_slice(&data)
        .map_err(|e| eyre!("Failed to deserialize offline queue: {}", e)),
      None => Ok(QueueState::default()),
    }
  }

  fn save(&self, state: &QueueState) -> Result<()> {
    let data =
      serde_json::to_vec(state).map_err(|e| eyre!("Failed to serialize offline queue: {}", e))?;
    self.cache.storage().write(QUEUE_KEY, &data)
  }

  /// Append an operation. Nothing is recorded if the write fails.
  pub async fn enqueue(&self, target: &str, op: Operation) -> Result<QueuedOperation> {
    let _guard = self.state_lock.lock().await;
    let mut state = self.load()?;
    let seq = state.next_seq.max(self.next_seq.load(Ordering::SeqCst));

    let queued = QueuedOperation {
      seq,
      target: target.to_string(),
      op,
      enqueued_at: self.cache.now_millis(),
      attempts: 0,
    };
    state.next_seq = seq + 1;
    state.pending.push(queued.clone());
    self.save(&state)?;
    self.next_seq.fetch_max(seq + 1, Ordering::SeqCst);

    info!(
      seq = queued.seq,
      collection = target,
      kind = queued.op.kind(),
      "queued offline operation"
    );
    Ok(queued)
  }

  /// Operations waiting for replay, oldest first.
  pub fn pending(&self) -> Result<Vec<QueuedOperation>> {
    Ok(self.load()?.pending)
  }

  pub fn len(&self) -> Result<usize> {
    Ok(self.load()?.pending.len())
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.len()? == 0)
  }

  pub fn dead_letters(&self) -> Result<Vec<DeadLetter>> {
    Ok(self.load()?.dead_letters)
  }

  pub async fn clear_dead_letters(&self) -> Result<usize> {
    let _guard = self.state_lock.lock().await;
    let mut state = self.load()?;
    let count = state.dead_letters.len();
    state.dead_letters.clear();
    self.save(&state)?;
    Ok(count)
  }

  /// Replay every pending operation in order against `remote`.
  ///
  /// Each operation is awaited before the next is sent, and its outcome is
  /// saved before moving on: a success leaves the queue at once, a failure
  /// is counted against the operation and the pass continues. Once an
  /// operation has failed `max_attempts` times it is moved to the dead
  /// letters. Operations enqueued during the pass are left for the next one.
  pub async fn drain<R: RemoteStore>(&self, remote: &R) -> Result<DrainReport> {
    let _drain = self.drain_lock.lock().await;

    let snapshot = {
      let _guard = self.state_lock.lock().await;
      self.load()?.pending
    };

    if snapshot.is_empty() {
      return Ok(DrainReport::default());
    }

    info!(count = snapshot.len(), "draining offline queue");

    let mut report = DrainReport::default();
    for queued in snapshot {
      let outcome = apply(remote, &queued.target, &queued.op).await;
      if outcome.is_ok() {
        report.replayed += 1;
      }

      let _guard = self.state_lock.lock().await;
      let mut state = self.load()?;
      let Some(idx) = state.pending.iter().position(|p| p.is_same(&queued)) else {
        debug!(seq = queued.seq, "offline operation left the queue during drain");
        continue;
      };

      match outcome {
        Ok(()) => {
          state.pending.remove(idx);
        }
        Err(e) => {
          warn!(
            seq = queued.seq,
            collection = %queued.target,
            kind = queued.op.kind(),
            error = %e,
            "failed to replay offline operation"
          );
          state.pending[idx].attempts += 1;
          if state.pending[idx].attempts >= self.max_attempts {
            let operation = state.pending.remove(idx);
            error!(
              seq = operation.seq,
              collection = %operation.target,
              attempts = operation.attempts,
              "giving up on offline operation"
            );
            state.dead_letters.push(DeadLetter {
              operation,
              last_error: e.to_string(),
              dead_at: self.cache.now_millis(),
            });
            report.dead_lettered += 1;
          } else {
            report.failed += 1;
          }
        }
      }
      self.save(&state)?;
    }

    report.remaining = {
      let _guard = self.state_lock.lock().await;
      self.load()?.pending.len()
    };

    info!(
      replayed = report.replayed,
      failed = report.failed,
      dead_lettered = report.dead_lettered,
      remaining = report.remaining,
      "offline queue drained"
    );
    Ok(report)
  }
}

impl<S: KvStorage> Clone for OfflineQueue<S> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      max_attempts: self.max_attempts,
      next_seq: Arc::clone(&self.next_seq),
      state_lock: Arc::clone(&self.state_lock),
      drain_lock: Arc::clone(&self.drain_lock),
    }
  }
}

/// Dispatch an operation to the matching remote call.
pub async fn apply<R: RemoteStore>(remote: &R, target: &str, op: &Operation) -> Result<()> {
  match op {
    Operation::Insert { record } => remote.insert(target, record).await,
    Operation::Update { id, changes } => remote.update(target, id, changes).await,
    Operation::Delete { id } => remote.delete(target, id).await,
  }
}
