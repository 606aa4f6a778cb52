//! Writes that fall back to the offline queue.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::KvStorage;
use crate::queue::{self, DrainReport, OfflineQueue, Operation};
use crate::remote::RemoteStore;

/// What happened to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
  /// Applied to the remote store
  Applied,
  /// Stored in the offline queue for a later drain
  Queued { seq: u64 },
}

/// Remote writes with offline fallback.
pub struct SyncService<S: KvStorage, R: RemoteStore> {
  queue: OfflineQueue<S>,
  remote: Arc<R>,
  /// Queue every write without contacting the remote
  offline: bool,
}

impl<S: KvStorage, R: RemoteStore> SyncService<S, R> {
  pub fn new(queue: OfflineQueue<S>, remote: Arc<R>) -> Self {
    Self {
      queue,
      remote,
      offline: false,
    }
  }

  pub fn with_offline(mut self, offline: bool) -> Self {
    self.offline = offline;
    self
  }

  pub fn queue(&self) -> &OfflineQueue<S> {
    &self.queue
  }

  /// Apply `op` to `target`, queueing it if the remote store rejects it.
  ///
  /// Only a failure to record the queued operation is returned as an error.
  pub async fn write(&self, target: &str, op: Operation) -> Result<WriteOutcome> {
    if !self.offline {
      match queue::apply(self.remote.as_ref(), target, &op).await {
        Ok(()) => return Ok(WriteOutcome::Applied),
        Err(e) => warn!(collection = target, error = %e, "remote write failed, queueing"),
      }
    }

    let queued = self.queue.enqueue(target, op).await?;
    Ok(WriteOutcome::Queued { seq: queued.seq })
  }

  /// Replay the offline queue.
  pub async fn sync(&self) -> Result<DrainReport> {
    if self.queue.is_empty()? {
      return Ok(DrainReport::default());
    }

    let report = self.queue.drain(self.remote.as_ref()).await?;
    if report.is_clean() {
      info!(replayed = report.replayed, "offline changes synced");
    }
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{ExpiringCache, SqliteStorage};
  use crate::remote::testing::{Call, RecordingStore};
  use serde_json::json;

  fn service() -> (SyncService<SqliteStorage, RecordingStore>, Arc<RecordingStore>) {
    let storage = SqliteStorage::open_in_memory("test").unwrap();
    let queue = OfflineQueue::new(ExpiringCache::new(storage));
    let remote = Arc::new(RecordingStore::new());
    (SyncService::new(queue, Arc::clone(&remote)), remote)
  }

  fn volume_update() -> Operation {
    Operation::Update {
      id: json!(1),
      changes: json!({ "current_volume": 600 }),
    }
  }

  #[tokio::test]
  async fn test_online_write_is_applied() {
    let (svc, remote) = service();
    let outcome = svc.write("tanks", volume_update()).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Applied);
    assert_eq!(remote.calls().len(), 1);
    assert!(svc.queue().is_empty().unwrap());
  }

  #[tokio::test]
  async fn test_failed_write_is_queued_then_synced() {
    let (svc, remote) = service();
    remote.fail_target("tanks");

    let outcome = svc.write("tanks", volume_update()).await.unwrap();
    assert!(matches!(outcome, WriteOutcome::Queued { .. }));
    assert_eq!(svc.queue().len().unwrap(), 1);

    remote.recover_target("tanks");
    let report = svc.sync().await.unwrap();
    assert_eq!(report.replayed, 1);
    assert!(svc.queue().is_empty().unwrap());
  }

  #[tokio::test]
  async fn test_offline_mode_skips_remote() {
    let (svc, remote) = service();
    let svc = svc.with_offline(true);

    svc
      .write("sales", Operation::Insert { record: json!({"volume_sold": 20}) })
      .await
      .unwrap();
    assert!(remote.calls().is_empty());

    svc.sync().await.unwrap();
    assert_eq!(
      remote.calls(),
      vec![Call::Insert {
        target: "sales".to_string(),
        record: json!({"volume_sold": 20}),
      }]
    );
  }

  #[tokio::test]
  async fn test_sync_with_empty_queue() {
    let (svc, remote) = service();
    assert_eq!(svc.sync().await.unwrap(), DrainReport::default());
    assert!(remote.calls().is_empty());
  }
}
