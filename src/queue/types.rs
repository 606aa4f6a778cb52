use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A mutation against one remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
  Insert { record: Value },
  Update { id: Value, changes: Value },
  Delete { id: Value },
}

impl Operation {
  pub fn kind(&self) -> &'static str {
    match self {
      Operation::Insert { .. } => "insert",
      Operation::Update { .. } => "update",
      Operation::Delete { .. } => "delete",
    }
  }

  /// Build an operation from a loosely shaped payload.
  ///
  /// Insert takes the full record, update expects `{"id", "changes"}` and
  /// delete expects `{"id"}`.
  pub fn from_payload(kind: &str, payload: Value) -> Result<Self> {
    match kind {
      "insert" => Ok(Operation::Insert { record: payload }),
      "update" => {
        let id = field(&payload, "id")?;
        let changes = field(&payload, "changes")?;
        Ok(Operation::Update { id, changes })
      }
      "delete" => Ok(Operation::Delete {
        id: field(&payload, "id")?,
      }),
      other => Err(eyre!("Unknown operation type: {}", other)),
    }
  }
}

fn field(payload: &Value, name: &str) -> Result<Value> {
  payload
    .get(name)
    .cloned()
    .ok_or_else(|| eyre!("Operation payload is missing '{}'", name))
}

/// An operation waiting to be replayed against the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
  /// Position in the queue; strictly increasing
  pub seq: u64,
  /// Remote collection the operation applies to
  pub target: String,
  pub op: Operation,
  /// Milliseconds since the Unix epoch
  pub enqueued_at: i64,
  /// Failed replay attempts so far
  #[serde(default)]
  pub attempts: u32,
}

impl QueuedOperation {
  /// Same queue entry, ignoring the attempt counter.
  pub fn is_same(&self, other: &QueuedOperation) -> bool {
    self.seq == other.seq
      && self.enqueued_at == other.enqueued_at
      && self.target == other.target
      && self.op == other.op
  }
}

/// An operation given up on after exhausting its retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
  pub operation: QueuedOperation,
  pub last_error: String,
  pub dead_at: i64,
}

/// Persisted queue contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct QueueState {
  pub next_seq: u64,
  pub pending: Vec<QueuedOperation>,
  #[serde(default)]
  pub dead_letters: Vec<DeadLetter>,
}

/// Summary of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
  /// Operations applied remotely and removed from the queue
  pub replayed: usize,
  /// Operations that failed and stay queued for the next drain
  pub failed: usize,
  /// Operations that failed for the last allowed time and were moved aside
  pub dead_lettered: usize,
  /// Operations still queued after the pass
  pub remaining: usize,
}

impl DrainReport {
  pub fn is_clean(&self) -> bool {
    self.failed == 0 && self.dead_lettered == 0
  }
}
