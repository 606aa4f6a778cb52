//! Command-line subcommands

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use serde_json::Value;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Read and write the expiring cache
  #[command(subcommand)]
  Cache(CacheCommand),

  /// Inspect and replay the offline write queue
  #[command(subcommand)]
  Queue(QueueCommand),

  /// Write to the remote store, queueing the operation if it fails
  Write {
    #[arg(value_enum)]
    kind: OperationKind,
    /// Remote collection, e.g. "tanks"
    target: String,
    /// JSON payload: the record for insert, {"id", "changes"} for update, {"id"} for delete
    #[arg(value_parser = parse_json)]
    payload: Value,
  },

  /// Cached station analytics
  #[command(subcommand)]
  Analytics(AnalyticsCommand),
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// Print a live value
  Get { key: String },
  /// Store a JSON value
  Set {
    key: String,
    #[arg(value_parser = parse_json)]
    value: Value,
    /// Lifetime in seconds (defaults to the configured ttl)
    #[arg(long)]
    ttl: Option<u64>,
  },
  /// Delete a key
  Remove { key: String },
  /// Delete every key, including the offline queue
  Clear,
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
  /// Queue an operation without contacting the remote store
  Enqueue {
    #[arg(value_enum)]
    kind: OperationKind,
    target: String,
    #[arg(value_parser = parse_json)]
    payload: Value,
  },
  /// List pending operations
  List,
  /// Replay pending operations against the remote store
  Drain,
  /// List operations that exhausted their retries
  DeadLetters {
    /// Discard them after listing
    #[arg(long)]
    clear: bool,
  },
}

#[derive(Subcommand, Debug)]
pub enum AnalyticsCommand {
  DailySales {
    #[arg(long)]
    station: String,
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to: NaiveDate,
  },
  TankTrends {
    #[arg(long)]
    station: String,
    #[arg(long, default_value_t = 7)]
    days: u32,
  },
  StaffPerformance {
    #[arg(long)]
    station: String,
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to: NaiveDate,
  },
  /// Change between two tank or meter readings
  VolumeDelta {
    #[arg(long)]
    previous: f64,
    #[arg(long)]
    new: f64,
  },
  /// Revenue and margin for a volume sold at a price against a cost
  Margin {
    #[arg(long)]
    volume: f64,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    cost: f64,
  },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
  Insert,
  Update,
  Delete,
}

impl OperationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      OperationKind::Insert => "insert",
      OperationKind::Update => "update",
      OperationKind::Delete => "delete",
    }
  }
}

/// Parse a command-line argument as a JSON document.
fn parse_json(s: &str) -> Result<Value, serde_json::Error> {
  serde_json::from_str(s)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Args;
  use clap::Parser;
  use serde_json::json;

  #[test]
  fn test_parse_queue_enqueue() {
    let args = Args::try_parse_from([
      "station-sync",
      "queue",
      "enqueue",
      "update",
      "tanks",
      r#"{"id":1,"changes":{"volume":600}}"#,
    ])
    .unwrap();

    match args.command {
      Command::Queue(QueueCommand::Enqueue {
        kind,
        target,
        payload,
      }) => {
        assert_eq!(kind, OperationKind::Update);
        assert_eq!(target, "tanks");
        assert_eq!(payload, json!({"id": 1, "changes": {"volume": 600}}));
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_cache_set_with_ttl() {
    let args = Args::try_parse_from([
      "station-sync",
      "cache",
      "set",
      "tank-1",
      r#"{"volume":500}"#,
      "--ttl",
      "60",
    ])
    .unwrap();

    match args.command {
      Command::Cache(CacheCommand::Set { key, value, ttl }) => {
        assert_eq!(key, "tank-1");
        assert_eq!(value, json!({"volume": 500}));
        assert_eq!(ttl, Some(60));
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_write_insert_record_is_object() {
    let args = Args::try_parse_from([
      "station-sync",
      "write",
      "insert",
      "sales",
      r#"{"volume_sold":20}"#,
    ])
    .unwrap();

    match args.command {
      Command::Write { payload, .. } => assert_eq!(payload, json!({"volume_sold": 20})),
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_dates() {
    let args = Args::try_parse_from([
      "station-sync",
      "analytics",
      "daily-sales",
      "--station",
      "1",
      "--from",
      "2024-03-01",
      "--to",
      "2024-03-31",
    ])
    .unwrap();
    assert!(matches!(
      args.command,
      Command::Analytics(AnalyticsCommand::DailySales { .. })
    ));
  }

  #[test]
  fn test_rejects_bad_json_payload() {
    let result = Args::try_parse_from(["station-sync", "write", "insert", "sales", "{not json"]);
    assert!(result.is_err());
  }
}
