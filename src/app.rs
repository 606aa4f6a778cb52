use color_eyre::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::analytics::{self, AnalyticsService};
use crate::cache::{ExpiringCache, SqliteStorage};
use crate::commands::{AnalyticsCommand, CacheCommand, Command, QueueCommand};
use crate::config::Config;
use crate::queue::{OfflineQueue, Operation};
use crate::remote::RestStore;
use crate::sync::{SyncService, WriteOutcome};

/// Wires the store, queue and remote client together for one invocation.
pub struct App {
  config: Config,
  cache: ExpiringCache<SqliteStorage>,
  queue: OfflineQueue<SqliteStorage>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let storage = match &config.cache.path {
      Some(path) => SqliteStorage::open_at(path, &config.cache.namespace)?,
      None => SqliteStorage::open(&config.cache.namespace)?,
    };
    info!(namespace = storage.namespace(), "opened store");

    let cache = ExpiringCache::new(storage).with_default_ttl(config.cache.default_ttl_secs);
    let queue = OfflineQueue::new(cache.clone()).with_max_attempts(config.sync.max_attempts);

    Ok(Self {
      config,
      cache,
      queue,
    })
  }

  /// Remote client, created only for commands that talk to the data service.
  fn remote(&self) -> Result<Arc<RestStore>> {
    Ok(Arc::new(RestStore::new(&self.config)?))
  }

  fn sync_service(&self) -> Result<SyncService<SqliteStorage, RestStore>> {
    Ok(
      SyncService::new(self.queue.clone(), self.remote()?).with_offline(self.config.sync.offline),
    )
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Cache(cmd) => self.run_cache(cmd),
      Command::Queue(cmd) => self.run_queue(cmd).await,
      Command::Write {
        kind,
        target,
        payload,
      } => {
        let op = Operation::from_payload(kind.as_str(), payload)?;
        let outcome = self.sync_service()?.write(&target, op).await?;
        match outcome {
          WriteOutcome::Applied => print_json(&json!({ "status": "applied" })),
          WriteOutcome::Queued { seq } => print_json(&json!({ "status": "queued", "seq": seq })),
        }
      }
      Command::Analytics(cmd) => self.run_analytics(cmd).await,
    }
  }

  fn run_cache(&self, command: CacheCommand) -> Result<()> {
    match command {
      CacheCommand::Get { key } => {
        let value: Option<Value> = self.cache.get(&key)?;
        print_json(&value)
      }
      CacheCommand::Set { key, value, ttl } => {
        let ttl = ttl.unwrap_or(self.cache.default_ttl());
        self.cache.set(&key, &value, ttl)
      }
      CacheCommand::Remove { key } => self.cache.remove(&key),
      CacheCommand::Clear => self.cache.clear(),
    }
  }

  async fn run_queue(&self, command: QueueCommand) -> Result<()> {
    match command {
      QueueCommand::Enqueue {
        kind,
        target,
        payload,
      } => {
        let op = Operation::from_payload(kind.as_str(), payload)?;
        let queued = self.queue.enqueue(&target, op).await?;
        print_json(&queued)
      }
      QueueCommand::List => print_json(&self.queue.pending()?),
      QueueCommand::Drain => {
        let report = self.sync_service()?.sync().await?;
        print_json(&report)
      }
      QueueCommand::DeadLetters { clear } => {
        print_json(&self.queue.dead_letters()?)?;
        if clear {
          let count = self.queue.clear_dead_letters().await?;
          info!(count, "cleared dead letters");
        }
        Ok(())
      }
    }
  }

  fn analytics(&self) -> Result<AnalyticsService<SqliteStorage, RestStore>> {
    Ok(AnalyticsService::new(self.cache.clone(), self.remote()?))
  }

  async fn run_analytics(&self, command: AnalyticsCommand) -> Result<()> {
    match command {
      AnalyticsCommand::DailySales { station, from, to } => {
        print_json(&self.analytics()?.daily_sales(&station, from, to).await?)
      }
      AnalyticsCommand::TankTrends { station, days } => {
        print_json(&self.analytics()?.tank_volume_trends(&station, days).await?)
      }
      AnalyticsCommand::StaffPerformance { station, from, to } => {
        print_json(&self.analytics()?.staff_performance(&station, from, to).await?)
      }
      AnalyticsCommand::VolumeDelta { previous, new } => print_json(&json!({
        "delta": analytics::volume_delta(previous, new),
      })),
      AnalyticsCommand::Margin {
        volume,
        price,
        cost,
      } => {
        let revenue = analytics::revenue(volume, price);
        print_json(&json!({
          "revenue": revenue,
          "profit": revenue - cost,
          "margin_percent": analytics::profit_margin(revenue, cost),
        }))
      }
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
