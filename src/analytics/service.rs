//! Analytics reads wrapped with the expiring cache.

use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::keys::{day, AnalyticsQuery};
use super::metrics;
use super::types::{Sale, StaffPerformance, Tank};
use crate::cache::{ExpiringCache, KvStorage};
use crate::remote::{RemoteStore, SelectQuery};

/// Remote analytics reads with transparent caching.
pub struct AnalyticsService<S: KvStorage, R: RemoteStore> {
  cache: ExpiringCache<S>,
  remote: Arc<R>,
}

impl<S: KvStorage, R: RemoteStore> AnalyticsService<S, R> {
  pub fn new(cache: ExpiringCache<S>, remote: Arc<R>) -> Self {
    Self { cache, remote }
  }

  /// Sales rows for a station with `date` between `start` and `end` inclusive.
  pub async fn daily_sales(
    &self,
    station_id: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<Vec<Sale>> {
    let query = AnalyticsQuery::DailySales {
      station_id: station_id.to_string(),
      start,
      end,
    };
    let select = SelectQuery::new("sales")
      .eq("station_id", station_id)
      .gte("date", day(&start))
      .lte("date", day(&end));

    self.cached(&query, || self.rows(&select)).await
  }

  /// Tank rows for a station, most recently updated first.
  ///
  /// `days` only scopes the cache entry; the remote read is not windowed.
  pub async fn tank_volume_trends(&self, station_id: &str, days: u32) -> Result<Vec<Tank>> {
    let query = AnalyticsQuery::TankTrends {
      station_id: station_id.to_string(),
      days,
    };
    let select = SelectQuery::new("tanks")
      .eq("station_id", station_id)
      .order("last_updated", false);

    self.cached(&query, || self.rows(&select)).await
  }

  /// Per-staff sales totals for a station between two dates.
  pub async fn staff_performance(
    &self,
    station_id: &str,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<BTreeMap<String, StaffPerformance>> {
    let query = AnalyticsQuery::StaffPerformance {
      station_id: station_id.to_string(),
      start,
      end,
    };
    let select = SelectQuery::new("sales")
      .columns("*,staff:staff_id(name,role)")
      .eq("station_id", station_id)
      .gte("date", day(&start))
      .lte("date", day(&end));

    self
      .cached(&query, || async {
        let sales: Vec<Sale> = self.rows(&select).await?;
        Ok(metrics::staff_performance(&sales))
      })
      .await
  }

  async fn cached<T, F, Fut>(&self, query: &AnalyticsQuery, fetcher: F) -> Result<T>
  where
    T: serde::Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
  {
    debug!(query = %query.description(), "analytics read");
    self
      .cache
      .fetch(&query.cache_key(), query.ttl_secs(), fetcher)
      .await
  }

  async fn rows<T: DeserializeOwned>(&self, select: &SelectQuery) -> Result<Vec<T>> {
    let rows = self.remote.select(select).await?;
    rows
      .into_iter()
      .map(|row| {
        serde_json::from_value(row)
          .map_err(|e| eyre!("Failed to parse {} row: {}", select.table, e))
      })
      .collect()
  }
}
