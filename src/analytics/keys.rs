//! Cache keys for analytics reads.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Analytics reads that are cached.
#[derive(Clone, Debug)]
pub enum AnalyticsQuery {
  /// Sales rows for a station between two dates
  DailySales {
    station_id: String,
    start: NaiveDate,
    end: NaiveDate,
  },
  /// Tank rows for a station
  TankTrends { station_id: String, days: u32 },
  /// Per-staff aggregates for a station between two dates
  StaffPerformance {
    station_id: String,
    start: NaiveDate,
    end: NaiveDate,
  },
}

impl AnalyticsQuery {
  /// Stable, fixed-length storage key. The station id is hashed exactly as
  /// it is sent to the remote store.
  pub fn cache_key(&self) -> String {
    let input = match self {
      Self::DailySales {
        station_id,
        start,
        end,
      } => format!("daily-sales:{}:{}:{}", station_id, day(start), day(end)),
      Self::TankTrends { station_id, days } => {
        format!("tank-trends:{}:{}", station_id, days)
      }
      Self::StaffPerformance {
        station_id,
        start,
        end,
      } => format!(
        "staff-performance:{}:{}:{}",
        station_id,
        day(start),
        day(end)
      ),
    };

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("analytics:{}", hex::encode(hasher.finalize()))
  }

  pub fn description(&self) -> String {
    match self {
      Self::DailySales {
        station_id,
        start,
        end,
      } => format!("daily sales for station {} from {} to {}", station_id, start, end),
      Self::TankTrends { station_id, days } => {
        format!("tank trends for station {} over {} days", station_id, days)
      }
      Self::StaffPerformance {
        station_id,
        start,
        end,
      } => format!(
        "staff performance for station {} from {} to {}",
        station_id, start, end
      ),
    }
  }

  /// Lifetime of the cached result, in seconds.
  pub fn ttl_secs(&self) -> u64 {
    match self {
      Self::DailySales { .. } | Self::StaffPerformance { .. } => 3600,
      Self::TankTrends { .. } => 1800,
    }
  }
}

pub(super) fn day(date: &NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}
