use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Staff fields embedded in a sales row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRef {
  pub name: String,
  pub role: String,
}

/// One logged sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
  pub id: Value,
  pub station_id: Value,
  pub staff_id: Value,
  #[serde(default)]
  pub shift: Option<String>,
  #[serde(default)]
  pub opening_reading: f64,
  #[serde(default)]
  pub closing_reading: f64,
  pub volume_sold: f64,
  pub revenue: f64,
  pub date: String,
  #[serde(default)]
  pub staff: Option<StaffRef>,
}

/// Tank state as stored remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
  pub id: Value,
  pub station_id: Value,
  pub name: String,
  pub capacity: f64,
  pub current_volume: f64,
  pub product_type: String,
  pub last_updated: String,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub selling_price: f64,
}

/// Sales totals for one member of staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffPerformance {
  pub name: String,
  pub role: String,
  pub total_sales: f64,
  pub total_volume: f64,
  pub transactions: u32,
}
