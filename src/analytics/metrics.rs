//! Derived figures computed from remote rows.

use std::collections::BTreeMap;

use super::types::{Sale, StaffPerformance};
use crate::remote::id_to_filter_value;

/// Revenue for a volume sold at a unit price.
pub fn revenue(volume: f64, price: f64) -> f64 {
  volume * price
}

/// Change between two volume readings; negative when volume fell.
pub fn volume_delta(previous: f64, new: f64) -> f64 {
  new - previous
}

/// Profit as a percentage of revenue. Zero revenue yields zero.
pub fn profit_margin(revenue: f64, cost: f64) -> f64 {
  if revenue == 0.0 {
    return 0.0;
  }
  (revenue - cost) / revenue * 100.0
}

/// Aggregate sales per staff id.
///
/// Rows without embedded staff details are reported under "unknown".
pub fn staff_performance(sales: &[Sale]) -> BTreeMap<String, StaffPerformance> {
  let mut by_staff: BTreeMap<String, StaffPerformance> = BTreeMap::new();

  for sale in sales {
    let staff_id = id_to_filter_value(&sale.staff_id);
    let entry = by_staff.entry(staff_id).or_insert_with(|| {
      let (name, role) = match &sale.staff {
        Some(staff) => (staff.name.clone(), staff.role.clone()),
        None => ("unknown".to_string(), "unknown".to_string()),
      };
      StaffPerformance {
        name,
        role,
        total_sales: 0.0,
        total_volume: 0.0,
        transactions: 0,
      }
    });

    entry.total_sales += sale.revenue;
    entry.total_volume += sale.volume_sold;
    entry.transactions += 1;
  }

  by_staff
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analytics::types::StaffRef;
  use serde_json::json;

  fn sale(staff_id: i64, name: &str, volume: f64, price: f64) -> Sale {
    Sale {
      id: json!(1),
      station_id: json!(1),
      staff_id: json!(staff_id),
      shift: Some("Morning".to_string()),
      opening_reading: 0.0,
      closing_reading: volume,
      volume_sold: volume,
      revenue: revenue(volume, price),
      date: "2024-03-01".to_string(),
      staff: Some(StaffRef {
        name: name.to_string(),
        role: "attendant".to_string(),
      }),
    }
  }

  #[test]
  fn test_revenue_and_delta() {
    assert_eq!(revenue(100.0, 617.0), 61_700.0);
    assert_eq!(volume_delta(500.0, 600.0), 100.0);
    assert_eq!(volume_delta(600.0, 450.0), -150.0);
  }

  #[test]
  fn test_profit_margin() {
    assert_eq!(profit_margin(200.0, 150.0), 25.0);
    assert_eq!(profit_margin(0.0, 10.0), 0.0);
  }

  #[test]
  fn test_staff_performance_groups_by_staff() {
    let sales = vec![
      sale(1, "Ada", 10.0, 2.0),
      sale(2, "Bola", 5.0, 2.0),
      sale(1, "Ada", 20.0, 2.0),
    ];

    let perf = staff_performance(&sales);
    assert_eq!(perf.len(), 2);

    let ada = &perf["1"];
    assert_eq!(ada.name, "Ada");
    assert_eq!(ada.transactions, 2);
    assert_eq!(ada.total_volume, 30.0);
    assert_eq!(ada.total_sales, 60.0);

    assert_eq!(perf["2"].transactions, 1);
  }

  #[test]
  fn test_staff_performance_without_staff_details() {
    let mut row = sale(9, "x", 1.0, 1.0);
    row.staff = None;
    let perf = staff_performance(&[row]);
    assert_eq!(perf["9"].name, "unknown");
  }
}
