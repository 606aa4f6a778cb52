//! Remote data service boundary.
//!
//! The rest of the crate only needs insert/update/delete against a named
//! collection plus filtered selects; `RestStore` provides them over HTTP.

mod rest;

pub use rest::RestStore;

use color_eyre::Result;
use serde_json::Value;
use std::future::Future;

/// Comparison used in a select filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
  Eq,
  Gte,
  Lte,
}

impl FilterOp {
  fn as_str(self) -> &'static str {
    match self {
      FilterOp::Eq => "eq",
      FilterOp::Gte => "gte",
      FilterOp::Lte => "lte",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
  pub column: String,
  pub op: FilterOp,
  pub value: String,
}

/// A read against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
  pub table: String,
  /// Column list, including embedded relations (e.g. `*,staff:staff_id(name,role)`)
  pub columns: String,
  pub filters: Vec<Filter>,
  /// Column to order by and whether ascending
  pub order: Option<(String, bool)>,
}

impl SelectQuery {
  pub fn new(table: &str) -> Self {
    Self {
      table: table.to_string(),
      columns: "*".to_string(),
      filters: Vec::new(),
      order: None,
    }
  }

  pub fn columns(mut self, columns: &str) -> Self {
    self.columns = columns.to_string();
    self
  }

  pub fn filter(mut self, column: &str, op: FilterOp, value: impl ToString) -> Self {
    self.filters.push(Filter {
      column: column.to_string(),
      op,
      value: value.to_string(),
    });
    self
  }

  pub fn eq(self, column: &str, value: impl ToString) -> Self {
    self.filter(column, FilterOp::Eq, value)
  }

  pub fn gte(self, column: &str, value: impl ToString) -> Self {
    self.filter(column, FilterOp::Gte, value)
  }

  pub fn lte(self, column: &str, value: impl ToString) -> Self {
    self.filter(column, FilterOp::Lte, value)
  }

  pub fn order(mut self, column: &str, ascending: bool) -> Self {
    self.order = Some((column.to_string(), ascending));
    self
  }

  /// Query string pairs in the remote service's filter syntax.
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), self.columns.clone())];
    for f in &self.filters {
      pairs.push((f.column.clone(), format!("{}.{}", f.op.as_str(), f.value)));
    }
    if let Some((column, ascending)) = &self.order {
      let dir = if *ascending { "asc" } else { "desc" };
      pairs.push(("order".to_string(), format!("{}.{}", column, dir)));
    }
    pairs
  }
}

/// Collection-oriented remote store.
///
/// Every call may fail; callers decide whether to retry or queue.
pub trait RemoteStore: Send + Sync {
  /// Insert one record into `target`.
  fn insert(&self, target: &str, record: &Value) -> impl Future<Output = Result<()>> + Send;

  /// Apply `changes` to the record in `target` whose id is `id`.
  fn update(
    &self,
    target: &str,
    id: &Value,
    changes: &Value,
  ) -> impl Future<Output = Result<()>> + Send;

  /// Delete the record in `target` whose id is `id`.
  fn delete(&self, target: &str, id: &Value) -> impl Future<Output = Result<()>> + Send;

  /// Read rows matching `query`.
  fn select(&self, query: &SelectQuery) -> impl Future<Output = Result<Vec<Value>>> + Send;
}

/// Render an id for use in a filter value.
pub(crate) fn id_to_filter_value(id: &Value) -> String {
  match id {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_query_pairs() {
    let query = SelectQuery::new("sales")
      .eq("station_id", "st-1")
      .gte("date", "2024-01-01")
      .lte("date", "2024-01-31")
      .order("date", false);

    assert_eq!(
      query.query_pairs(),
      vec![
        ("select".to_string(), "*".to_string()),
        ("station_id".to_string(), "eq.st-1".to_string()),
        ("date".to_string(), "gte.2024-01-01".to_string()),
        ("date".to_string(), "lte.2024-01-31".to_string()),
        ("order".to_string(), "date.desc".to_string()),
      ]
    );
  }

  #[test]
  fn test_id_filter_value() {
    assert_eq!(id_to_filter_value(&json!(1)), "1");
    assert_eq!(id_to_filter_value(&json!("abc")), "abc");
  }
}
