//! Station analytics: cached remote reads and derived figures.

mod keys;
mod metrics;
mod service;
mod types;

pub use metrics::{profit_margin, revenue, volume_delta};
pub use service::AnalyticsService;
