// Library crate - exports the overlay pipeline and the HTTP surface

pub mod types;
pub mod records;
pub mod bands;
pub mod trend;
pub mod range;
pub mod markers;
pub mod overlay;
pub mod chart;
pub mod config;
pub mod query;
pub mod api;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use types::*;
pub use chart::{Chart, ChartOverlays, ChartSummary};
pub use config::DashboardConfig;
pub use range::DateRange;
