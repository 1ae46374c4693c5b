//! Core data structures for the sales forecasting pipeline.

mod records;
mod weekly;

pub use records::{MergedRecord, MergedTable, Product, SaleRecord};
pub use weekly::{bin_weekly, week_start, WeeklyAggregate, WeeklySeries};
