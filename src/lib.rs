//! Weekly retail sales forecasting and method comparison.
//!
//! The pipeline loads a product catalog and a daily sales transaction
//! file, joins them, reshapes the merged table into weekly series, and
//! runs three forecasting methods over every product:
//!
//! - **Hierarchical**: auto-selected ARIMA per market leaf and per
//!   product aggregate, with top-down proportional reconciliation.
//! - **ARIMAX**: least-squares price and promotion effects with an
//!   auto-selected ARIMA on the residuals.
//! - **Growth**: a saturating logistic trend with ridge-penalised
//!   additive regressor effects.
//!
//! Each product's final weeks are held out, forecasts are clipped to
//! zero and scored (RMSE, MAE, MASE), and the methods are compared by
//! per-product wins and MASE distribution.
//!
//! ```no_run
//! use retail_forecast::prelude::*;
//!
//! # fn main() -> retail_forecast::Result<()> {
//! let config = PipelineConfig::default();
//! let (merged, report) = load_merged("products.csv", "sales.csv", &config)?;
//! println!("joined {} of {} sales rows", report.matched, report.sales_rows);
//!
//! let results = run_all(&merged, &config)?;
//! let comparison = compare(&results);
//! for summary in &comparison.summaries {
//!     println!("{}: {} wins", summary.method, summary.wins);
//! }
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod config;
pub mod core;
pub mod error;
pub mod loader;
pub mod models;
pub mod report;
pub mod reshape;
pub mod runner;
pub mod score;
pub mod utils;

pub use error::{PipelineError, Result};

/// Common imports for pipeline users.
pub mod prelude {
    pub use crate::compare::{compare, Comparison, MethodSummary};
    pub use crate::config::PipelineConfig;
    pub use crate::core::{MergedTable, WeeklyAggregate, WeeklySeries};
    pub use crate::error::{PipelineError, Result};
    pub use crate::loader::{load_merged, JoinReport};
    pub use crate::models::{Forecaster, Method};
    pub use crate::report::{
        plot_forecast_overlay, plot_volume_histogram, write_comparison_table, write_method_table,
    };
    pub use crate::reshape::{build_frames, HierarchyTable, ProductFrame};
    pub use crate::runner::{run_all, MethodResults, ProductForecast};
    pub use crate::score::{score_forecast, ForecastScore};
}
