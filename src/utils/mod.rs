//! Numeric utilities shared by the forecasting models.

pub mod ols;
pub mod optimization;
pub mod stats;

pub use ols::{ols_fit, OlsFit};
pub use optimization::{minimize, MinimizeOptions, MinimizeResult};
pub use stats::{mean, median, variance};
