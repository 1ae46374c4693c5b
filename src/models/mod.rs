//! Forecasting models: the closed set of three methods under comparison.

mod traits;

pub mod arima;
pub mod arimax;
pub mod auto;
pub mod growth;
pub mod hierarchy;

pub use arima::{Arima, ArimaOrder};
pub use arimax::Arimax;
pub use auto::AutoArima;
pub use growth::GrowthCurve;
pub use hierarchy::{HierarchicalProduct, ReconciledForecast};
pub use traits::{clip_non_negative, Forecaster, Method};
