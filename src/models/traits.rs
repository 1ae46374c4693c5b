//! The shared forecasting contract and the closed set of methods.

use std::collections::BTreeMap;

use crate::core::WeeklySeries;
use crate::error::Result;

/// The three forecasting methods under comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    /// Hierarchical reconciliation over product x market leaves.
    Hierarchical,
    /// ARIMA with external regressors (prices, promotions).
    Arimax,
    /// Saturating-growth additive regression.
    Growth,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Hierarchical, Method::Arimax, Method::Growth];

    pub fn label(&self) -> &'static str {
        match self {
            Method::Hierarchical => "hierarchical",
            Method::Arimax => "arimax",
            Method::Growth => "growth",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Common interface for the univariate forecasting models.
///
/// The lifecycle is Fit then Predict; the terminal Clip step is shared
/// across methods via [`clip_non_negative`]. Models that use external
/// regressors read them from the training series and expect aligned
/// future values at prediction time; the others ignore `future`.
pub trait Forecaster {
    /// Fit the model to a training window.
    fn fit(&mut self, series: &WeeklySeries) -> Result<()>;

    /// Point forecasts for `horizon` steps beyond the training window.
    fn predict(&self, horizon: usize, future: &BTreeMap<String, Vec<f64>>) -> Result<Vec<f64>>;

    /// Model name for logs and reports.
    fn name(&self) -> &str;

    /// Whether `fit` has completed successfully.
    fn is_fitted(&self) -> bool;
}

/// Terminal pipeline step: sold units cannot be negative, so negative
/// point forecasts are replaced with zero for every method.
pub fn clip_non_negative(values: &mut [f64]) {
    for v in values.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}
