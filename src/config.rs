//! Pipeline configuration.
//!
//! Every global threshold the analysis depends on lives here instead of
//! being scattered through the pipeline as literals.

/// Configuration shared by the loader, reshaper, runners, and scorer.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Forecast horizon in weeks. The test window is exactly this long.
    pub horizon: usize,
    /// Weekly periods per year, used as the seasonal period for MASE.
    pub periods_per_year: usize,
    /// Saturating upper bound for the growth-curve method.
    pub growth_cap: f64,
    /// Saturating lower bound for the growth-curve method.
    pub growth_floor: f64,
    /// Minimum number of training weeks required to fit any model.
    pub min_train_weeks: usize,
    /// Minimum fraction of sales rows that must match the catalog join.
    pub min_match_rate: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: 5,
            periods_per_year: 52,
            growth_cap: 1000.0,
            growth_floor: 0.0,
            min_train_weeks: 10,
            min_match_rate: 0.5,
        }
    }
}

impl PipelineConfig {
    /// Set the forecast horizon.
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Set the saturating growth bounds.
    pub fn with_growth_bounds(mut self, floor: f64, cap: f64) -> Self {
        self.growth_floor = floor;
        self.growth_cap = cap;
        self
    }

    /// Set the minimum training window length in weeks.
    pub fn with_min_train_weeks(mut self, weeks: usize) -> Self {
        self.min_train_weeks = weeks;
        self
    }

    /// Seasonal period usable for a training window of `train_len` weeks.
    ///
    /// A 52-week benchmark needs more than a year of history; shorter
    /// windows fall back to the lag-1 naive benchmark.
    pub fn mase_period(&self, train_len: usize) -> usize {
        if train_len > self.periods_per_year {
            self.periods_per_year
        } else {
            1
        }
    }
}
