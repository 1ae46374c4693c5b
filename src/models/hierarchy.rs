//! Hierarchical forecasting with top-down reconciliation.
//!
//! One auto-selected ARIMA per market leaf and one for the product-level
//! aggregate. The aggregate forecast is authoritative; leaf forecasts
//! are rescaled step by step so they sum exactly to it. Leaves and the
//! aggregate are clipped to zero before reconciliation, so the rescaled
//! leaves stay non-negative too.

use tracing::debug;

use crate::core::WeeklySeries;
use crate::error::{PipelineError, Result};
use crate::models::{clip_non_negative, AutoArima};

/// Forecasts for one product after reconciliation.
#[derive(Debug, Clone)]
pub struct ReconciledForecast {
    /// Product-level aggregate forecast, one value per horizon step.
    pub aggregate: Vec<f64>,
    /// Per-market leaf forecasts, summing to the aggregate at every step.
    pub leaves: Vec<(String, Vec<f64>)>,
}

/// Per-product hierarchical model: leaf models plus an aggregate model.
#[derive(Debug, Clone)]
pub struct HierarchicalProduct {
    product_id: String,
    aggregate_model: Option<AutoArima>,
    leaf_models: Vec<(String, AutoArima)>,
}

impl HierarchicalProduct {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            aggregate_model: None,
            leaf_models: Vec::new(),
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Fit the aggregate series and every market leaf.
    pub fn fit(
        &mut self,
        aggregate: &WeeklySeries,
        leaves: &[(String, WeeklySeries)],
    ) -> Result<()> {
        if leaves.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        for (_, leaf) in leaves {
            if leaf.len() != aggregate.len() {
                return Err(PipelineError::DimensionMismatch {
                    expected: aggregate.len(),
                    got: leaf.len(),
                });
            }
        }

        let mut aggregate_model = AutoArima::new();
        aggregate_model.fit_slice(aggregate.values())?;

        let mut leaf_models = Vec::with_capacity(leaves.len());
        for (market, leaf) in leaves {
            let mut model = AutoArima::new();
            model.fit_slice(leaf.values())?;
            leaf_models.push((market.clone(), model));
        }

        debug!(
            product = %self.product_id,
            leaves = leaf_models.len(),
            "hierarchical models fitted"
        );
        self.aggregate_model = Some(aggregate_model);
        self.leaf_models = leaf_models;
        Ok(())
    }

    /// Forecast every level and reconcile leaves to the aggregate.
    pub fn predict(&self, horizon: usize) -> Result<ReconciledForecast> {
        let aggregate_model = self
            .aggregate_model
            .as_ref()
            .ok_or(PipelineError::FitRequired)?;

        let mut aggregate = aggregate_model.predict_slice(horizon)?;
        clip_non_negative(&mut aggregate);

        let mut leaves: Vec<(String, Vec<f64>)> = Vec::with_capacity(self.leaf_models.len());
        for (market, model) in &self.leaf_models {
            let mut forecast = model.predict_slice(horizon)?;
            clip_non_negative(&mut forecast);
            leaves.push((market.clone(), forecast));
        }

        // Top-down proportional reconciliation, one horizon step at a
        // time. When every leaf forecasts zero the aggregate is spread
        // evenly instead of divided by zero.
        for step in 0..horizon {
            let leaf_sum: f64 = leaves.iter().map(|(_, f)| f[step]).sum();
            if leaf_sum > 0.0 {
                let scale = aggregate[step] / leaf_sum;
                for (_, forecast) in leaves.iter_mut() {
                    forecast[step] *= scale;
                }
            } else {
                let share = aggregate[step] / leaves.len() as f64;
                for (_, forecast) in leaves.iter_mut() {
                    forecast[step] = share;
                }
            }
        }

        Ok(ReconciledForecast { aggregate, leaves })
    }

    pub fn is_fitted(&self) -> bool {
        self.aggregate_model.is_some()
    }
}
