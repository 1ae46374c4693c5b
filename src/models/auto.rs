//! Automatic ARIMA order selection.
//!
//! Stepwise search over a small (p, q) candidate grid, with the
//! differencing order chosen around a variance-reduction heuristic.
//! Candidates are ranked by AIC; fit failures are skipped rather than
//! propagated so one degenerate order never sinks the search.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::WeeklySeries;
use crate::error::{PipelineError, Result};
use crate::models::arima::{suggest_differencing, Arima, ArimaOrder};
use crate::models::Forecaster;

/// The (p, q) pairs tried at each differencing level, cheapest first.
const STEPWISE_CANDIDATES: [(usize, usize); 9] = [
    (0, 0),
    (1, 0),
    (0, 1),
    (1, 1),
    (2, 0),
    (0, 2),
    (2, 1),
    (1, 2),
    (2, 2),
];

/// ARIMA with the order chosen by stepwise AIC search.
#[derive(Debug, Clone)]
pub struct AutoArima {
    max_p: usize,
    max_q: usize,
    max_d: usize,
    selected: Option<Arima>,
    /// (order, AIC) for every candidate that fit, best first.
    model_scores: Vec<(ArimaOrder, f64)>,
}

impl Default for AutoArima {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoArima {
    pub fn new() -> Self {
        Self {
            max_p: 2,
            max_q: 2,
            max_d: 2,
            selected: None,
            model_scores: Vec::new(),
        }
    }

    pub fn with_max_order(mut self, max_p: usize, max_d: usize, max_q: usize) -> Self {
        self.max_p = max_p;
        self.max_d = max_d;
        self.max_q = max_q;
        self
    }

    /// The winning order, once fitted.
    pub fn selected_order(&self) -> Option<ArimaOrder> {
        self.selected.as_ref().map(|m| m.order())
    }

    /// All candidate fits ranked by AIC, best first.
    pub fn model_scores(&self) -> &[(ArimaOrder, f64)] {
        &self.model_scores
    }

    pub fn fit_slice(&mut self, values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Err(PipelineError::EmptyData);
        }

        let suggested = suggest_differencing(values, self.max_d);
        let d_low = suggested.saturating_sub(1);
        let d_high = (suggested + 1).min(self.max_d);

        let mut scores: Vec<(ArimaOrder, f64)> = Vec::new();
        let mut best: Option<(Arima, f64)> = None;

        for d in d_low..=d_high {
            for (p, q) in STEPWISE_CANDIDATES {
                if p > self.max_p || q > self.max_q {
                    continue;
                }
                let order = ArimaOrder::new(p, d, q);
                let mut candidate = Arima::new(order);
                if candidate.fit_slice(values).is_err() {
                    continue;
                }
                let aic = match candidate.aic() {
                    Ok(aic) if aic.is_finite() => aic,
                    _ => continue,
                };
                scores.push((order, aic));
                let improves = best.as_ref().map(|(_, b)| aic < *b).unwrap_or(true);
                if improves {
                    best = Some((candidate, aic));
                }
            }
        }

        scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        self.model_scores = scores;

        match best {
            Some((model, aic)) => {
                debug!(order = %model.order(), aic, "auto-arima selected order");
                self.selected = Some(model);
                Ok(())
            }
            None => Err(PipelineError::ComputationError(
                "no ARIMA candidate produced a finite fit".to_string(),
            )),
        }
    }

    pub fn predict_slice(&self, horizon: usize) -> Result<Vec<f64>> {
        self.selected
            .as_ref()
            .ok_or(PipelineError::FitRequired)?
            .predict_slice(horizon)
    }
}

impl Forecaster for AutoArima {
    fn fit(&mut self, series: &WeeklySeries) -> Result<()> {
        self.fit_slice(series.values())
    }

    fn predict(&self, horizon: usize, _future: &BTreeMap<String, Vec<f64>>) -> Result<Vec<f64>> {
        self.predict_slice(horizon)
    }

    fn name(&self) -> &str {
        "auto_arima"
    }

    fn is_fitted(&self) -> bool {
        self.selected.is_some()
    }
}
