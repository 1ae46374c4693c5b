//! ARIMA(p, d, q) estimated by conditional sum of squares.
//!
//! Coefficients are found with a bounded Nelder-Mead search over the CSS
//! objective; forecasts difference the series `d` times, iterate the
//! AR/MA recursion on the differenced scale, then integrate back.

use std::collections::BTreeMap;

use crate::core::WeeklySeries;
use crate::error::{PipelineError, Result};
use crate::models::Forecaster;
use crate::utils::{minimize, MinimizeOptions};

/// Non-seasonal ARIMA order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    fn num_params(&self) -> usize {
        // AR + MA coefficients + intercept.
        self.p + self.q + 1
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

#[derive(Debug, Clone)]
struct FittedArima {
    ar: Vec<f64>,
    ma: Vec<f64>,
    intercept: f64,
    /// CSS residual variance on the differenced scale.
    sigma2: f64,
    /// The differenced training series, kept for forecast iteration.
    diffed: Vec<f64>,
    /// Residuals on the differenced scale, aligned to `diffed`.
    residuals: Vec<f64>,
    /// Last value per differencing level, for integration.
    diff_tails: Vec<f64>,
}

/// ARIMA model with a fixed order.
#[derive(Debug, Clone)]
pub struct Arima {
    order: ArimaOrder,
    fitted: Option<FittedArima>,
}

impl Arima {
    pub fn new(order: ArimaOrder) -> Self {
        Self {
            order,
            fitted: None,
        }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Fit to raw values; differencing happens internally.
    pub fn fit_slice(&mut self, values: &[f64]) -> Result<()> {
        let order = self.order;
        let min_len = order.d + order.p.max(order.q) + 3;
        if values.len() < min_len {
            return Err(PipelineError::InsufficientData {
                needed: min_len,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidParameter(
                "series contains non-finite values".to_string(),
            ));
        }

        let (diffed, diff_tails) = difference(values, order.d);
        if diffed.len() < order.p.max(order.q) + 2 {
            return Err(PipelineError::InsufficientData {
                needed: order.d + order.p.max(order.q) + 2,
                got: values.len(),
            });
        }

        let n_params = order.num_params();
        let mut initial = vec![0.0; n_params];
        initial[n_params - 1] = crate::utils::mean(&diffed);

        // AR/MA coefficients stay inside the stationarity box; the
        // intercept is free.
        let mut bounds = vec![(-0.99, 0.99); order.p + order.q];
        bounds.push((f64::NEG_INFINITY, f64::INFINITY));

        let objective = |params: &[f64]| css_objective(&diffed, order, params);
        let result = minimize(objective, &initial, Some(&bounds), MinimizeOptions::default());

        if !result.value.is_finite() {
            return Err(PipelineError::ComputationError(
                "CSS objective did not evaluate to a finite value".to_string(),
            ));
        }

        let (ar, ma, intercept) = split_params(order, &result.point);
        let residuals = css_residuals(&diffed, &ar, &ma, intercept);
        let sigma2 = residuals.iter().map(|e| e * e).sum::<f64>() / residuals.len().max(1) as f64;

        self.fitted = Some(FittedArima {
            ar,
            ma,
            intercept,
            sigma2: sigma2.max(1e-12),
            diffed,
            residuals,
            diff_tails,
        });
        Ok(())
    }

    /// Forecast `horizon` steps past the end of the training data.
    pub fn predict_slice(&self, horizon: usize) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or(PipelineError::FitRequired)?;
        if horizon == 0 {
            return Ok(vec![]);
        }

        // Iterate the recursion on the differenced scale. Future shocks
        // are zero; known residuals feed the MA part while they last.
        let mut history = fitted.diffed.clone();
        let mut shocks = fitted.residuals.clone();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let mut value = fitted.intercept;
            for (lag, phi) in fitted.ar.iter().enumerate() {
                if let Some(x) = history.get(history.len().wrapping_sub(lag + 1)) {
                    value += phi * x;
                }
            }
            for (lag, theta) in fitted.ma.iter().enumerate() {
                if let Some(e) = shocks.get(shocks.len().wrapping_sub(lag + 1)) {
                    value += theta * e;
                }
            }
            history.push(value);
            shocks.push(0.0);
            forecasts.push(value);
        }

        Ok(integrate(&forecasts, &fitted.diff_tails))
    }

    /// Akaike information criterion of the CSS fit.
    pub fn aic(&self) -> Result<f64> {
        let fitted = self.fitted.as_ref().ok_or(PipelineError::FitRequired)?;
        let n = fitted.residuals.len() as f64;
        let k = self.order.num_params() as f64 + 1.0; // + sigma2
        Ok(n * fitted.sigma2.ln() + 2.0 * k)
    }

}

impl Forecaster for Arima {
    fn fit(&mut self, series: &WeeklySeries) -> Result<()> {
        self.fit_slice(series.values())
    }

    fn predict(&self, horizon: usize, _future: &BTreeMap<String, Vec<f64>>) -> Result<Vec<f64>> {
        self.predict_slice(horizon)
    }

    fn name(&self) -> &str {
        "arima"
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

fn split_params(order: ArimaOrder, params: &[f64]) -> (Vec<f64>, Vec<f64>, f64) {
    let ar = params[..order.p].to_vec();
    let ma = params[order.p..order.p + order.q].to_vec();
    let intercept = params[order.p + order.q];
    (ar, ma, intercept)
}

/// Conditional sum of squares of the ARMA recursion on differenced data.
fn css_objective(diffed: &[f64], order: ArimaOrder, params: &[f64]) -> f64 {
    let (ar, ma, intercept) = split_params(order, params);
    let residuals = css_residuals(diffed, &ar, &ma, intercept);
    let sse: f64 = residuals.iter().map(|e| e * e).sum();
    if sse.is_finite() {
        sse
    } else {
        f64::MAX
    }
}

fn css_residuals(diffed: &[f64], ar: &[f64], ma: &[f64], intercept: f64) -> Vec<f64> {
    let burn_in = ar.len();
    let mut residuals = vec![0.0; diffed.len()];
    for t in burn_in..diffed.len() {
        let mut expected = intercept;
        for (lag, phi) in ar.iter().enumerate() {
            expected += phi * diffed[t - lag - 1];
        }
        for (lag, theta) in ma.iter().enumerate() {
            if t > lag {
                expected += theta * residuals[t - lag - 1];
            }
        }
        residuals[t] = diffed[t] - expected;
    }
    residuals[burn_in..].to_vec()
}

/// Difference `values` `d` times. Returns the differenced series and the
/// last pre-difference value at each level, needed to integrate back.
pub(crate) fn difference(values: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut current = values.to_vec();
    let mut tails = Vec::with_capacity(d);
    for _ in 0..d {
        if current.is_empty() {
            break;
        }
        tails.push(*current.last().unwrap_or(&0.0));
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    (current, tails)
}

/// Undo `difference`: cumulative-sum the forecasts up through each level.
pub(crate) fn integrate(forecasts: &[f64], tails: &[f64]) -> Vec<f64> {
    let mut current = forecasts.to_vec();
    for tail in tails.iter().rev() {
        let mut level = *tail;
        for v in current.iter_mut() {
            level += *v;
            *v = level;
        }
    }
    current
}

/// Pick a differencing order by comparing the variance of the series to
/// the variance of its successive differences (KPSS-free heuristic).
pub(crate) fn suggest_differencing(values: &[f64], max_d: usize) -> usize {
    let mut current = values.to_vec();
    let mut d = 0;
    while d < max_d && current.len() > 2 {
        let var = crate::utils::variance(&current);
        let diffed: Vec<f64> = current.windows(2).map(|w| w[1] - w[0]).collect();
        let diff_var = crate::utils::variance(&diffed);
        if diff_var >= var || var < 1e-12 {
            break;
        }
        current = diffed;
        d += 1;
    }
    d
}
