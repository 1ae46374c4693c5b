//! Saturating-growth additive regression.
//!
//! The trend is a logistic curve bounded by a configured floor and cap,
//! and price/promotion effects enter additively with ridge-penalised
//! coefficients (the MAP estimate under a Gaussian prior). The two trend
//! parameters are found by a Nelder-Mead search whose inner loop solves
//! the regressor coefficients in closed form; predictions are clamped
//! back into the floor/cap band.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::WeeklySeries;
use crate::error::{PipelineError, Result};
use crate::models::Forecaster;
use crate::utils::{minimize, ols_fit, MinimizeOptions, OlsFit};

const REGRESSOR_RIDGE: f64 = 1.0;

#[derive(Debug, Clone)]
struct FittedGrowth {
    /// Logistic growth rate on the scaled time axis.
    rate: f64,
    /// Logistic offset (midpoint location) on the scaled time axis.
    offset: f64,
    regression: OlsFit,
    /// Training length; future steps continue on the same time scale.
    train_len: usize,
}

#[derive(Debug, Clone)]
pub struct GrowthCurve {
    cap: f64,
    floor: f64,
    fitted: Option<FittedGrowth>,
}

impl GrowthCurve {
    pub fn new(cap: f64, floor: f64) -> Result<Self> {
        if !(cap.is_finite() && floor.is_finite()) || cap <= floor {
            return Err(PipelineError::InvalidParameter(format!(
                "growth bounds need floor < cap, got floor {floor} cap {cap}"
            )));
        }
        Ok(Self {
            cap,
            floor,
            fitted: None,
        })
    }

    pub fn cap(&self) -> f64 {
        self.cap
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    fn trend_at(&self, rate: f64, offset: f64, t_scaled: f64) -> f64 {
        self.floor + (self.cap - self.floor) / (1.0 + (-(rate * t_scaled + offset)).exp())
    }

    fn trend_values(&self, rate: f64, offset: f64, len: usize, train_len: usize) -> Vec<f64> {
        // Time is scaled so the training window spans [0, 1]; forecast
        // steps extrapolate past 1 on the same scale.
        let denom = (train_len.saturating_sub(1)).max(1) as f64;
        (0..len)
            .map(|t| self.trend_at(rate, offset, t as f64 / denom))
            .collect()
    }
}

impl Forecaster for GrowthCurve {
    fn fit(&mut self, series: &WeeklySeries) -> Result<()> {
        let n = series.len();
        if n < 4 {
            return Err(PipelineError::InsufficientData { needed: 4, got: n });
        }
        let y = series.values();
        let regressors = series.regressors();

        // Outer search over the two trend parameters; the regressor
        // coefficients are profiled out by a closed-form ridge solve on
        // the detrended series.
        let objective = |params: &[f64]| {
            let trend = self.trend_values(params[0], params[1], n, n);
            let detrended: Vec<f64> = y.iter().zip(trend.iter()).map(|(v, t)| v - t).collect();
            let fit = match ols_fit(&detrended, regressors, REGRESSOR_RIDGE) {
                Ok(fit) => fit,
                Err(_) => return f64::MAX,
            };
            let sse = match fit.residuals(&detrended, regressors) {
                Ok(res) => res.iter().map(|e| e * e).sum::<f64>(),
                Err(_) => return f64::MAX,
            };
            if sse.is_finite() {
                sse
            } else {
                f64::MAX
            }
        };

        // Start from a gentle upward curve centred on the window.
        let bounds = [(-20.0, 20.0), (-20.0, 20.0)];
        let result = minimize(
            objective,
            &[1.0, -0.5],
            Some(&bounds),
            MinimizeOptions {
                max_iter: 2000,
                initial_step: 0.5,
                ..Default::default()
            },
        );
        // A search that never saw a real objective value (every candidate
        // errored out) must not be accepted as a fit.
        if !result.value.is_finite() || result.value >= f64::MAX {
            return Err(PipelineError::ComputationError(
                "growth objective did not evaluate to a finite value".to_string(),
            ));
        }

        let (rate, offset) = (result.point[0], result.point[1]);
        let trend = self.trend_values(rate, offset, n, n);
        let detrended: Vec<f64> = y.iter().zip(trend.iter()).map(|(v, t)| v - t).collect();
        let regression = ols_fit(&detrended, regressors, REGRESSOR_RIDGE)?;

        debug!(rate, offset, sse = result.value, "growth curve fitted");
        self.fitted = Some(FittedGrowth {
            rate,
            offset,
            regression,
            train_len: n,
        });
        Ok(())
    }

    fn predict(&self, horizon: usize, future: &BTreeMap<String, Vec<f64>>) -> Result<Vec<f64>> {
        let fitted = self.fitted.as_ref().ok_or(PipelineError::FitRequired)?;
        if horizon == 0 {
            return Ok(vec![]);
        }

        let total = fitted.train_len + horizon;
        let trend = self.trend_values(fitted.rate, fitted.offset, total, fitted.train_len);
        let future_trend = &trend[fitted.train_len..];

        let effects = if fitted.regression.regressor_names.is_empty() {
            vec![fitted.regression.intercept; horizon]
        } else {
            let effects = fitted.regression.predict(future)?;
            if effects.len() != horizon {
                return Err(PipelineError::DimensionMismatch {
                    expected: horizon,
                    got: effects.len(),
                });
            }
            effects
        };

        Ok(future_trend
            .iter()
            .zip(effects.iter())
            .map(|(t, e)| (t + e).clamp(self.floor, self.cap))
            .collect())
    }

    fn name(&self) -> &str {
        "growth"
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn weekly(values: Vec<f64>) -> WeeklySeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let weeks = (0..values.len() as i64)
            .map(|i| start + Duration::days(7 * i))
            .collect();
        WeeklySeries::new(weeks, values).unwrap()
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(GrowthCurve::new(0.0, 1000.0).is_err());
        assert!(GrowthCurve::new(f64::NAN, 0.0).is_err());
        assert!(GrowthCurve::new(1000.0, 0.0).is_ok());
    }

    #[test]
    fn forecasts_stay_inside_the_band() {
        // A series climbing hard toward the cap.
        let values: Vec<f64> = (0..30).map(|i| 50.0 * i as f64).collect();
        let series = weekly(values);

        let mut model = GrowthCurve::new(1000.0, 0.0).unwrap();
        model.fit(&series).unwrap();
        let forecast = model.predict(5, &BTreeMap::new()).unwrap();

        for v in &forecast {
            assert!((0.0..=1000.0).contains(v), "{forecast:?}");
        }
    }

    #[test]
    fn tracks_a_saturating_series() {
        // Logistic-shaped data inside [0, 1000].
        let values: Vec<f64> = (0..40)
            .map(|i| 1000.0 / (1.0 + (-(0.3 * (i as f64 - 20.0))).exp()))
            .collect();
        let series = weekly(values.clone());

        let mut model = GrowthCurve::new(1000.0, 0.0).unwrap();
        model.fit(&series).unwrap();
        let forecast = model.predict(3, &BTreeMap::new()).unwrap();

        // Late in the curve the data hugs the cap; the forecast should too.
        assert!(forecast[0] > 900.0, "{forecast:?}");
    }

    #[test]
    fn flat_series_without_regressors_forecasts_the_level() {
        // No regressor columns at all: the trend alone must carry the
        // fit, landing on the constant level rather than the search's
        // starting curve.
        let series = weekly(vec![70.0; 30]);

        let mut model = GrowthCurve::new(1000.0, 0.0).unwrap();
        model.fit(&series).unwrap();
        let forecast = model.predict(5, &BTreeMap::new()).unwrap();

        for v in &forecast {
            assert!((v - 70.0).abs() < 15.0, "{forecast:?}");
        }
    }

    #[test]
    fn promo_regressor_shifts_predictions() {
        let n = 30usize;
        let promo: Vec<f64> = (0..n).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();
        let values: Vec<f64> = promo.iter().map(|p| 200.0 + 80.0 * p).collect();
        let series = weekly(values)
            .with_regressor("promo_display", promo)
            .unwrap();

        let mut model = GrowthCurve::new(1000.0, 0.0).unwrap();
        model.fit(&series).unwrap();

        let mut future = BTreeMap::new();
        future.insert("promo_display".to_string(), vec![1.0, 0.0]);
        let forecast = model.predict(2, &future).unwrap();

        assert!(forecast[0] > forecast[1] + 20.0, "{forecast:?}");
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let model = GrowthCurve::new(1000.0, 0.0).unwrap();
        assert!(matches!(
            model.predict(5, &BTreeMap::new()),
            Err(PipelineError::FitRequired)
        ));
    }
}
