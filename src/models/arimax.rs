//! Regression with ARIMA errors.
//!
//! A two-stage fit: ordinary least squares captures the price and
//! promotion effects, then an auto-selected ARIMA models the residual
//! dynamics. Forecasts combine the regression evaluated at the supplied
//! future regressor values with the residual ARIMA forecast.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::WeeklySeries;
use crate::error::{PipelineError, Result};
use crate::models::{AutoArima, Forecaster};
use crate::utils::{ols_fit, OlsFit};

#[derive(Debug, Clone)]
pub struct Arimax {
    regression: Option<OlsFit>,
    residual_model: AutoArima,
    fitted: bool,
}

impl Default for Arimax {
    fn default() -> Self {
        Self::new()
    }
}

impl Arimax {
    pub fn new() -> Self {
        Self {
            regression: None,
            residual_model: AutoArima::new(),
            fitted: false,
        }
    }

    /// Names of the regressors the fit actually used.
    pub fn regressor_names(&self) -> &[String] {
        self.regression
            .as_ref()
            .map(|r| r.regressor_names.as_slice())
            .unwrap_or(&[])
    }
}

impl Forecaster for Arimax {
    fn fit(&mut self, series: &WeeklySeries) -> Result<()> {
        if series.is_empty() {
            return Err(PipelineError::EmptyData);
        }

        // Constant columns must be gone before the design matrix is
        // formed; callers drop them per training window.
        if series.has_regressors() {
            let fit = ols_fit(series.values(), series.regressors(), 0.0)?;
            let residuals = fit.residuals(series.values(), series.regressors())?;
            debug!(
                regressors = fit.regressor_names.len(),
                "arimax regression stage fitted"
            );
            self.residual_model.fit_slice(&residuals)?;
            self.regression = Some(fit);
        } else {
            // No usable regressors: the model degrades to plain ARIMA.
            debug!("arimax fitting without regressors");
            self.residual_model.fit_slice(series.values())?;
            self.regression = None;
        }

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, horizon: usize, future: &BTreeMap<String, Vec<f64>>) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(PipelineError::FitRequired);
        }
        let residual_forecast = self.residual_model.predict_slice(horizon)?;

        let regression = match &self.regression {
            Some(r) => r,
            None => return Ok(residual_forecast),
        };

        let effects = regression.predict(future)?;
        if effects.len() != horizon {
            return Err(PipelineError::DimensionMismatch {
                expected: horizon,
                got: effects.len(),
            });
        }

        Ok(effects
            .iter()
            .zip(residual_forecast.iter())
            .map(|(effect, residual)| effect + residual)
            .collect())
    }

    fn name(&self) -> &str {
        "arimax"
    }

    fn is_fitted(&self) -> bool {
        self.fitted
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
    fn promo_effect_lifts_the_forecast() {
        // Flat base of 100 units, +50 in promo weeks.
        let n = 30usize;
        let promo: Vec<f64> = (0..n).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect();
        let values: Vec<f64> = promo.iter().map(|p| 100.0 + 50.0 * p).collect();
        let series = weekly(values)
            .with_regressor("promo_display", promo)
            .unwrap();

        let mut model = Arimax::new();
        model.fit(&series).unwrap();

        let mut future = BTreeMap::new();
        future.insert("promo_display".to_string(), vec![1.0, 0.0, 1.0]);
        let forecast = model.predict(3, &future).unwrap();

        assert!(forecast[0] > forecast[1] + 20.0, "{forecast:?}");
        assert!(forecast[2] > forecast[1] + 20.0, "{forecast:?}");
    }

    #[test]
    fn without_regressors_it_degrades_to_arima() {
        let values: Vec<f64> = (0..25).map(|i| 40.0 + (i % 3) as f64).collect();
        let series = weekly(values);

        let mut model = Arimax::new();
        model.fit(&series).unwrap();
        assert!(model.regressor_names().is_empty());

        let forecast = model.predict(5, &BTreeMap::new()).unwrap();
        assert_eq!(forecast.len(), 5);
        assert!(forecast.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn missing_future_regressor_is_an_error() {
        let n = 20usize;
        let promo: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
        let values: Vec<f64> = promo.iter().map(|p| 10.0 + 5.0 * p).collect();
        let series = weekly(values).with_regressor("promo_flyer", promo).unwrap();

        let mut model = Arimax::new();
        model.fit(&series).unwrap();

        let result = model.predict(2, &BTreeMap::new());
        assert!(matches!(result, Err(PipelineError::MissingRegressor(_))));
    }

    #[test]
    fn predict_before_fit_is_an_error() {
        let model = Arimax::new();
        assert!(matches!(
            model.predict(5, &BTreeMap::new()),
            Err(PipelineError::FitRequired)
        ));
    }
}
