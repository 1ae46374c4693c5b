//! Least-squares regression on named regressor columns.
//!
//! Solves the normal equations by Cholesky decomposition. An optional
//! ridge penalty turns the fit into the MAP estimate under a Gaussian
//! prior on the coefficients, which is what the growth-curve method uses.

use std::collections::BTreeMap;

use crate::error::{PipelineError, Result};

/// Fitted regression: intercept plus one coefficient per named regressor.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Regressor names in coefficient order (sorted).
    pub regressor_names: Vec<String>,
}

impl OlsFit {
    /// Evaluate the regression at the supplied regressor values.
    pub fn predict(&self, regressors: &BTreeMap<String, Vec<f64>>) -> Result<Vec<f64>> {
        let n = match self.regressor_names.first() {
            Some(name) => {
                regressors
                    .get(name)
                    .ok_or_else(|| PipelineError::MissingRegressor(name.clone()))?
                    .len()
            }
            None => {
                return Err(PipelineError::InvalidParameter(
                    "prediction length unknown without regressors".to_string(),
                ))
            }
        };

        let mut out = vec![self.intercept; n];
        for (coef, name) in self.coefficients.iter().zip(self.regressor_names.iter()) {
            let values = regressors
                .get(name)
                .ok_or_else(|| PipelineError::MissingRegressor(name.clone()))?;
            if values.len() != n {
                return Err(PipelineError::DimensionMismatch {
                    expected: n,
                    got: values.len(),
                });
            }
            for (acc, x) in out.iter_mut().zip(values.iter()) {
                *acc += coef * x;
            }
        }
        Ok(out)
    }

    /// Residuals of the fit on the training data. An intercept-only fit
    /// has residuals `y - intercept`; the length comes from `y`.
    pub fn residuals(&self, y: &[f64], regressors: &BTreeMap<String, Vec<f64>>) -> Result<Vec<f64>> {
        if self.regressor_names.is_empty() {
            return Ok(y.iter().map(|v| v - self.intercept).collect());
        }
        let fitted = self.predict(regressors)?;
        if fitted.len() != y.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: y.len(),
                got: fitted.len(),
            });
        }
        Ok(y.iter().zip(fitted.iter()).map(|(a, f)| a - f).collect())
    }
}

/// Fit `y = intercept + X beta`, optionally ridge-penalised.
///
/// `ridge` is the penalty added to the coefficient diagonal (the intercept
/// is never penalised); 0.0 gives ordinary least squares.
pub fn ols_fit(y: &[f64], regressors: &BTreeMap<String, Vec<f64>>, ridge: f64) -> Result<OlsFit> {
    let n = y.len();
    if n == 0 {
        return Err(PipelineError::EmptyData);
    }

    if regressors.is_empty() {
        return Ok(OlsFit {
            intercept: y.iter().sum::<f64>() / n as f64,
            coefficients: vec![],
            regressor_names: vec![],
        });
    }

    let regressor_names: Vec<String> = regressors.keys().cloned().collect();
    let k = regressor_names.len();

    let columns: Vec<&[f64]> = regressor_names
        .iter()
        .map(|name| regressors[name].as_slice())
        .collect();
    for column in &columns {
        if column.len() != n {
            return Err(PipelineError::DimensionMismatch {
                expected: n,
                got: column.len(),
            });
        }
    }

    // Normal equations over the design [1, x_1, ..., x_k].
    let dim = k + 1;
    let mut xtx = vec![vec![0.0; dim]; dim];
    let mut xty = vec![0.0; dim];

    for obs in 0..n {
        xtx[0][0] += 1.0;
        xty[0] += y[obs];
        for i in 0..k {
            let xi = columns[i][obs];
            xtx[0][i + 1] += xi;
            xtx[i + 1][0] += xi;
            xty[i + 1] += xi * y[obs];
            for j in 0..k {
                xtx[i + 1][j + 1] += xi * columns[j][obs];
            }
        }
    }

    // Ridge penalty on coefficients, tiny jitter on the whole diagonal
    // for numerical stability.
    xtx[0][0] += 1e-8;
    for i in 1..dim {
        xtx[i][i] += ridge + 1e-8;
    }

    let beta = cholesky_solve(&xtx, &xty).ok_or_else(|| {
        PipelineError::ComputationError("normal equations not positive definite".to_string())
    })?;

    Ok(OlsFit {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
        regressor_names,
    })
}

/// Solve `A x = b` for symmetric positive definite `A`.
fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for m in 0..j {
                sum -= l[i][m] * l[j][m];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // L' x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn one_regressor(values: Vec<f64>) -> BTreeMap<String, Vec<f64>> {
        let mut map = BTreeMap::new();
        map.insert("x".to_string(), values);
        map
    }

    #[test]
    fn recovers_linear_coefficients() {
        // y = 2 + 3x
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 + 3.0 * v).collect();

        let fit = ols_fit(&y, &one_regressor(x), 0.0).unwrap();

        assert_relative_eq!(fit.intercept, 2.0, epsilon = 1e-5);
        assert_relative_eq!(fit.coefficients[0], 3.0, epsilon = 1e-5);
    }

    #[test]
    fn no_regressors_returns_mean() {
        let y = vec![2.0, 4.0, 6.0];
        let fit = ols_fit(&y, &BTreeMap::new(), 0.0).unwrap();
        assert_relative_eq!(fit.intercept, 4.0, epsilon = 1e-10);
        assert!(fit.coefficients.is_empty());
    }

    #[test]
    fn ridge_shrinks_coefficients() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v).collect();

        let plain = ols_fit(&y, &one_regressor(x.clone()), 0.0).unwrap();
        let ridged = ols_fit(&y, &one_regressor(x), 50.0).unwrap();

        assert!(ridged.coefficients[0].abs() < plain.coefficients[0].abs());
    }

    #[test]
    fn predict_aligns_by_name() {
        let x = vec![1.0, 2.0, 3.0];
        let y = vec![5.0, 8.0, 11.0];
        let fit = ols_fit(&y, &one_regressor(x), 0.0).unwrap();

        let future = one_regressor(vec![10.0]);
        let predictions = fit.predict(&future).unwrap();
        assert_relative_eq!(predictions[0], 32.0, epsilon = 1e-4);
    }

    #[test]
    fn predict_rejects_missing_regressor() {
        let fit = OlsFit {
            intercept: 0.0,
            coefficients: vec![1.0],
            regressor_names: vec!["promo".to_string()],
        };
        let future = one_regressor(vec![1.0]); // named "x", not "promo"
        assert!(matches!(
            fit.predict(&future),
            Err(PipelineError::MissingRegressor(_))
        ));
    }

    #[test]
    fn intercept_only_residuals_subtract_the_mean() {
        let y = vec![2.0, 4.0, 6.0];
        let fit = ols_fit(&y, &BTreeMap::new(), 0.0).unwrap();

        let residuals = fit.residuals(&y, &BTreeMap::new()).unwrap();

        assert_eq!(residuals.len(), 3);
        assert_relative_eq!(residuals[0], -2.0, epsilon = 1e-10);
        assert_relative_eq!(residuals[1], 0.0, epsilon = 1e-10);
        assert_relative_eq!(residuals[2], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn residuals_sum_to_zero_for_exact_fit() {
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|v| 1.0 + 2.0 * v).collect();
        let regs = one_regressor(x);

        let fit = ols_fit(&y, &regs, 0.0).unwrap();
        let residuals = fit.residuals(&y, &regs).unwrap();

        assert!(residuals.iter().sum::<f64>().abs() < 1e-6);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let y = vec![1.0, 2.0, 3.0];
        let regs = one_regressor(vec![1.0, 2.0]);
        assert!(ols_fit(&y, &regs, 0.0).is_err());
    }
}
