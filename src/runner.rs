//! Per-method batch runners.
//!
//! Each runner walks every product through the same Fit -> Predict ->
//! Clip -> Score lifecycle. A product that fails any step is recorded
//! and skipped; the batch always completes with results for whichever
//! products succeeded.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::core::{MergedTable, WeeklySeries};
use crate::error::{PipelineError, Result};
use crate::models::{
    clip_non_negative, Arimax, Forecaster, GrowthCurve, HierarchicalProduct, Method,
};
use crate::reshape::{build_frames, HierarchyTable, ProductFrame};
use crate::score::{score_forecast, ForecastScore};

/// One product's scored forecast under one method.
#[derive(Debug, Clone)]
pub struct ProductForecast {
    pub product_id: String,
    pub method: Method,
    /// Clipped point forecasts, one per horizon week.
    pub forecast: Vec<f64>,
    /// Held-out actuals for the same weeks, on the method's target scale.
    pub actual: Vec<f64>,
    /// Training window, kept for plotting.
    pub history: Vec<f64>,
    pub score: ForecastScore,
}

/// A product the runner could not forecast.
#[derive(Debug, Clone)]
pub struct ProductFailure {
    pub product_id: String,
    pub reason: String,
}

/// Everything one method produced over the product batch.
#[derive(Debug, Clone)]
pub struct MethodResults {
    pub method: Method,
    pub rows: Vec<ProductForecast>,
    pub failures: Vec<ProductFailure>,
}

impl MethodResults {
    fn new(method: Method) -> Self {
        Self {
            method,
            rows: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record(&mut self, product_id: &str, outcome: Result<ProductForecast>) {
        match outcome {
            Ok(row) => self.rows.push(row),
            Err(error) => {
                warn!(
                    method = %self.method,
                    product = product_id,
                    %error,
                    "skipping product"
                );
                self.failures.push(ProductFailure {
                    product_id: product_id.to_string(),
                    reason: error.to_string(),
                });
            }
        }
    }
}

/// Split a product's series, enforce the training minimum, and drop
/// constant regressor columns from both windows.
fn prepare_windows(
    series: &WeeklySeries,
    config: &PipelineConfig,
) -> Result<(WeeklySeries, WeeklySeries)> {
    let (mut train, mut test) = series.split_train_test(config.horizon)?;
    if train.len() < config.min_train_weeks {
        return Err(PipelineError::InsufficientData {
            needed: config.min_train_weeks,
            got: train.len(),
        });
    }
    let dropped = train.drop_constant_regressors();
    if !dropped.is_empty() {
        // The future window must only carry columns the fit saw.
        let mut pruned = test.regressor_map();
        for name in &dropped {
            pruned.remove(name);
        }
        test = rebuild_with_regressors(&test, pruned)?;
    }
    Ok((train, test))
}

fn rebuild_with_regressors(
    series: &WeeklySeries,
    regressors: BTreeMap<String, Vec<f64>>,
) -> Result<WeeklySeries> {
    let mut rebuilt = WeeklySeries::new(series.weeks().to_vec(), series.values().to_vec())?;
    for (name, values) in regressors {
        rebuilt = rebuilt.with_regressor(name, values)?;
    }
    Ok(rebuilt)
}

fn forecast_with<M: Forecaster>(
    mut model: M,
    series: &WeeklySeries,
    method: Method,
    product_id: &str,
    config: &PipelineConfig,
) -> Result<ProductForecast> {
    let (train, test) = prepare_windows(series, config)?;

    model.fit(&train)?;
    let mut forecast = model.predict(config.horizon, &test.regressor_map())?;
    clip_non_negative(&mut forecast);

    let score = score_forecast(
        train.values(),
        test.values(),
        &forecast,
        config.mase_period(train.len()),
    )?;

    Ok(ProductForecast {
        product_id: product_id.to_string(),
        method,
        forecast,
        actual: test.values().to_vec(),
        history: train.values().to_vec(),
        score,
    })
}

/// Run the hierarchical method over every product in the wide table.
pub fn run_hierarchical(table: &HierarchyTable, config: &PipelineConfig) -> MethodResults {
    let mut results = MethodResults::new(Method::Hierarchical);
    let products: Vec<String> = {
        let mut ids: Vec<String> = table.keys().iter().map(|k| k.product.clone()).collect();
        ids.dedup();
        ids
    };

    for product_id in &products {
        let outcome = hierarchical_product(table, product_id, config);
        results.record(product_id, outcome);
    }

    info!(
        ok = results.rows.len(),
        failed = results.failures.len(),
        "hierarchical run complete"
    );
    results
}

fn hierarchical_product(
    table: &HierarchyTable,
    product_id: &str,
    config: &PipelineConfig,
) -> Result<ProductForecast> {
    let aggregate = table.product_total(product_id)?;
    let (train_total, test_total) = prepare_windows(&aggregate, config)?;

    let cut = train_total.len();
    let mut leaves = Vec::new();
    for (market, column) in table.leaves_for_product(product_id) {
        let leaf = WeeklySeries::new(
            train_total.weeks().to_vec(),
            column[..cut].to_vec(),
        )?;
        leaves.push((market.to_string(), leaf));
    }

    let mut model = HierarchicalProduct::new(product_id);
    model.fit(&train_total, &leaves)?;
    let reconciled = model.predict(config.horizon)?;

    // Reconciliation already clipped every level.
    let score = score_forecast(
        train_total.values(),
        test_total.values(),
        &reconciled.aggregate,
        config.mase_period(train_total.len()),
    )?;

    Ok(ProductForecast {
        product_id: product_id.to_string(),
        method: Method::Hierarchical,
        forecast: reconciled.aggregate,
        actual: test_total.values().to_vec(),
        history: train_total.values().to_vec(),
        score,
    })
}

/// Run the ARIMAX method over every product frame.
pub fn run_arimax(frames: &[ProductFrame], config: &PipelineConfig) -> MethodResults {
    let mut results = MethodResults::new(Method::Arimax);
    for frame in frames {
        let outcome = forecast_with(
            Arimax::new(),
            &frame.weekly_sales,
            Method::Arimax,
            &frame.product_id,
            config,
        );
        results.record(&frame.product_id, outcome);
    }
    info!(
        ok = results.rows.len(),
        failed = results.failures.len(),
        "arimax run complete"
    );
    results
}

/// Run the growth-curve method over every product frame.
pub fn run_growth(frames: &[ProductFrame], config: &PipelineConfig) -> MethodResults {
    let mut results = MethodResults::new(Method::Growth);
    for frame in frames {
        let outcome = GrowthCurve::new(config.growth_cap, config.growth_floor).and_then(|model| {
            forecast_with(
                model,
                &frame.growth_sales,
                Method::Growth,
                &frame.product_id,
                config,
            )
        });
        results.record(&frame.product_id, outcome);
    }
    info!(
        ok = results.rows.len(),
        failed = results.failures.len(),
        "growth run complete"
    );
    results
}

/// Reshape the merged table and run all three methods.
pub fn run_all(merged: &MergedTable, config: &PipelineConfig) -> Result<Vec<MethodResults>> {
    let table = HierarchyTable::from_merged(merged)?;
    let frames = build_frames(merged)?;

    Ok(vec![
        run_hierarchical(&table, config),
        run_arimax(&frames, config),
        run_growth(&frames, config),
    ])
}
