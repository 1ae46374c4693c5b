//! Cross-method comparison.
//!
//! Summarises each method's MASE distribution and counts per-product
//! wins by lowest RMSE. A product only enters the win count where at
//! least one method scored it; an exact RMSE tie credits every method
//! at the minimum.

use std::collections::BTreeMap;

use tracing::info;

use crate::models::Method;
use crate::runner::MethodResults;
use crate::utils::{mean, median, variance};

/// Distribution summary and win count for one method.
#[derive(Debug, Clone)]
pub struct MethodSummary {
    pub method: Method,
    /// Products this method scored.
    pub scored: usize,
    /// Products this method failed on.
    pub failed: usize,
    /// Products where this method had the (possibly tied) lowest RMSE.
    pub wins: usize,
    /// Summary of the defined MASE values; `None` when no product had a
    /// defined MASE under this method.
    pub mean_mase: Option<f64>,
    pub median_mase: Option<f64>,
    pub variance_mase: Option<f64>,
}

/// The full comparison across methods.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub summaries: Vec<MethodSummary>,
}

impl Comparison {
    /// The method with the most wins, ties broken by mean MASE then by
    /// declaration order.
    pub fn overall_winner(&self) -> Option<Method> {
        self.summaries
            .iter()
            .max_by(|a, b| {
                a.wins.cmp(&b.wins).then_with(|| {
                    let am = a.mean_mase.unwrap_or(f64::INFINITY);
                    let bm = b.mean_mase.unwrap_or(f64::INFINITY);
                    bm.partial_cmp(&am).unwrap_or(std::cmp::Ordering::Equal)
                })
            })
            .map(|s| s.method)
    }
}

/// Compare the per-method result sets.
pub fn compare(results: &[MethodResults]) -> Comparison {
    // product -> (method, rmse) across all methods that scored it.
    let mut by_product: BTreeMap<&str, Vec<(Method, f64)>> = BTreeMap::new();
    for method_results in results {
        for row in &method_results.rows {
            by_product
                .entry(row.product_id.as_str())
                .or_default()
                .push((row.method, row.score.rmse));
        }
    }

    let mut wins: BTreeMap<Method, usize> = BTreeMap::new();
    for entries in by_product.values() {
        let best = entries
            .iter()
            .map(|(_, rmse)| *rmse)
            .fold(f64::INFINITY, f64::min);
        if !best.is_finite() {
            continue;
        }
        // Exact ties credit every method at the minimum.
        for (method, rmse) in entries {
            if *rmse == best {
                *wins.entry(*method).or_insert(0) += 1;
            }
        }
    }

    let summaries = results
        .iter()
        .map(|method_results| {
            let mase_values: Vec<f64> = method_results
                .rows
                .iter()
                .filter_map(|row| row.score.mase)
                .collect();
            let (mean_mase, median_mase, variance_mase) = if mase_values.is_empty() {
                (None, None, None)
            } else {
                (
                    Some(mean(&mase_values)),
                    Some(median(&mase_values)),
                    Some(variance(&mase_values)),
                )
            };
            let summary = MethodSummary {
                method: method_results.method,
                scored: method_results.rows.len(),
                failed: method_results.failures.len(),
                wins: wins.get(&method_results.method).copied().unwrap_or(0),
                mean_mase,
                median_mase,
                variance_mase,
            };
            info!(
                method = %summary.method,
                scored = summary.scored,
                wins = summary.wins,
                mean_mase = summary.mean_mase,
                "method summarised"
            );
            summary
        })
        .collect();

    Comparison { summaries }
}
