//! Result tables and charts.
//!
//! Each method's per-product forecasts go into a CSV table with one row
//! per product; the comparison summary gets its own table. Charts are
//! rendered with plotters: a unit-volume histogram over products and a
//! history/forecast overlay per scored product.

use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::compare::Comparison;
use crate::error::{PipelineError, Result};
use crate::reshape::ProductFrame;
use crate::runner::{MethodResults, ProductForecast};

fn fmt_mase(mase: Option<f64>) -> String {
    match mase {
        Some(v) => format!("{v:.6}"),
        None => String::new(),
    }
}

/// Write one method's results: product id, one column per forecast
/// week, then the accuracy scores. An undefined MASE becomes an empty
/// cell.
pub fn write_method_table(results: &MethodResults, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;

    let horizon = results.rows.first().map(|r| r.forecast.len()).unwrap_or(0);
    let mut header = vec!["product_id".to_string()];
    for week in 1..=horizon {
        header.push(format!("week_{week}_sales"));
    }
    header.extend(["rmse".to_string(), "mae".to_string(), "mase".to_string()]);
    writer.write_record(&header)?;

    for row in &results.rows {
        let mut record = vec![row.product_id.clone()];
        for value in &row.forecast {
            record.push(format!("{value:.4}"));
        }
        record.push(format!("{:.6}", row.score.rmse));
        record.push(format!("{:.6}", row.score.mae));
        record.push(fmt_mase(row.score.mase));
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(method = %results.method, rows = results.rows.len(), path = %path.display(), "result table written");
    Ok(())
}

/// Write the cross-method comparison summary.
pub fn write_comparison_table(comparison: &Comparison, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record([
        "method",
        "scored",
        "failed",
        "wins",
        "mean_mase",
        "median_mase",
        "variance_mase",
    ])?;
    for summary in &comparison.summaries {
        writer.write_record(&[
            summary.method.label().to_string(),
            summary.scored.to_string(),
            summary.failed.to_string(),
            summary.wins.to_string(),
            fmt_mase(summary.mean_mase),
            fmt_mase(summary.median_mase),
            fmt_mase(summary.variance_mase),
        ])?;
    }
    writer.flush()?;

    info!(path = %path.display(), "comparison table written");
    Ok(())
}

fn render_err<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::RenderError(e.to_string())
}

/// Histogram of total unit volume per product.
pub fn plot_volume_histogram(frames: &[ProductFrame], path: impl AsRef<Path>) -> Result<()> {
    if frames.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    let path = path.as_ref();

    let totals: Vec<(String, f64)> = frames
        .iter()
        .map(|f| {
            (
                f.product_id.clone(),
                f.weekly_sales.values().iter().sum::<f64>(),
            )
        })
        .collect();
    let max_total = totals.iter().map(|(_, t)| *t).fold(0.0f64, f64::max);

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Unit volume by product", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..totals.len(), 0.0..max_total * 1.1)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_labels(totals.len().min(20))
        .x_label_formatter(&|idx| {
            totals
                .get(*idx)
                .map(|(id, _)| id.clone())
                .unwrap_or_default()
        })
        .y_desc("units sold")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(totals.iter().enumerate().map(|(idx, (_, total))| {
            Rectangle::new([(idx, 0.0), (idx + 1, *total)], BLUE.mix(0.5).filled())
        }))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    info!(path = %path.display(), products = totals.len(), "volume histogram written");
    Ok(())
}

/// Overlay of training history, held-out actuals, and the forecast for
/// one scored product.
pub fn plot_forecast_overlay(row: &ProductForecast, path: impl AsRef<Path>) -> Result<()> {
    if row.forecast.is_empty() || row.history.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    let path = path.as_ref();

    let n_hist = row.history.len();
    let n_total = n_hist + row.forecast.len();
    let max_y = row
        .history
        .iter()
        .chain(row.actual.iter())
        .chain(row.forecast.iter())
        .fold(0.0f64, |acc, v| acc.max(*v));

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let caption = format!("{} ({})", row.product_id, row.method);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..n_total, 0.0..max_y * 1.1)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("week")
        .y_desc("units sold")
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(
            row.history.iter().enumerate().map(|(i, v)| (i, *v)),
            &BLACK,
        ))
        .map_err(render_err)?
        .label("history")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK));

    chart
        .draw_series(LineSeries::new(
            row.actual.iter().enumerate().map(|(i, v)| (n_hist + i, *v)),
            &BLUE,
        ))
        .map_err(render_err)?
        .label("actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(
            row.forecast
                .iter()
                .enumerate()
                .map(|(i, v)| (n_hist + i, *v)),
            &RED,
        ))
        .map_err(render_err)?
        .label("forecast")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Method;
    use crate::runner::MethodResults;
    use crate::score::ForecastScore;

    fn sample_row(mase: Option<f64>) -> ProductForecast {
        ProductForecast {
            product_id: "p1".to_string(),
            method: Method::Arimax,
            forecast: vec![10.0, 11.0, 12.0, 13.0, 14.0],
            actual: vec![10.5, 11.5, 11.0, 13.5, 14.5],
            history: (0..20).map(|i| 8.0 + (i % 3) as f64).collect(),
            score: ForecastScore {
                rmse: 0.5,
                mae: 0.5,
                mase,
            },
        }
    }

    #[test]
    fn method_table_has_one_row_per_product_plus_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arimax.csv");

        let results = MethodResults {
            method: Method::Arimax,
            rows: vec![sample_row(Some(0.9))],
            failures: vec![],
        };
        write_method_table(&results, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("product_id,week_1_sales"));
        assert!(lines[0].ends_with("rmse,mae,mase"));
        assert!(lines[1].starts_with("p1,"));
    }

    #[test]
    fn undefined_mase_becomes_an_empty_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arimax.csv");

        let results = MethodResults {
            method: Method::Arimax,
            rows: vec![sample_row(None)],
            failures: vec![],
        };
        write_method_table(&results, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.lines().nth(1).unwrap().ends_with(","));
    }

    #[test]
    fn forecast_overlay_renders_a_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");

        plot_forecast_overlay(&sample_row(Some(1.0)), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
