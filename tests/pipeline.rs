//! End-to-end pipeline test on a synthetic two-product dataset.

use std::fmt::Write as _;

use chrono::{Duration, NaiveDate};
use retail_forecast::prelude::*;

/// Write a catalog and a daily sales file covering 20 weeks, two
/// products, three markets, with a two-week promotion burst. 20 weeks
/// leaves a 15-week training window after the 5-week holdout.
fn write_dataset(dir: &std::path::Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let products_path = dir.join("products.csv");
    let sales_path = dir.join("sales.csv");

    std::fs::write(
        &products_path,
        "product_id,category,color\nSKU-1,shoes,black\nSKU-2,hats,red\n",
    )
    .unwrap();

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut csv = String::from(
        "product_id,website,date,units_sold,selling_price,promotion_dummy_1,promotion_dummy_2\n",
    );
    for day in 0..(20 * 7) {
        let date = start + Duration::days(day);
        let week = day / 7;
        let promo = if (12..14).contains(&week) { 1 } else { 0 };
        let seasonal = (week % 4) as f64;

        let sku1_a = 12.0 + seasonal + 6.0 * promo as f64;
        let sku1_b = 6.0 + seasonal / 2.0 + 3.0 * promo as f64;
        let sku2_a = 4.0 + (week % 3) as f64;
        let sku2_c = 2.0 + (week % 2) as f64;

        writeln!(csv, "SKU-1,web_a,{date},{sku1_a},19.99,{promo},0").unwrap();
        writeln!(csv, "SKU-1,web_b,{date},{sku1_b},21.50,{promo},0").unwrap();
        writeln!(csv, "SKU-2,web_a,{date},{sku2_a},9.99,0,0").unwrap();
        writeln!(csv, "SKU-2,web_c,{date},{sku2_c},11.25,0,0").unwrap();
    }
    // A row with no catalog match; the join should drop it.
    writeln!(csv, "SKU-GHOST,web_a,2024-01-01,1,5.0,0,0").unwrap();

    std::fs::write(&sales_path, csv).unwrap();
    (products_path, sales_path)
}

#[test]
fn full_pipeline_produces_three_scored_tables() {
    let dir = tempfile::tempdir().unwrap();
    let (products_path, sales_path) = write_dataset(dir.path());
    let config = PipelineConfig::default();

    let (merged, report) = load_merged(&products_path, &sales_path, &config).unwrap();
    assert_eq!(report.dropped, 1);
    assert!(report.match_rate() > 0.99);

    let results = run_all(&merged, &config).unwrap();
    assert_eq!(results.len(), 3);

    for method_results in &results {
        assert_eq!(
            method_results.rows.len(),
            2,
            "{} failures: {:?}",
            method_results.method,
            method_results.failures
        );
        for row in &method_results.rows {
            assert_eq!(row.forecast.len(), config.horizon);
            assert!(row.forecast.iter().all(|v| *v >= 0.0 && v.is_finite()));
            assert!(row.score.rmse.is_finite());
            assert!(row.score.mae.is_finite());
        }
    }

    // Each method writes its own table.
    for method_results in &results {
        let path = dir
            .path()
            .join(format!("{}.csv", method_results.method.label()));
        write_method_table(method_results, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3); // header + 2 products
    }
}

#[test]
fn comparison_credits_every_product_to_some_method() {
    let dir = tempfile::tempdir().unwrap();
    let (products_path, sales_path) = write_dataset(dir.path());
    let config = PipelineConfig::default();

    let (merged, _) = load_merged(&products_path, &sales_path, &config).unwrap();
    let results = run_all(&merged, &config).unwrap();
    let comparison = compare(&results);

    assert_eq!(comparison.summaries.len(), 3);
    let total_wins: usize = comparison.summaries.iter().map(|s| s.wins).sum();
    // Two products, each won by at least one method (ties can add more).
    assert!(total_wins >= 2);
    assert!(comparison.overall_winner().is_some());

    let path = dir.path().join("comparison.csv");
    write_comparison_table(&comparison, &path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 4);
    assert!(content.starts_with("method,scored,failed,wins"));
}

#[test]
fn charts_render_for_the_scored_products() {
    let dir = tempfile::tempdir().unwrap();
    let (products_path, sales_path) = write_dataset(dir.path());
    let config = PipelineConfig::default();

    let (merged, _) = load_merged(&products_path, &sales_path, &config).unwrap();
    let frames = build_frames(&merged).unwrap();

    let histogram_path = dir.path().join("volume.png");
    plot_volume_histogram(&frames, &histogram_path).unwrap();
    assert!(histogram_path.exists());

    let results = run_all(&merged, &config).unwrap();
    let row = &results[0].rows[0];
    let overlay_path = dir.path().join("overlay.png");
    plot_forecast_overlay(row, &overlay_path).unwrap();
    let bytes = std::fs::read(&overlay_path).unwrap();
    assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
}

#[test]
fn promotion_columns_survive_into_the_frames() {
    let dir = tempfile::tempdir().unwrap();
    let (products_path, sales_path) = write_dataset(dir.path());
    let config = PipelineConfig::default();

    let (merged, _) = load_merged(&products_path, &sales_path, &config).unwrap();
    let frames = build_frames(&merged).unwrap();

    let sku1 = frames.iter().find(|f| f.product_id == "SKU-1").unwrap();
    let promo = sku1.weekly_sales.regressor("promo_display").unwrap();
    // The burst weeks carry a positive share-weighted promo signal.
    assert!(promo[12] > 0.0);
    assert!(promo[13] > 0.0);
    assert_eq!(promo[0], 0.0);

    // One price column per market.
    assert!(sku1.weekly_sales.regressor("price_web_a").is_some());
    assert!(sku1.weekly_sales.regressor("price_web_b").is_some());
}
