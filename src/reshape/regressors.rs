//! Regression features and the saturating-growth target.
//!
//! Promotion flags are weighted by each market's historical share of total
//! unit volume before being summed across markets, so a promotion running
//! in a small market contributes proportionally to the combined feature.
//! Prices are not additive across markets and stay one column per market.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::core::{MergedTable, WeeklyAggregate, WeeklySeries};
use crate::error::{PipelineError, Result};

/// Per-product inputs for all three forecasting paths.
#[derive(Debug, Clone)]
pub struct ProductFrame {
    pub product_id: String,
    /// Weekly unit sums with the regressor columns attached.
    pub weekly_sales: WeeklySeries,
    /// Growth-path target: weekly mean of daily units times 7, with the
    /// same regressor columns. The mean-times-seven rule keeps partial
    /// weeks from under-counting the weekly total.
    pub growth_sales: WeeklySeries,
}

/// Each market's share of total unit volume across the whole table.
pub fn market_volume_shares(table: &MergedTable) -> BTreeMap<String, f64> {
    let totals = table.units_by_market();
    let grand: f64 = totals.values().sum();
    totals
        .into_iter()
        .map(|(market, units)| {
            let share = if grand > 0.0 { units / grand } else { 0.0 };
            (market, share)
        })
        .collect()
}

/// Daily accumulator for one product before weekly binning.
#[derive(Debug, Default, Clone)]
struct DayBucket {
    units: f64,
    promo_display: f64,
    promo_flyer: f64,
    /// market -> (price sum, observation count)
    prices: BTreeMap<String, (f64, usize)>,
}

/// Build one [`ProductFrame`] per product in the merged table.
pub fn build_frames(table: &MergedTable) -> Result<Vec<ProductFrame>> {
    if table.is_empty() {
        return Err(PipelineError::EmptyData);
    }

    let shares = market_volume_shares(table);
    let markets = table.market_ids();

    let mut frames = Vec::new();
    for product_id in table.product_ids() {
        let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
        for row in table.rows_for_product(&product_id) {
            let bucket = days.entry(row.sale.date).or_default();
            bucket.units += row.sale.units_sold;

            let share = shares.get(&row.sale.market_id).copied().unwrap_or(0.0);
            bucket.promo_display += share * row.sale.promo_display;
            bucket.promo_flyer += share * row.sale.promo_flyer;

            let price = bucket
                .prices
                .entry(row.sale.market_id.clone())
                .or_insert((0.0, 0));
            price.0 += row.sale.selling_price;
            price.1 += 1;
        }

        let dates: Vec<NaiveDate> = days.keys().copied().collect();
        let units: Vec<f64> = days.values().map(|b| b.units).collect();
        let promo_display: Vec<f64> = days.values().map(|b| b.promo_display).collect();
        let promo_flyer: Vec<f64> = days.values().map(|b| b.promo_flyer).collect();

        let weekly_sales = WeeklySeries::from_daily(&dates, &units, WeeklyAggregate::Sum)?;
        let growth_sales =
            WeeklySeries::from_daily(&dates, &units, WeeklyAggregate::MeanTimesSeven)?;

        let mut regressors: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        let (_, display_weekly) =
            crate::core::bin_weekly(&dates, &promo_display, WeeklyAggregate::Mean)?;
        let (_, flyer_weekly) =
            crate::core::bin_weekly(&dates, &promo_flyer, WeeklyAggregate::Mean)?;
        regressors.insert("promo_display".to_string(), display_weekly);
        regressors.insert("promo_flyer".to_string(), flyer_weekly);

        // One price column per market; days without a price for that
        // market contribute zero (missing-as-zero policy).
        for market in &markets {
            let daily_prices: Vec<f64> = days
                .values()
                .map(|bucket| {
                    bucket
                        .prices
                        .get(market)
                        .map(|(sum, count)| sum / *count as f64)
                        .unwrap_or(0.0)
                })
                .collect();
            let (_, weekly_prices) =
                crate::core::bin_weekly(&dates, &daily_prices, WeeklyAggregate::Mean)?;
            regressors.insert(format!("price_{market}"), weekly_prices);
        }

        let mut weekly_sales = weekly_sales;
        let mut growth_sales = growth_sales;
        for (name, values) in &regressors {
            weekly_sales = weekly_sales.with_regressor(name.clone(), values.clone())?;
            growth_sales = growth_sales.with_regressor(name.clone(), values.clone())?;
        }

        frames.push(ProductFrame {
            product_id,
            weekly_sales,
            growth_sales,
        });
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MergedRecord, SaleRecord};
    use approx::assert_relative_eq;

    fn record(
        product: &str,
        market: &str,
        day: u32,
        units: f64,
        price: f64,
        promo: f64,
    ) -> MergedRecord {
        MergedRecord {
            sale: SaleRecord {
                product_id: product.to_string(),
                market_id: market.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                units_sold: units,
                selling_price: price,
                promo_display: promo,
                promo_flyer: 0.0,
            },
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn shares_sum_to_one() {
        let table = MergedTable::new(vec![
            record("p1", "web_a", 1, 6.0, 10.0, 0.0),
            record("p1", "web_b", 1, 2.0, 12.0, 0.0),
        ]);

        let shares = market_volume_shares(&table);
        assert_relative_eq!(shares["web_a"], 0.75, epsilon = 1e-12);
        assert_relative_eq!(shares["web_b"], 0.25, epsilon = 1e-12);
        assert_relative_eq!(shares.values().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn promo_features_are_share_weighted() {
        // web_a carries 75% of volume. A promo only on web_b should
        // contribute 0.25 to the combined feature.
        let table = MergedTable::new(vec![
            record("p1", "web_a", 1, 6.0, 10.0, 0.0),
            record("p1", "web_b", 1, 2.0, 12.0, 1.0),
        ]);

        let frames = build_frames(&table).unwrap();
        let promo = frames[0].weekly_sales.regressor("promo_display").unwrap();
        assert_relative_eq!(promo[0], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn prices_stay_one_column_per_market() {
        let table = MergedTable::new(vec![
            record("p1", "web_a", 1, 1.0, 10.0, 0.0),
            record("p1", "web_b", 1, 1.0, 20.0, 0.0),
        ]);

        let frames = build_frames(&table).unwrap();
        let frame = &frames[0];

        assert_relative_eq!(
            frame.weekly_sales.regressor("price_web_a").unwrap()[0],
            10.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            frame.weekly_sales.regressor("price_web_b").unwrap()[0],
            20.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn growth_target_uses_mean_times_seven() {
        // Two observed days with 3 and 5 units: mean 4, weekly total 28.
        // The sum target sees 8.
        let table = MergedTable::new(vec![
            record("p1", "web_a", 1, 3.0, 10.0, 0.0),
            record("p1", "web_a", 2, 5.0, 10.0, 0.0),
        ]);

        let frames = build_frames(&table).unwrap();
        let frame = &frames[0];

        assert_relative_eq!(frame.weekly_sales.values()[0], 8.0, epsilon = 1e-12);
        assert_relative_eq!(frame.growth_sales.values()[0], 28.0, epsilon = 1e-12);
    }

    #[test]
    fn frames_cover_every_product() {
        let table = MergedTable::new(vec![
            record("p1", "web_a", 1, 1.0, 10.0, 0.0),
            record("p2", "web_a", 1, 2.0, 11.0, 0.0),
        ]);

        let frames = build_frames(&table).unwrap();
        let ids: Vec<&str> = frames.iter().map(|f| f.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn both_targets_share_regressor_columns() {
        let table = MergedTable::new(vec![
            record("p1", "web_a", 1, 1.0, 10.0, 1.0),
            record("p1", "web_a", 8, 2.0, 11.0, 0.0),
        ]);

        let frames = build_frames(&table).unwrap();
        let frame = &frames[0];

        assert_eq!(
            frame.weekly_sales.regressor_names(),
            frame.growth_sales.regressor_names()
        );
        assert_eq!(
            frame.weekly_sales.regressor("promo_display"),
            frame.growth_sales.regressor("promo_display")
        );
    }
}
