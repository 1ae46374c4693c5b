//! Hierarchical wide pivot: one weekly-sum column per (product, market)
//! leaf, with the level widths of the padded compound key recorded so the
//! hierarchy grouping can be reconstructed from the column labels.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::core::{week_start, MergedTable, WeeklySeries};
use crate::error::{PipelineError, Result};

/// A leaf of the product -> market hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SeriesKey {
    pub product: String,
    pub market: String,
}

/// Wide weekly table: total sales decompose into product branches, and
/// each product branch into market leaves.
#[derive(Debug, Clone)]
pub struct HierarchyTable {
    weeks: Vec<NaiveDate>,
    keys: Vec<SeriesKey>,
    /// Column-major leaf values: columns[leaf][week].
    columns: Vec<Vec<f64>>,
    /// Characters of the padded compound label belonging to the product level.
    product_chars: usize,
    /// Characters belonging to the market level.
    market_chars: usize,
}

impl HierarchyTable {
    /// Pivot the merged table wide: weekly unit sums per (product, market),
    /// every leaf covering the same global week range, empty weeks as zero.
    pub fn from_merged(table: &MergedTable) -> Result<Self> {
        if table.is_empty() {
            return Err(PipelineError::EmptyData);
        }

        let mut sums: BTreeMap<SeriesKey, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        let mut first: Option<NaiveDate> = None;
        let mut last: Option<NaiveDate> = None;

        for row in table.rows() {
            let week = week_start(row.sale.date);
            first = Some(first.map_or(week, |f| f.min(week)));
            last = Some(last.map_or(week, |l| l.max(week)));

            let key = SeriesKey {
                product: row.sale.product_id.clone(),
                market: row.sale.market_id.clone(),
            };
            *sums.entry(key).or_default().entry(week).or_insert(0.0) += row.sale.units_sold;
        }

        let (first, last) = (
            first.ok_or(PipelineError::EmptyData)?,
            last.ok_or(PipelineError::EmptyData)?,
        );

        let mut weeks = Vec::new();
        let mut current = first;
        while current <= last {
            weeks.push(current);
            current += Duration::days(7);
        }

        let keys: Vec<SeriesKey> = sums.keys().cloned().collect();
        let columns: Vec<Vec<f64>> = keys
            .iter()
            .map(|key| {
                let by_week = &sums[key];
                weeks
                    .iter()
                    .map(|w| by_week.get(w).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect();

        let product_chars = keys.iter().map(|k| k.product.len()).max().unwrap_or(0);
        let market_chars = keys.iter().map(|k| k.market.len()).max().unwrap_or(0);

        Ok(Self {
            weeks,
            keys,
            columns,
            product_chars,
            market_chars,
        })
    }

    pub fn weeks(&self) -> &[NaiveDate] {
        &self.weeks
    }

    pub fn keys(&self) -> &[SeriesKey] {
        &self.keys
    }

    pub fn num_leaves(&self) -> usize {
        self.keys.len()
    }

    pub fn num_weeks(&self) -> usize {
        self.weeks.len()
    }

    /// How many characters of each compound label belong to (product, market).
    pub fn level_chars(&self) -> (usize, usize) {
        (self.product_chars, self.market_chars)
    }

    /// Padded compound label for a leaf, product level first.
    pub fn label(&self, key: &SeriesKey) -> String {
        format!(
            "{:_<pw$}{:_<mw$}",
            key.product,
            key.market,
            pw = self.product_chars,
            mw = self.market_chars
        )
    }

    /// Leaf column values.
    pub fn column(&self, key: &SeriesKey) -> Option<&[f64]> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Leaf column as a weekly series.
    pub fn leaf_series(&self, key: &SeriesKey) -> Result<WeeklySeries> {
        let column = self
            .column(key)
            .ok_or_else(|| PipelineError::InvalidParameter(format!(
                "unknown leaf ({}, {})",
                key.product, key.market
            )))?;
        WeeklySeries::new(self.weeks.clone(), column.to_vec())
    }

    /// All (market, column) pairs under one product.
    pub fn leaves_for_product(&self, product: &str) -> Vec<(&str, &[f64])> {
        self.keys
            .iter()
            .zip(self.columns.iter())
            .filter(|(key, _)| key.product == product)
            .map(|(key, col)| (key.market.as_str(), col.as_slice()))
            .collect()
    }

    /// Product-level aggregate: the sum of the product's leaf columns.
    pub fn product_total(&self, product: &str) -> Result<WeeklySeries> {
        let leaves = self.leaves_for_product(product);
        if leaves.is_empty() {
            return Err(PipelineError::InvalidParameter(format!(
                "unknown product '{product}'"
            )));
        }
        let mut total = vec![0.0; self.weeks.len()];
        for (_, column) in &leaves {
            for (acc, value) in total.iter_mut().zip(column.iter()) {
                *acc += value;
            }
        }
        WeeklySeries::new(self.weeks.clone(), total)
    }

    /// Top-of-hierarchy aggregate: the sum of all leaf columns.
    pub fn grand_total(&self) -> Result<WeeklySeries> {
        if self.columns.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        let mut total = vec![0.0; self.weeks.len()];
        for column in &self.columns {
            for (acc, value) in total.iter_mut().zip(column.iter()) {
                *acc += value;
            }
        }
        WeeklySeries::new(self.weeks.clone(), total)
    }

    /// Melt back to long format: (week, product, market, weekly units).
    ///
    /// Inverse of the pivot modulo weekly summation: duplicate daily rows
    /// collapse into their weekly sum.
    pub fn to_long(&self) -> Vec<(NaiveDate, String, String, f64)> {
        let mut rows = Vec::with_capacity(self.keys.len() * self.weeks.len());
        for (key, column) in self.keys.iter().zip(self.columns.iter()) {
            for (week, value) in self.weeks.iter().zip(column.iter()) {
                rows.push((*week, key.product.clone(), key.market.clone(), *value));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MergedRecord, SaleRecord};
    use std::collections::BTreeMap;

    fn record(product: &str, market: &str, day: u32, units: f64) -> MergedRecord {
        MergedRecord {
            sale: SaleRecord {
                product_id: product.to_string(),
                market_id: market.to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                units_sold: units,
                selling_price: 10.0,
                promo_display: 0.0,
                promo_flyer: 0.0,
            },
            attributes: BTreeMap::new(),
        }
    }

    fn sample_table() -> MergedTable {
        MergedTable::new(vec![
            record("p1", "web_a", 1, 2.0),
            record("p1", "web_a", 2, 3.0),
            record("p1", "web_b", 1, 1.0),
            record("p2", "web_a", 8, 4.0),
        ])
    }

    #[test]
    fn pivot_sums_within_weeks_and_pads_missing_cells() {
        let table = HierarchyTable::from_merged(&sample_table()).unwrap();

        assert_eq!(table.num_weeks(), 2);
        assert_eq!(table.num_leaves(), 3);

        let p1_a = SeriesKey {
            product: "p1".to_string(),
            market: "web_a".to_string(),
        };
        assert_eq!(table.column(&p1_a).unwrap(), &[5.0, 0.0]);

        let p2_a = SeriesKey {
            product: "p2".to_string(),
            market: "web_a".to_string(),
        };
        assert_eq!(table.column(&p2_a).unwrap(), &[0.0, 4.0]);
    }

    #[test]
    fn level_chars_describe_the_compound_label() {
        let table = HierarchyTable::from_merged(&sample_table()).unwrap();
        let (product_chars, market_chars) = table.level_chars();

        let key = SeriesKey {
            product: "p1".to_string(),
            market: "web_a".to_string(),
        };
        let label = table.label(&key);

        assert_eq!(label.len(), product_chars + market_chars);
        assert!(label.starts_with("p1"));
        assert!(label[product_chars..].starts_with("web_a"));
    }

    #[test]
    fn product_total_sums_its_leaves() {
        let table = HierarchyTable::from_merged(&sample_table()).unwrap();
        let total = table.product_total("p1").unwrap();

        // web_a week 1: 5, web_b week 1: 1 -> 6; week 2 empty.
        assert_eq!(total.values(), &[6.0, 0.0]);
    }

    #[test]
    fn grand_total_sums_all_leaves() {
        let table = HierarchyTable::from_merged(&sample_table()).unwrap();
        let total = table.grand_total().unwrap();
        assert_eq!(total.values(), &[6.0, 4.0]);
    }

    #[test]
    fn wide_to_long_round_trip_reproduces_weekly_values() {
        let merged = sample_table();
        let table = HierarchyTable::from_merged(&merged).unwrap();
        let long = table.to_long();

        // Every observed (week, product, market) weekly sum survives the
        // round trip; duplicate daily rows collapse into their sum.
        let find = |product: &str, market: &str, week_day: u32| -> f64 {
            let week = NaiveDate::from_ymd_opt(2024, 1, week_day).unwrap();
            long.iter()
                .find(|(w, p, m, _)| *w == week && p == product && m == market)
                .map(|(_, _, _, v)| *v)
                .unwrap()
        };

        assert_eq!(find("p1", "web_a", 1), 5.0);
        assert_eq!(find("p1", "web_b", 1), 1.0);
        assert_eq!(find("p2", "web_a", 8), 4.0);
        assert_eq!(long.len(), table.num_leaves() * table.num_weeks());
    }

    #[test]
    fn unknown_product_is_an_error() {
        let table = HierarchyTable::from_merged(&sample_table()).unwrap();
        assert!(table.product_total("ghost").is_err());
    }
}
