//! Immutable record types: catalog entries, raw sales facts, and the
//! merged table the reshaper consumes.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// A catalog entry: product identifier plus unordered categorical attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    /// Attribute name -> category label. All attributes are treated as
    /// unordered factors; no numeric interpretation is attached.
    pub attributes: BTreeMap<String, String>,
}

impl Product {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// One raw sales fact: a single product on a single market on a single day.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub product_id: String,
    pub market_id: String,
    pub date: NaiveDate,
    pub units_sold: f64,
    pub selling_price: f64,
    /// First promotion dummy, coerced to 0.0 or 1.0.
    pub promo_display: f64,
    /// Second promotion dummy, coerced to 0.0 or 1.0.
    pub promo_flyer: f64,
}

/// A sale joined with its catalog attributes. Derived, read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub sale: SaleRecord,
    pub attributes: BTreeMap<String, String>,
}

/// The inner-joined table of all matched sales.
#[derive(Debug, Clone, Default)]
pub struct MergedTable {
    rows: Vec<MergedRecord>,
}

impl MergedTable {
    pub fn new(rows: Vec<MergedRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MergedRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct product identifiers, sorted.
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .rows
            .iter()
            .map(|r| r.sale.product_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Distinct market identifiers, sorted.
    pub fn market_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rows.iter().map(|r| r.sale.market_id.clone()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// All rows belonging to one product, in input order.
    pub fn rows_for_product<'a>(&'a self, product_id: &'a str) -> impl Iterator<Item = &'a MergedRecord> {
        self.rows
            .iter()
            .filter(move |r| r.sale.product_id == product_id)
    }

    /// Total units sold per market across the whole table.
    pub fn units_by_market(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for row in &self.rows {
            *totals.entry(row.sale.market_id.clone()).or_insert(0.0) += row.sale.units_sold;
        }
        totals
    }
}
