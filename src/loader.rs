//! CSV ingest for the product catalog and the sales transaction file.
//!
//! The two files share a `product_id` key. Sales rows without a catalog
//! match are dropped (inner-join semantics) but counted: the join report
//! is logged, and an anomalously low match rate is a hard error rather
//! than a silently incomplete table.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::core::{MergedRecord, MergedTable, Product, SaleRecord};
use crate::error::{PipelineError, Result};

/// Raw sales row as it appears in `sales.csv`.
///
/// Numeric fields are optional so that blank cells deserialize; the
/// missing-as-zero policy is applied during conversion.
#[derive(Debug, Deserialize)]
struct SaleRow {
    product_id: String,
    website: String,
    date: NaiveDate,
    units_sold: Option<f64>,
    selling_price: Option<f64>,
    promotion_dummy_1: Option<f64>,
    promotion_dummy_2: Option<f64>,
}

impl SaleRow {
    fn into_record(self) -> SaleRecord {
        SaleRecord {
            product_id: self.product_id,
            market_id: self.website,
            date: self.date,
            units_sold: self.units_sold.unwrap_or(0.0),
            selling_price: self.selling_price.unwrap_or(0.0),
            promo_display: coerce_dummy(self.promotion_dummy_1),
            promo_flyer: coerce_dummy(self.promotion_dummy_2),
        }
    }
}

/// Coerce a promotion dummy to exactly 0.0 or 1.0. Missing and
/// non-finite values count as no promotion.
fn coerce_dummy(raw: Option<f64>) -> f64 {
    match raw {
        Some(v) if v.is_finite() && v != 0.0 => 1.0,
        _ => 0.0,
    }
}

/// Outcome of the catalog join, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinReport {
    /// Sales rows read from the file.
    pub sales_rows: usize,
    /// Rows that found a catalog match.
    pub matched: usize,
    /// Rows dropped for lack of a catalog match.
    pub dropped: usize,
}

impl JoinReport {
    pub fn match_rate(&self) -> f64 {
        if self.sales_rows == 0 {
            0.0
        } else {
            self.matched as f64 / self.sales_rows as f64
        }
    }
}

/// Load the product catalog. The file must carry a `product_id` column;
/// every other column is kept as a categorical attribute.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<Product>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let headers = reader.headers()?.clone();

    let id_idx = headers
        .iter()
        .position(|h| h == "product_id")
        .ok_or_else(|| PipelineError::MissingColumn("product_id".to_string()))?;

    let mut products = Vec::new();
    for record in reader.records() {
        let record = record?;
        let id = record
            .get(id_idx)
            .ok_or_else(|| PipelineError::MissingColumn("product_id".to_string()))?
            .to_string();

        let mut attributes = BTreeMap::new();
        for (idx, value) in record.iter().enumerate() {
            if idx != id_idx {
                let name = headers.get(idx).unwrap_or("").to_string();
                attributes.insert(name, value.to_string());
            }
        }
        products.push(Product { id, attributes });
    }

    debug!(products = products.len(), "loaded product catalog");
    Ok(products)
}

/// Load the sales transaction file.
pub fn load_sales(path: impl AsRef<Path>) -> Result<Vec<SaleRecord>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut sales = Vec::new();
    for row in reader.deserialize::<SaleRow>() {
        sales.push(row?.into_record());
    }
    debug!(sales = sales.len(), "loaded sales transactions");
    Ok(sales)
}

/// Inner-join sales with the catalog on `product_id`.
///
/// Unmatched rows are dropped and counted. A match rate below
/// `config.min_match_rate` aborts with [`PipelineError::JoinMismatch`].
pub fn merge(
    products: &[Product],
    sales: Vec<SaleRecord>,
    config: &PipelineConfig,
) -> Result<(MergedTable, JoinReport)> {
    let catalog: HashMap<&str, &Product> =
        products.iter().map(|p| (p.id.as_str(), p)).collect();

    let total = sales.len();
    let mut rows = Vec::with_capacity(total);
    for sale in sales {
        if let Some(product) = catalog.get(sale.product_id.as_str()) {
            rows.push(MergedRecord {
                sale,
                attributes: product.attributes.clone(),
            });
        }
    }

    let report = JoinReport {
        sales_rows: total,
        matched: rows.len(),
        dropped: total - rows.len(),
    };

    if report.dropped > 0 {
        warn!(
            dropped = report.dropped,
            total = report.sales_rows,
            "sales rows without a catalog match were dropped"
        );
    }

    if report.match_rate() < config.min_match_rate {
        return Err(PipelineError::JoinMismatch {
            matched: report.matched,
            total: report.sales_rows,
        });
    }

    Ok((MergedTable::new(rows), report))
}

/// Load both files and join them in one step.
pub fn load_merged(
    products_path: impl AsRef<Path>,
    sales_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<(MergedTable, JoinReport)> {
    let products = load_catalog(products_path)?;
    let sales = load_sales(sales_path)?;
    merge(&products, sales, config)
}
