//! Weekly time series with named regressor columns.
//!
//! All forecasting paths work on ISO-week bins. Daily observations are
//! collapsed either by summation (unit counts), plain means (prices), or
//! mean-times-seven (the growth path's partial-week rule).

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{PipelineError, Result};

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// How daily observations within one week are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeeklyAggregate {
    /// Sum of all daily values; empty weeks become 0.
    Sum,
    /// Mean of the daily values present; empty weeks become 0.
    Mean,
    /// Mean of the daily values present, times 7. Scales partial weeks up
    /// to a full-week total instead of under-counting them.
    MeanTimesSeven,
}

/// Collapse daily `(date, value)` pairs into a gap-free weekly series.
///
/// The output covers every week from the earliest to the latest observed
/// week; weeks with no observations get 0 (missing-as-zero policy).
/// Non-finite daily values are treated as absent.
pub fn bin_weekly(
    dates: &[NaiveDate],
    values: &[f64],
    agg: WeeklyAggregate,
) -> Result<(Vec<NaiveDate>, Vec<f64>)> {
    if dates.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    if dates.len() != values.len() {
        return Err(PipelineError::DimensionMismatch {
            expected: dates.len(),
            got: values.len(),
        });
    }

    let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for (date, value) in dates.iter().zip(values.iter()) {
        if !value.is_finite() {
            continue;
        }
        let entry = sums.entry(week_start(*date)).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let first = week_start(*dates.iter().min().ok_or(PipelineError::EmptyData)?);
    let last = week_start(*dates.iter().max().ok_or(PipelineError::EmptyData)?);

    let mut weeks = Vec::new();
    let mut out = Vec::new();
    let mut current = first;
    while current <= last {
        let value = match sums.get(&current) {
            Some((sum, count)) => match agg {
                WeeklyAggregate::Sum => *sum,
                WeeklyAggregate::Mean => sum / *count as f64,
                WeeklyAggregate::MeanTimesSeven => 7.0 * sum / *count as f64,
            },
            None => 0.0,
        };
        weeks.push(current);
        out.push(value);
        current += Duration::days(7);
    }

    Ok((weeks, out))
}

/// A weekly series: consecutive week-start dates, one value per week, and
/// optional named regressor columns aligned to the same weeks.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySeries {
    weeks: Vec<NaiveDate>,
    values: Vec<f64>,
    regressors: BTreeMap<String, Vec<f64>>,
}

impl WeeklySeries {
    /// Create a weekly series, validating alignment and 7-day spacing.
    pub fn new(weeks: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if weeks.is_empty() {
            return Err(PipelineError::EmptyData);
        }
        if weeks.len() != values.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: weeks.len(),
                got: values.len(),
            });
        }
        for pair in weeks.windows(2) {
            if pair[1] - pair[0] != Duration::days(7) {
                return Err(PipelineError::InvalidParameter(
                    "weeks must be consecutive and 7 days apart".to_string(),
                ));
            }
        }
        Ok(Self {
            weeks,
            values,
            regressors: BTreeMap::new(),
        })
    }

    /// Build a weekly series directly from daily observations.
    pub fn from_daily(dates: &[NaiveDate], values: &[f64], agg: WeeklyAggregate) -> Result<Self> {
        let (weeks, binned) = bin_weekly(dates, values, agg)?;
        Self::new(weeks, binned)
    }

    /// Attach a named regressor column aligned to the series weeks.
    pub fn with_regressor(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.weeks.len() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.weeks.len(),
                got: values.len(),
            });
        }
        self.regressors.insert(name.into(), values);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn weeks(&self) -> &[NaiveDate] {
        &self.weeks
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn regressor(&self, name: &str) -> Option<&[f64]> {
        self.regressors.get(name).map(|v| v.as_slice())
    }

    pub fn regressors(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.regressors
    }

    pub fn regressor_names(&self) -> Vec<String> {
        self.regressors.keys().cloned().collect()
    }

    pub fn has_regressors(&self) -> bool {
        !self.regressors.is_empty()
    }

    /// Extract the half-open index range `[start, end)`, regressors included.
    pub fn slice(&self, start: usize, end: usize) -> Result<WeeklySeries> {
        if start > end || end > self.len() {
            return Err(PipelineError::InvalidParameter(format!(
                "slice [{start}, {end}) out of range for series of length {}",
                self.len()
            )));
        }
        let regressors = self
            .regressors
            .iter()
            .map(|(name, vals)| (name.clone(), vals[start..end].to_vec()))
            .collect();
        Ok(WeeklySeries {
            weeks: self.weeks[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            regressors,
        })
    }

    /// Split into train and test windows. The test window is exactly the
    /// final `horizon` weeks; everything earlier is train.
    pub fn split_train_test(&self, horizon: usize) -> Result<(WeeklySeries, WeeklySeries)> {
        if self.len() <= horizon {
            return Err(PipelineError::InsufficientData {
                needed: horizon + 1,
                got: self.len(),
            });
        }
        let cut = self.len() - horizon;
        Ok((self.slice(0, cut)?, self.slice(cut, self.len())?))
    }

    /// Drop regressor columns that are constant over this window.
    ///
    /// A constant column makes the design matrix rank-deficient, so it must
    /// never reach a fitting step. Returns the dropped names.
    pub fn drop_constant_regressors(&mut self) -> Vec<String> {
        let constant: Vec<String> = self
            .regressors
            .iter()
            .filter(|(_, vals)| {
                vals.windows(2).all(|pair| pair[0] == pair[1])
            })
            .map(|(name, _)| name.clone())
            .collect();
        for name in &constant {
            self.regressors.remove(name);
        }
        constant
    }

    /// Regressor columns as an owned name -> values map (e.g. the aligned
    /// future values for a prediction window).
    pub fn regressor_map(&self) -> BTreeMap<String, Vec<f64>> {
        self.regressors.clone()
    }
}
