//! Metric rows and wide report tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Relative change between two period values.
///
/// Returns `current / previous - 1`, or `0.0` when either side is missing,
/// the previous value is zero, or the ratio is not finite.
pub fn change(current: Option<f64>, previous: Option<f64>) -> f64 {
    match (current, previous) {
        (Some(curr), Some(prev)) if prev != 0.0 => {
            let ratio = curr / prev - 1.0;
            if ratio.is_finite() {
                ratio
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// `numerator / denominator`, or `None` when the denominator is zero or
/// either side is missing.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

/// One metric with a value per period label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Metric name (catalog key or derived metric).
    pub metric: String,
    /// Value keyed by period label; `None` is a missing value.
    pub values: BTreeMap<String, Option<f64>>,
    /// Relative change, set by [`Report::compute_changes`].
    pub change: Option<f64>,
    /// Labels in the order they were first inserted.
    #[serde(skip)]
    labels: Vec<String>,
}

impl MetricRow {
    pub fn new(metric: impl Into<String>) -> Self {
        Self { metric: metric.into(), values: BTreeMap::new(), change: None, labels: Vec::new() }
    }

    /// Builder-style value insertion.
    pub fn with(mut self, label: impl Into<String>, value: Option<f64>) -> Self {
        self.insert(label.into(), value);
        self
    }

    fn insert(&mut self, label: String, value: Option<f64>) {
        if !self.labels.contains(&label) {
            self.labels.push(label.clone());
        }
        self.values.insert(label, value);
    }

    /// Take every value of `other`, overwriting shared labels.
    pub fn merge(&mut self, other: MetricRow) {
        for label in other.labels() {
            let value = other.values.get(label).copied().flatten();
            self.insert(label.clone(), value);
        }
    }

    /// Period labels, insertion order first, then any set directly on `values`.
    pub fn labels(&self) -> impl Iterator<Item = &String> {
        self.labels
            .iter()
            .chain(self.values.keys().filter(move |k| !self.labels.contains(*k)))
    }

    /// Row holding exactly the previous and current values.
    pub fn pair(
        metric: impl Into<String>,
        previous: (&str, Option<f64>),
        current: (&str, Option<f64>),
    ) -> Self {
        Self::new(metric).with(previous.0, previous.1).with(current.0, current.1)
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.values.get(label).copied().flatten()
    }
}

/// Ordered collection of metric rows sharing period columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Period labels in display order (previous first).
    pub columns: Vec<String>,
    pub rows: Vec<MetricRow>,
}

impl Report {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn push(&mut self, row: MetricRow) {
        for label in row.labels() {
            if !self.columns.contains(label) {
                self.columns.push(label.clone());
            }
        }
        self.rows.push(row);
    }

    /// Append another report's rows after this one's, keeping both orders.
    pub fn concat(mut self, other: Report) -> Self {
        for label in other.columns {
            if !self.columns.contains(&label) {
                self.columns.push(label);
            }
        }
        self.rows.extend(other.rows);
        self
    }

    /// First row with the given metric name.
    pub fn row(&self, metric: &str) -> Option<&MetricRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }

    /// Value of a metric for a period, failing when the row or value is absent.
    pub fn value(&self, metric: &str, label: &str) -> Result<f64> {
        self.row(metric)
            .and_then(|r| r.get(label))
            .ok_or_else(|| AppError::MissingData(format!("{} on {}", metric, label)))
    }

    /// Set every row's change from `previous` to `current`.
    pub fn compute_changes(&mut self, previous: &str, current: &str) {
        for row in &mut self.rows {
            row.change = Some(change(row.get(current), row.get(previous)));
        }
    }

    pub fn metrics(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.metric.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
