//! Spreadsheet cell types.

use serde::{Deserialize, Serialize};

/// A value written to a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Number when present, empty cell otherwise.
    pub fn number(value: Option<f64>) -> Self {
        value.map(CellValue::Number).unwrap_or(CellValue::Empty)
    }

    /// JSON representation accepted by the Sheets values API.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Number(n) => serde_json::json!(n),
            CellValue::Text(s) => serde_json::json!(s),
            CellValue::Empty => serde_json::json!(""),
        }
    }
}

/// A write to an A1-style cell address within one tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellUpdate {
    /// Cell address, e.g. `F12`.
    pub cell: String,
    pub value: CellValue,
}

impl CellUpdate {
    pub fn new(cell: impl Into<String>, value: CellValue) -> Self {
        Self { cell: cell.into(), value }
    }
}

/// Outcome of a publish tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSummary {
    /// Tab written to.
    pub sheet: String,
    /// Number of cells written.
    pub cells_written: usize,
    /// Row index for row-append publishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}
