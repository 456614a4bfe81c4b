//! Common utilities for integration tests.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use algo_insights_mcp::{
    mcp::Sheets,
    services::{MarketField, MetricSource, QueryRow, SheetWriter},
    types::{label, CellUpdate, CellValue},
    AppError, InsightsServer, Result,
};
use async_trait::async_trait;
use chrono::NaiveDate;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Upstream values for one date.
#[derive(Debug, Clone, Default)]
pub struct Day {
    pub tvl: f64,
    pub price: f64,
    pub mcap: f64,
    pub stables: f64,
    pub rwa: f64,
    pub nodes: f64,
    pub rank: f64,
    pub python: f64,
    pub npm: f64,
    pub devs: f64,
}

/// In-memory metric source logging every call in order.
#[derive(Default)]
pub struct MockSource {
    pub days: BTreeMap<NaiveDate, Day>,
    /// Rows returned for any SQL mentioning the table name.
    pub tables: Vec<(String, Vec<QueryRow>)>,
    pub calls: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day(mut self, d: &str, values: Day) -> Self {
        self.days.insert(date(d), values);
        self
    }

    pub fn table(mut self, name: &str, rows: &[(&str, f64)]) -> Self {
        let rows = rows.iter().map(|(l, v)| (l.to_string(), Some(*v))).collect();
        self.tables.push((name.to_string(), rows));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn on(&self, date: NaiveDate) -> Result<&Day> {
        self.days.get(&date).ok_or_else(|| AppError::MissingData(format!("fixture for {}", date)))
    }
}

#[async_trait]
impl MetricSource for MockSource {
    async fn chain_tvl(&self, date: NaiveDate) -> Result<f64> {
        self.record(format!("chain_tvl {}", date));
        Ok(self.on(date)?.tvl)
    }

    async fn market_value(&self, date: NaiveDate, field: MarketField) -> Result<f64> {
        let day = self.on(date)?;
        match field {
            MarketField::Price => {
                self.record(format!("price {}", date));
                Ok(day.price)
            }
            MarketField::MarketCap => {
                self.record(format!("market_cap {}", date));
                Ok(day.mcap)
            }
        }
    }

    async fn stables_mcap(&self, date: NaiveDate) -> Result<f64> {
        self.record(format!("stables_mcap {}", date));
        Ok(self.on(date)?.stables)
    }

    async fn rwa_tvl(&self, date: NaiveDate) -> Result<f64> {
        self.record(format!("rwa_tvl {}", date));
        Ok(self.on(date)?.rwa)
    }

    async fn query(&self, sql: &str) -> Result<Vec<QueryRow>> {
        self.record(format!("query {}", sql));
        self.tables
            .iter()
            .find(|(name, _)| sql.split_whitespace().any(|token| token == name))
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| AppError::Query(format!("no fixture for '{}'", sql)))
    }

    async fn node_count(&self, date: NaiveDate) -> Result<f64> {
        self.record(format!("nodes {}", date));
        Ok(self.on(date)?.nodes)
    }

    async fn python_downloads(&self, sql: &str) -> Result<f64> {
        self.record(format!("python_downloads {}", sql));
        self.days
            .iter()
            .find(|(d, _)| sql.contains(&label(**d)))
            .map(|(_, day)| day.python)
            .ok_or_else(|| AppError::MissingData(format!("no week in '{}'", sql)))
    }

    async fn npm_downloads(&self, date: NaiveDate) -> Result<f64> {
        self.record(format!("npm_downloads {}", date));
        Ok(self.on(date)?.npm)
    }

    async fn active_devs(&self, week: NaiveDate) -> Result<f64> {
        self.record(format!("active_devs {}", week));
        Ok(self.on(week)?.devs)
    }

    async fn market_rank(&self, date: NaiveDate) -> Result<f64> {
        self.record(format!("rank {}", date));
        Ok(self.on(date)?.rank)
    }
}

/// Sheet writer keeping every write in memory.
#[derive(Default)]
pub struct RecordingSheet {
    /// Existing values returned by `read_values`, per tab.
    pub existing: BTreeMap<String, Vec<Vec<String>>>,
    pub added: Mutex<Vec<(String, u32, u32)>>,
    pub cells: Mutex<Vec<(String, Vec<CellUpdate>)>>,
    pub rows: Mutex<Vec<(String, usize, Vec<CellValue>)>>,
}

#[async_trait]
impl SheetWriter for RecordingSheet {
    async fn add_sheet(&self, title: &str, rows: u32, cols: u32) -> Result<()> {
        self.added.lock().unwrap().push((title.to_string(), rows, cols));
        Ok(())
    }

    async fn write_cells(&self, sheet: &str, cells: &[CellUpdate]) -> Result<()> {
        self.cells.lock().unwrap().push((sheet.to_string(), cells.to_vec()));
        Ok(())
    }

    async fn read_values(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        Ok(self.existing.get(sheet).cloned().unwrap_or_default())
    }

    async fn write_row(&self, sheet: &str, row: usize, values: &[CellValue]) -> Result<()> {
        self.rows.lock().unwrap().push((sheet.to_string(), row, values.to_vec()));
        Ok(())
    }
}

pub const MONTHLY_CATALOG: &str = r#"
fee_sink_balance:
  sql: "SELECT day, balance FROM sink WHERE day IN (PREV_MONTH, CURR_MONTH)"
fees_collected_cumulative:
  sql: "SELECT day, total FROM fees WHERE day IN (PREV_MONTH, CURR_MONTH)"
gross_issuance:
  sql: "SELECT day, issued FROM issuance WHERE day IN (PREV_MONTH, CURR_MONTH)"
"#;

pub const WEEKLY_CATALOG: &str = r#"
weekly_transactions:
  sql: "SELECT WEEK, n FROM txns WHERE week = WEEK"
algokit_downloads:
  sql: "SELECT COUNT(*) AS python_downloads FROM pypi WHERE week = WEEK"
"#;

/// Monthly fixture for January 2024 against December 2023.
pub fn monthly_source() -> MockSource {
    MockSource::new()
        .day(
            "2023-12-31",
            Day {
                tvl: 100_000_000.0,
                price: 0.25,
                mcap: 2_000_000_000.0,
                stables: 40_000_000.0,
                rwa: 0.0,
                nodes: 1000.0,
                ..Default::default()
            },
        )
        .day(
            "2024-01-31",
            Day {
                tvl: 120_000_000.0,
                price: 0.20,
                mcap: 1_600_000_000.0,
                stables: 50_000_000.0,
                rwa: 3_000_000.0,
                nodes: 1100.0,
                ..Default::default()
            },
        )
        .table("sink", &[("2023-12-31", 100.0), ("2024-01-31", 200.0)])
        .table("fees", &[("2023-12-31", 1000.0), ("2024-01-31", 1100.0)])
        .table("issuance", &[("2023-12-31", 10_000.0), ("2024-01-31", 12_000.0)])
}

/// Weekly fixture for the week of 2024-01-14 against 2024-01-07.
pub fn weekly_source() -> MockSource {
    MockSource::new()
        .day(
            "2024-01-07",
            Day {
                tvl: 90_000_000.0,
                price: 0.18,
                rank: 40.0,
                nodes: 1500.0,
                python: 1000.0,
                npm: 3000.0,
                devs: 200.0,
                ..Default::default()
            },
        )
        .day(
            "2024-01-14",
            Day {
                tvl: 99_000_000.0,
                price: 0.20,
                rank: 38.0,
                nodes: 1500.0,
                python: 1200.0,
                npm: 3300.0,
                devs: 220.0,
                ..Default::default()
            },
        )
        .table("txns", &[("2024-01-07", 5_000_000.0), ("2024-01-14", 5_500_000.0)])
}

/// Write a catalog to a per-process temp file.
pub fn catalog_file(name: &str, yaml: &str) -> PathBuf {
    let path = std::env::temp_dir()
        .join(format!("algo-insights-{}-{}-{}.yaml", name, std::process::id(), rand_suffix()));
    std::fs::write(&path, yaml).unwrap();
    path
}

fn rand_suffix() -> u128 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
}

/// Server over mock sources and optional recording sheets.
pub fn create_test_server(source: MockSource, sheets: Sheets) -> InsightsServer {
    InsightsServer::with_parts(
        Arc::new(source),
        sheets,
        catalog_file("monthly", MONTHLY_CATALOG),
        catalog_file("weekly", WEEKLY_CATALOG),
    )
}

pub fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * expected.abs().max(1.0);
    assert!((actual - expected).abs() < tolerance, "expected {}, got {}", expected, actual);
}
