//! Integration tests for publishing reports to sheets.
//!
//! Run with: `cargo test --test test_publish`

mod common;

use std::collections::BTreeMap;

use algo_insights_mcp::{
    reports::{kpis_report, monthly_report, publish_monthly, publish_weekly, KpiSheet},
    services::QueryCatalog,
    types::{CellValue, Period},
};
use common::{monthly_source, weekly_source, RecordingSheet, MONTHLY_CATALOG, WEEKLY_CATALOG};

#[tokio::test]
async fn test_publish_monthly_creates_summary_tab() {
    let period = Period::monthly(Some("2024-01-31")).unwrap();
    let catalog = QueryCatalog::from_yaml(MONTHLY_CATALOG).unwrap();
    let report = monthly_report(&monthly_source(), &catalog, &period).await.unwrap();
    let sheet = RecordingSheet::default();

    let summary = publish_monthly(&sheet, &report, &period).await.unwrap();

    assert_eq!(summary.sheet, "Summary Table Dec - Jan");
    assert_eq!(
        *sheet.added.lock().unwrap(),
        vec![("Summary Table Dec - Jan".to_string(), 1000, 26)]
    );

    let writes = sheet.cells.lock().unwrap();
    assert_eq!(writes.len(), 1, "cells are written in one batch");
    let (tab, cells) = &writes[0];
    assert_eq!(tab, "Summary Table Dec - Jan");
    assert_eq!(summary.cells_written, cells.len());

    let cell = |address: &str| cells.iter().find(|c| c.cell == address).map(|c| c.value.clone());
    assert_eq!(cell("G3"), Some(CellValue::text("2024-01-31")));
    assert_eq!(cell("E36"), Some(CellValue::text("TVL (USD)")));
    assert_eq!(cell("F36"), Some(CellValue::Number(100_000_000.0)));
    assert_eq!(cell("G36"), Some(CellValue::Number(120_000_000.0)));
    assert_eq!(cell("E42"), Some(CellValue::text("Total Stablecoins MCap (USD)")));
    assert_eq!(cell("G32"), Some(CellValue::Number(1100.0)));
    // 3 header cells, 12 static cells and 4 cells for each of the 9 mapped rows;
    // fee_sink_balance and the other raw inflation inputs have no position.
    assert_eq!(cells.len(), 3 + 12 + 9 * 4);
}

#[tokio::test]
async fn test_publish_weekly_appends_after_last_row() {
    let period = Period::weekly(Some("2024-01-14")).unwrap();
    let catalog = QueryCatalog::from_yaml(WEEKLY_CATALOG).unwrap();
    let report = kpis_report(&weekly_source(), &catalog, &period).await.unwrap();

    let mut existing = BTreeMap::new();
    existing.insert(
        "Algokit".to_string(),
        vec![
            vec!["Week".to_string(), "Downloads".to_string()],
            vec!["2024-01-07".to_string(), "4000".to_string()],
            vec![],
        ],
    );
    let sheet = RecordingSheet { existing, ..Default::default() };

    let summary = publish_weekly(&sheet, &report, &period, KpiSheet::Algokit).await.unwrap();

    assert_eq!(summary.row, Some(3));
    let rows = sheet.rows.lock().unwrap();
    assert_eq!(
        *rows,
        vec![(
            "Algokit".to_string(),
            3,
            vec![
                CellValue::text("2024-01-14"),
                CellValue::Number(4500.0),
                CellValue::Number(1200.0),
                CellValue::Number(3300.0),
                CellValue::Number(220.0),
            ],
        )]
    );
}

#[tokio::test]
async fn test_publish_weekly_financials_leaves_blank_columns() {
    let period = Period::weekly(Some("2024-01-14")).unwrap();
    let catalog = QueryCatalog::from_yaml(
        r#"
weekly_transactions:
  sql: "SELECT WEEK, n FROM txns WHERE week = WEEK"
weekly_wallets:
  sql: "SELECT WEEK, n FROM wallets WHERE week = WEEK"
weekly_active_users:
  sql: "SELECT WEEK, n FROM users WHERE week = WEEK"
online_stake:
  sql: "SELECT WEEK, n FROM stake WHERE week = WEEK"
online_accounts:
  sql: "SELECT WEEK, n FROM accounts WHERE week = WEEK"
algokit_downloads:
  sql: "SELECT COUNT(*) AS python_downloads FROM pypi WHERE week = WEEK"
"#,
    )
    .unwrap();
    let source = weekly_source()
        .table("wallets", &[("2024-01-14", 30_000.0)])
        .table("users", &[("2024-01-14", 12_000.0)])
        .table("stake", &[("2024-01-14", 2_000_000_000.0)])
        .table("accounts", &[("2024-01-14", 900.0)]);
    let report = kpis_report(&source, &catalog, &period).await.unwrap();
    let sheet = RecordingSheet::default();

    let summary =
        publish_weekly(&sheet, &report, &period, KpiSheet::FinancialsOnChain).await.unwrap();

    assert_eq!(summary.sheet, "Financials & OnChain");
    assert_eq!(summary.row, Some(1));
    let rows = sheet.rows.lock().unwrap();
    let values = &rows[0].2;
    assert_eq!(values.len(), 12);
    assert_eq!(values[1], CellValue::Number(38.0));
    assert_eq!(values[5], CellValue::Empty);
    assert_eq!(values[6], CellValue::Empty);
    assert_eq!(values[11], CellValue::Number(1500.0));
}
