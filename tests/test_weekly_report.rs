//! Integration tests for the weekly KPI report assembler.
//!
//! Run with: `cargo test --test test_weekly_report`

mod common;

use algo_insights_mcp::{
    reports::{developer_report, kpis_report, weekly_tvl_report},
    services::QueryCatalog,
    types::Period,
    AppError,
};
use common::{assert_close, weekly_source, WEEKLY_CATALOG};

const PREV: &str = "2024-01-07";
const CURR: &str = "2024-01-14";

fn period() -> Period {
    Period::weekly(Some(CURR)).unwrap()
}

#[tokio::test]
async fn test_weekly_tvl_report() {
    let source = weekly_source();

    let report = weekly_tvl_report(&source, &period()).await.unwrap();

    assert_eq!(report.metrics(), vec!["cmc_ranking", "tvl_usd", "tvl_algo"]);
    assert_close(report.value("tvl_algo", PREV).unwrap(), 500_000_000.0);
    assert_close(report.value("tvl_algo", CURR).unwrap(), 495_000_000.0);
    assert_close(report.row("tvl_algo").and_then(|r| r.change).unwrap(), -0.01);
    assert_close(report.row("cmc_ranking").and_then(|r| r.change).unwrap(), -0.05);

    assert_eq!(
        source.calls(),
        vec![
            format!("chain_tvl {}", PREV),
            format!("price {}", PREV),
            format!("rank {}", PREV),
            format!("chain_tvl {}", CURR),
            format!("price {}", CURR),
            format!("rank {}", CURR),
        ]
    );
}

#[tokio::test]
async fn test_developer_report() {
    let source = weekly_source();
    let catalog = QueryCatalog::from_yaml(WEEKLY_CATALOG).unwrap();

    let report = developer_report(&source, &catalog, &period()).await.unwrap();

    assert_eq!(
        report.metrics(),
        vec!["algokit_downloads", "algokit_python", "algokit_ts", "active_devs"]
    );
    assert_close(report.value("algokit_downloads", PREV).unwrap(), 4000.0);
    assert_close(report.value("algokit_downloads", CURR).unwrap(), 4500.0);
    assert_close(report.value("algokit_python", CURR).unwrap(), 1200.0);
    assert_close(report.value("algokit_ts", CURR).unwrap(), 3300.0);
    assert_close(report.row("algokit_downloads").and_then(|r| r.change).unwrap(), 0.125);
    assert_close(report.row("active_devs").and_then(|r| r.change).unwrap(), 0.1);

    let bigquery: Vec<_> =
        source.calls().into_iter().filter(|c| c.starts_with("python_downloads")).collect();
    assert_eq!(bigquery.len(), 2);
    assert!(bigquery[0].ends_with(&format!("week = '{}'", PREV)));
    assert!(bigquery[1].ends_with(&format!("week = '{}'", CURR)));
}

#[tokio::test]
async fn test_developer_report_requires_downloads_query() {
    let source = weekly_source();
    let catalog = QueryCatalog::from_yaml(
        "weekly_transactions:\n  sql: \"SELECT WEEK, n FROM txns WHERE week = WEEK\"\n",
    )
    .unwrap();

    let err = developer_report(&source, &catalog, &period()).await.unwrap_err();
    assert!(matches!(err, AppError::MissingData(_)));
}

#[tokio::test]
async fn test_kpis_report_row_order() {
    let source = weekly_source();
    let catalog = QueryCatalog::from_yaml(WEEKLY_CATALOG).unwrap();

    let report = kpis_report(&source, &catalog, &period()).await.unwrap();

    assert_eq!(
        report.metrics(),
        vec![
            "weekly_transactions",
            "nodes",
            "cmc_ranking",
            "tvl_usd",
            "tvl_algo",
            "algokit_downloads",
            "algokit_python",
            "algokit_ts",
            "active_devs",
        ]
    );
    assert_close(report.value("weekly_transactions", CURR).unwrap(), 5_500_000.0);
    assert_close(report.row("weekly_transactions").and_then(|r| r.change).unwrap(), 0.1);
    assert_eq!(report.row("nodes").and_then(|r| r.change), Some(0.0));
}

#[tokio::test]
async fn test_kpis_report_skips_downloads_in_warehouse_pass() {
    let source = weekly_source();
    let catalog = QueryCatalog::from_yaml(WEEKLY_CATALOG).unwrap();

    kpis_report(&source, &catalog, &period()).await.unwrap();

    let queries: Vec<_> = source.calls().into_iter().filter(|c| c.starts_with("query ")).collect();
    assert_eq!(queries.len(), 2, "one warehouse call per week: {:?}", queries);
    assert!(queries.iter().all(|q| q.contains("txns")));
}
