//! Sheet layouts and publishing of assembled reports.

use std::str::FromStr;

use tracing::info;

use crate::{
    error::Result,
    services::SheetWriter,
    types::{CellUpdate, CellValue, Period, PublishSummary, Report},
};

/// Dimensions of a new monthly summary tab.
pub const SUMMARY_ROWS: u32 = 1000;
pub const SUMMARY_COLS: u32 = 26;

/// Monthly metric → (sheet row, display label).
pub const MONTHLY_ROWS: [(&str, u32, &str); 18] = [
    ("circulating_supply", 6, "Circulating Supply (ALGO)"),
    ("fees_collected", 8, "Fees Collected (ALGO)"),
    ("payouts_paid", 10, "Payouts Paid (ALGO)"),
    ("total_fee_sink_balance", 12, "Total Fee Sink Balance (ALGO)"),
    ("inflation_amount", 14, "Tokens Issued (ALGO)"),
    ("inflation", 16, "Annualized Token Issuance"),
    ("online_stake", 18, "Online Stake (ALGO)"),
    ("online_accounts", 22, "Online Accounts"),
    ("monthly_transactions", 26, "Total Transactions"),
    ("monthly_wallets", 28, "Total Wallets"),
    ("monthly_active_users", 30, "Monthly Active Users"),
    ("nodes", 32, "Nodes"),
    ("tvl_usd", 36, "TVL (USD)"),
    ("tvl_algo", 38, "TVL (ALGO)"),
    ("rwa_tvl", 40, "RWA TVL (USD)"),
    ("stables_mcap", 42, "Total Stablecoins MCap (USD)"),
    ("contracts_deployed", 44, "Contracts Deployed"),
    ("asa_created", 46, "New Assets Created"),
];

/// Section titles and footnotes of the monthly summary.
const MONTHLY_STATIC_CELLS: [(&str, &str); 12] = [
    ("E3", "Metric"),
    ("D5", "Tokenomics"),
    ("E20", "AF Stake (ALGO)"),
    ("D25", "Network"),
    ("D35", "Ecosystem"),
    ("D49", "Social"),
    ("E50", "X - AlgoFoundation"),
    ("E52", "YT - AlgoFoundation"),
    ("E54", "IG - AlgoFoundation"),
    ("D57", "Data Sources: Nodely DW, Defillama, Coingecko"),
    ("D58", "MAU is any wallet which sent at least 1 txn in a month"),
    ("D59", "This report has been prepared under the supervision of the AF BI team"),
];

/// Title of the monthly tab, e.g. `Summary Table Dec - Jan`.
pub fn summary_title(period: &Period) -> String {
    let (prev, curr) = period.month_names();
    format!("Summary Table {} - {}", prev, curr)
}

/// Every cell written for a monthly report.
pub fn monthly_layout(report: &Report, period: &Period) -> Vec<CellUpdate> {
    let (prev_label, curr_label) = (period.previous_label(), period.current_label());
    let (prev_month, curr_month) = period.month_names();

    let mut cells = vec![
        CellUpdate::new("F3", CellValue::text(&prev_label)),
        CellUpdate::new("G3", CellValue::text(&curr_label)),
        CellUpdate::new(
            "H3",
            CellValue::text(format!("MoM change:\n{} - {}", prev_month, curr_month)),
        ),
    ];
    cells.extend(
        MONTHLY_STATIC_CELLS
            .iter()
            .map(|(cell, text)| CellUpdate::new(*cell, CellValue::text(*text))),
    );

    for row in &report.rows {
        let Some((_, line, label)) = MONTHLY_ROWS.iter().find(|(m, _, _)| *m == row.metric) else {
            continue;
        };
        cells.push(CellUpdate::new(format!("E{}", line), CellValue::text(*label)));
        cells.push(CellUpdate::new(format!("F{}", line), CellValue::number(row.get(&prev_label))));
        cells.push(CellUpdate::new(format!("G{}", line), CellValue::number(row.get(&curr_label))));
        cells.push(CellUpdate::new(format!("H{}", line), CellValue::number(row.change)));
    }

    cells
}

/// Create the monthly summary tab and fill it.
pub async fn publish_monthly(
    writer: &dyn SheetWriter,
    report: &Report,
    period: &Period,
) -> Result<PublishSummary> {
    let title = summary_title(period);
    info!(sheet = %title, "Publishing monthly summary");

    writer.add_sheet(&title, SUMMARY_ROWS, SUMMARY_COLS).await?;
    let cells = monthly_layout(report, period);
    writer.write_cells(&title, &cells).await?;

    Ok(PublishSummary { sheet: title, cells_written: cells.len(), row: None })
}

/// Column placement of one weekly KPI cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KpiColumn {
    Week,
    Metric(&'static str),
    Blank,
}

/// Weekly KPI tabs that accept appended rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiSheet {
    FinancialsOnChain,
    Algokit,
}

impl KpiSheet {
    pub fn title(self) -> &'static str {
        match self {
            KpiSheet::FinancialsOnChain => "Financials & OnChain",
            KpiSheet::Algokit => "Algokit",
        }
    }

    fn columns(self) -> &'static [KpiColumn] {
        use KpiColumn::*;
        match self {
            // The two blanks hold wallet-app figures entered by hand.
            KpiSheet::FinancialsOnChain => &[
                Week,
                Metric("cmc_ranking"),
                Metric("weekly_transactions"),
                Metric("weekly_wallets"),
                Metric("weekly_active_users"),
                Blank,
                Blank,
                Metric("tvl_usd"),
                Metric("tvl_algo"),
                Metric("online_stake"),
                Metric("online_accounts"),
                Metric("nodes"),
            ],
            KpiSheet::Algokit => &[
                Week,
                Metric("algokit_downloads"),
                Metric("algokit_python"),
                Metric("algokit_ts"),
                Metric("active_devs"),
            ],
        }
    }
}

impl FromStr for KpiSheet {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Financials & OnChain" => Ok(KpiSheet::FinancialsOnChain),
            "Algokit" => Ok(KpiSheet::Algokit),
            other => Err(format!(
                "Unknown sheet '{}'. Expected 'Financials & OnChain' or 'Algokit'",
                other
            )),
        }
    }
}

/// Current-week values laid out for `sheet`.
pub fn kpi_row(report: &Report, sheet: KpiSheet, period: &Period) -> Result<Vec<CellValue>> {
    let week = period.current_label();
    sheet
        .columns()
        .iter()
        .map(|column| match column {
            KpiColumn::Week => Ok(CellValue::text(&week)),
            KpiColumn::Blank => Ok(CellValue::Empty),
            KpiColumn::Metric(metric) => report.value(metric, &week).map(CellValue::Number),
        })
        .collect()
}

/// 1-based index of the last row holding any non-blank cell, 0 when none.
pub fn last_filled_row(values: &[Vec<String>]) -> usize {
    values
        .iter()
        .rposition(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Append the current week's KPIs below the last filled row of `sheet`.
pub async fn publish_weekly(
    writer: &dyn SheetWriter,
    report: &Report,
    period: &Period,
    sheet: KpiSheet,
) -> Result<PublishSummary> {
    let row = kpi_row(report, sheet, period)?;
    let existing = writer.read_values(sheet.title()).await?;
    let next = last_filled_row(&existing) + 1;

    info!(sheet = sheet.title(), row = next, "Publishing weekly KPIs");
    writer.write_row(sheet.title(), next, &row).await?;

    Ok(PublishSummary {
        sheet: sheet.title().to_string(),
        cells_written: row.len(),
        row: Some(next),
    })
}
