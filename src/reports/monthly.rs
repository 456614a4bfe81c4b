//! Month-over-month insights report.

use tracing::{debug, info};

use crate::{
    error::Result,
    services::{
        queries::{monthly_bindings, NamedQuery, QueryCatalog},
        MarketField, MetricSource,
    },
    types::{ratio, MetricRow, Period, Report},
};

/// Stake at genesis, the denominator of the inflation rate.
pub const INITIAL_STAKE: f64 = 8_326_259_584.0;

/// Fee sink balance at genesis.
pub const INITIAL_BALANCE: f64 = 5_504_018.0;

/// Empty report with the period's two columns.
pub fn period_report(period: &Period) -> Report {
    Report::new(vec![period.previous_label(), period.current_label()])
}

/// TVL, RWA TVL and circulating supply for both period ends.
///
/// `tvl_algo` is TVL over price; `circulating_supply` is market cap over
/// price.
pub async fn tvl_report(source: &dyn MetricSource, period: &Period) -> Result<Report> {
    let (prev, curr) = (period.previous_end, period.current_end);
    let (prev_label, curr_label) = (period.previous_label(), period.current_label());

    let tvl_curr = source.chain_tvl(curr).await?;
    let tvl_prev = source.chain_tvl(prev).await?;
    let price_curr = source.market_value(curr, MarketField::Price).await?;
    let price_prev = source.market_value(prev, MarketField::Price).await?;
    let mcap_curr = source.market_value(curr, MarketField::MarketCap).await?;
    let mcap_prev = source.market_value(prev, MarketField::MarketCap).await?;
    let rwa_curr = source.rwa_tvl(curr).await?;
    let rwa_prev = source.rwa_tvl(prev).await?;

    let mut report = period_report(period);
    let pair = |metric: &str, p: Option<f64>, c: Option<f64>| {
        MetricRow::pair(metric, (prev_label.as_str(), p), (curr_label.as_str(), c))
    };
    report.push(pair("tvl_usd", Some(tvl_prev), Some(tvl_curr)));
    report.push(pair(
        "tvl_algo",
        ratio(Some(tvl_prev), Some(price_prev)),
        ratio(Some(tvl_curr), Some(price_curr)),
    ));
    report.push(pair("rwa_tvl", Some(rwa_prev), Some(rwa_curr)));
    report.push(pair(
        "circulating_supply",
        ratio(Some(mcap_prev), Some(price_prev)),
        ratio(Some(mcap_curr), Some(price_curr)),
    ));

    report.compute_changes(&prev_label, &curr_label);
    Ok(report)
}

/// Stablecoin market cap for both period ends.
pub async fn stables_report(source: &dyn MetricSource, period: &Period) -> Result<Report> {
    let (prev_label, curr_label) = (period.previous_label(), period.current_label());

    let curr = source.stables_mcap(period.current_end).await?;
    let prev = source.stables_mcap(period.previous_end).await?;

    let mut report = period_report(period);
    report.push(MetricRow::pair(
        "stables_mcap",
        (prev_label.as_str(), Some(prev)),
        (curr_label.as_str(), Some(curr)),
    ));
    report.compute_changes(&prev_label, &curr_label);
    Ok(report)
}

/// One metric row from a rendered warehouse query.
pub async fn query_row(
    source: &dyn MetricSource,
    query: &NamedQuery,
    sql: &str,
) -> Result<MetricRow> {
    debug!(metric = %query.name, "Running metric query");
    let rows = source.query(sql).await?;
    Ok(rows
        .into_iter()
        .fold(MetricRow::new(&query.name), |row, (label, value)| row.with(label, value)))
}

/// Fee sink and issuance rows derived from already-fetched warehouse rows.
///
/// Requires `fee_sink_balance`, `fees_collected_cumulative` and
/// `gross_issuance` in `report`.
pub fn inflation_rows(report: &Report, period: &Period) -> Result<Vec<MetricRow>> {
    let mut total_fee_sink = Vec::with_capacity(2);
    let mut issued = Vec::with_capacity(2);
    let mut rate = Vec::with_capacity(2);

    for label in [period.previous_label(), period.current_label()] {
        let sink = report.value("fee_sink_balance", &label)?
            + report.value("fees_collected_cumulative", &label)?;
        let issuance = report.value("gross_issuance", &label)? + INITIAL_BALANCE - sink;

        total_fee_sink.push((label.clone(), Some(sink)));
        issued.push((label.clone(), Some(issuance)));
        rate.push((label, Some(issuance / INITIAL_STAKE)));
    }

    let row = |metric: &str, values: Vec<(String, Option<f64>)>| {
        values.into_iter().fold(MetricRow::new(metric), |row, (l, v)| row.with(l, v))
    };
    Ok(vec![
        row("total_fee_sink_balance", total_fee_sink),
        row("inflation_amount", issued),
        row("inflation", rate),
    ])
}

/// Full monthly report.
///
/// Rows, in order: every catalog query, `nodes`, the derived inflation rows,
/// then the stablecoin and TVL sub-reports.
pub async fn monthly_report(
    source: &dyn MetricSource,
    catalog: &QueryCatalog,
    period: &Period,
) -> Result<Report> {
    let (prev_label, curr_label) = (period.previous_label(), period.current_label());
    info!(previous = %prev_label, current = %curr_label, "Assembling monthly report");

    let bindings = monthly_bindings(period);
    let mut report = period_report(period);

    for query in catalog.iter() {
        let sql = query.render(&bindings);
        report.push(query_row(source, query, &sql).await?);
    }

    let nodes_curr = source.node_count(period.current_end).await?;
    let nodes_prev = source.node_count(period.previous_end).await?;
    report.push(MetricRow::pair(
        "nodes",
        (prev_label.as_str(), Some(nodes_prev)),
        (curr_label.as_str(), Some(nodes_curr)),
    ));

    for row in inflation_rows(&report, period)? {
        report.push(row);
    }
    report.compute_changes(&prev_label, &curr_label);

    let stables = stables_report(source, period).await?;
    let tvl = tvl_report(source, period).await?;
    let report = report.concat(stables).concat(tvl);

    info!(rows = report.rows.len(), "Monthly report assembled");
    Ok(report)
}
