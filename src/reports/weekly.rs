//! Week-over-week KPI report.

use tracing::info;

use crate::{
    error::{AppError, Result},
    reports::monthly::{period_report, query_row},
    services::{
        queries::{week_bindings, QueryCatalog, ALGOKIT_DOWNLOADS},
        MarketField, MetricSource,
    },
    types::{ratio, MetricRow, Period, Report},
};

/// Market-cap rank, TVL in USD and TVL in ALGO for both weeks.
pub async fn weekly_tvl_report(source: &dyn MetricSource, period: &Period) -> Result<Report> {
    let (prev_label, curr_label) = (period.previous_label(), period.current_label());

    let mut rank = MetricRow::new("cmc_ranking");
    let mut tvl_usd = MetricRow::new("tvl_usd");
    let mut tvl_algo = MetricRow::new("tvl_algo");

    for (date, label) in [(period.previous_end, &prev_label), (period.current_end, &curr_label)] {
        let tvl = source.chain_tvl(date).await?;
        let price = source.market_value(date, MarketField::Price).await?;
        let position = source.market_rank(date).await?;

        rank = rank.with(label.as_str(), Some(position));
        tvl_usd = tvl_usd.with(label.as_str(), Some(tvl));
        tvl_algo = tvl_algo.with(label.as_str(), ratio(Some(tvl), Some(price)));
    }

    let mut report = period_report(period);
    report.push(rank);
    report.push(tvl_usd);
    report.push(tvl_algo);
    report.compute_changes(&prev_label, &curr_label);
    Ok(report)
}

/// AlgoKit downloads (PyPI + npm) and active developers for both weeks.
pub async fn developer_report(
    source: &dyn MetricSource,
    catalog: &QueryCatalog,
    period: &Period,
) -> Result<Report> {
    let (prev_label, curr_label) = (period.previous_label(), period.current_label());
    let downloads_query = catalog
        .get(ALGOKIT_DOWNLOADS)
        .ok_or_else(|| AppError::MissingData(format!("query '{}' in catalog", ALGOKIT_DOWNLOADS)))?;

    let mut total = MetricRow::new("algokit_downloads");
    let mut python = MetricRow::new("algokit_python");
    let mut npm = MetricRow::new("algokit_ts");
    let mut devs = MetricRow::new("active_devs");

    for (date, label) in [(period.previous_end, &prev_label), (period.current_end, &curr_label)] {
        let sql = downloads_query.render(&week_bindings(date));
        let py = source.python_downloads(&sql).await?;
        let js = source.npm_downloads(date).await?;
        let active = source.active_devs(date).await?;

        total = total.with(label.as_str(), Some(py + js));
        python = python.with(label.as_str(), Some(py));
        npm = npm.with(label.as_str(), Some(js));
        devs = devs.with(label.as_str(), Some(active));
    }

    let mut report = period_report(period);
    report.push(total);
    report.push(python);
    report.push(npm);
    report.push(devs);
    report.compute_changes(&prev_label, &curr_label);
    Ok(report)
}

/// Full weekly KPI report.
///
/// Rows, in order: every catalog query except `algokit_downloads` (run once
/// per week and merged), `nodes`, the TVL sub-report, then the developer
/// sub-report.
pub async fn kpis_report(
    source: &dyn MetricSource,
    catalog: &QueryCatalog,
    period: &Period,
) -> Result<Report> {
    let (prev_label, curr_label) = (period.previous_label(), period.current_label());
    info!(previous = %prev_label, current = %curr_label, "Assembling weekly KPI report");

    let mut report = period_report(period);

    for query in catalog.iter().filter(|q| q.name != ALGOKIT_DOWNLOADS) {
        let prev_sql = query.render(&week_bindings(period.previous_end));
        let curr_sql = query.render(&week_bindings(period.current_end));

        let mut row = query_row(source, query, &prev_sql).await?;
        let current = query_row(source, query, &curr_sql).await?;
        row.merge(current);
        report.push(row);
    }

    let mut nodes = MetricRow::new("nodes");
    for (date, label) in [(period.previous_end, &prev_label), (period.current_end, &curr_label)] {
        nodes = nodes.with(label.as_str(), Some(source.node_count(date).await?));
    }
    report.push(nodes);
    report.compute_changes(&prev_label, &curr_label);

    let tvl = weekly_tvl_report(source, period).await?;
    let developers = developer_report(source, catalog, period).await?;
    let report = report.concat(tvl).concat(developers);

    info!(rows = report.rows.len(), "Weekly KPI report assembled");
    Ok(report)
}
