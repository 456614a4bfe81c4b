//! MCP server implementation.

use std::{path::PathBuf, sync::Arc};

use rmcp::{
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Serialize;

use crate::{
    config::Config,
    error::AppError,
    reports::{self, publish, KpiSheet},
    services::{
        queries::{week_bindings, QueryCatalog, ALGOKIT_DOWNLOADS},
        GoogleSheetsClient, HttpMetricSource, MarketField, MetricSource, SheetWriter,
    },
    types::{label, resolve_date, Period, Report},
};

/// Publish targets, present when a spreadsheet id and credentials are configured.
#[derive(Clone, Default)]
pub struct Sheets {
    pub insights: Option<Arc<dyn SheetWriter>>,
    pub kpis: Option<Arc<dyn SheetWriter>>,
}

/// Algorand Insights MCP Server.
///
/// Provides tools for fetching network metrics, assembling monthly and
/// weekly comparative reports and publishing them to spreadsheets.
#[derive(Clone)]
pub struct InsightsServer {
    source: Arc<dyn MetricSource>,
    sheets: Sheets,
    monthly_queries: PathBuf,
    weekly_queries: PathBuf,
    tool_router: ToolRouter<Self>,
}

impl InsightsServer {
    /// Create a new server from configuration.
    ///
    /// No network calls are made during startup; every tool fetches on
    /// demand.
    pub fn new(config: Config) -> Result<Self, AppError> {
        tracing::info!("Initializing Algorand Insights MCP Server");

        let source = HttpMetricSource::new(&config)?;
        let client = crate::services::http::build_client()?;

        let sheet = |id: &Option<String>| -> Option<Arc<dyn SheetWriter>> {
            let auth = source.google_auth()?.clone();
            let id = id.as_ref()?;
            Some(Arc::new(GoogleSheetsClient::new(
                client.clone(),
                config.endpoints.sheets.clone(),
                id.clone(),
                auth,
            )))
        };
        let sheets = Sheets {
            insights: sheet(&config.insights_spreadsheet_id),
            kpis: sheet(&config.kpis_spreadsheet_id),
        };

        tracing::info!(
            insights_sheet = sheets.insights.is_some(),
            kpis_sheet = sheets.kpis.is_some(),
            "Algorand Insights MCP Server initialized successfully"
        );

        Ok(Self::with_parts(
            Arc::new(source),
            sheets,
            config.monthly_queries,
            config.weekly_queries,
        ))
    }

    /// Assemble a server from explicit parts.
    pub fn with_parts(
        source: Arc<dyn MetricSource>,
        sheets: Sheets,
        monthly_queries: PathBuf,
        weekly_queries: PathBuf,
    ) -> Self {
        Self { source, sheets, monthly_queries, weekly_queries, tool_router: Self::tool_router() }
    }

    async fn monthly_report(&self, period: &Period) -> Result<Report, AppError> {
        let catalog = QueryCatalog::load(&self.monthly_queries)?;
        reports::monthly_report(self.source.as_ref(), &catalog, period).await
    }

    async fn kpis_report(&self, period: &Period) -> Result<Report, AppError> {
        let catalog = QueryCatalog::load(&self.weekly_queries)?;
        reports::kpis_report(self.source.as_ref(), &catalog, period).await
    }
}

/// Input for tools reading a single date.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct DateInput {
    /// Date as YYYY-MM-DD. Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
}

/// Input for the get_coingecko_price tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct MarketValueInput {
    /// Date as YYYY-MM-DD. Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
    /// "price" or "market_cap". Defaults to "price".
    #[serde(default)]
    pub field: Option<String>,
}

/// Input for the execute_query tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct QueryInput {
    /// SQL returning (date, value) rows.
    pub sql: String,
}

/// Input for the get_algokit_downloads tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct DownloadsInput {
    /// Week date as YYYY-MM-DD. Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
    /// BigQuery SQL for PyPI downloads. Defaults to the weekly catalog's algokit_downloads query.
    #[serde(default)]
    pub sql: Option<String>,
}

/// Input for monthly report tools.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct MonthInput {
    /// Current period end as YYYY-MM-DD. Defaults to today.
    #[serde(default)]
    pub month: Option<String>,
}

/// Input for weekly report tools.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct WeekInput {
    /// Current week date as YYYY-MM-DD. Defaults to today.
    #[serde(default)]
    pub week: Option<String>,
}

/// Input for the publish_kpis tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct PublishKpisInput {
    /// Current week date as YYYY-MM-DD. Defaults to today.
    #[serde(default)]
    pub week: Option<String>,
    /// Target tab: "Financials & OnChain" or "Algokit".
    pub sheet: String,
}

#[derive(Debug, Serialize)]
struct MetricValue {
    metric: &'static str,
    date: String,
    value: f64,
}

#[derive(Debug, Serialize)]
struct DownloadCounts {
    week: String,
    python: f64,
    npm: f64,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

/// Invalid dates are reported as the tool's text result; other errors propagate.
fn date_message(err: AppError) -> Result<String, McpError> {
    match err {
        AppError::InvalidDate(_) => Ok(err.to_string()),
        other => Err(other.into()),
    }
}

macro_rules! or_date_message {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return date_message(err),
        }
    };
}

#[tool_router]
impl InsightsServer {
    /// Total chain TVL in USD from DefiLlama.
    #[tool(description = "Get Algorand total TVL in USD from DefiLlama for a date (YYYY-MM-DD)")]
    pub async fn get_defillama_tvl(
        &self,
        Parameters(input): Parameters<DateInput>,
    ) -> Result<String, McpError> {
        tracing::info!(date = ?input.date, "get_defillama_tvl called");
        let date = or_date_message!(resolve_date(input.date.as_deref()));

        let value = self.source.chain_tvl(date).await?;
        to_json(&MetricValue { metric: "tvl_usd", date: label(date), value })
    }

    /// ALGO price or market cap from the CoinGecko export.
    #[tool(
        description = "Get ALGO price or market cap in USD from CoinGecko for a date. field is 'price' (default) or 'market_cap'."
    )]
    pub async fn get_coingecko_price(
        &self,
        Parameters(input): Parameters<MarketValueInput>,
    ) -> Result<String, McpError> {
        tracing::info!(date = ?input.date, field = ?input.field, "get_coingecko_price called");
        let date = or_date_message!(resolve_date(input.date.as_deref()));
        let field = input
            .field
            .as_ref()
            .map(|s| s.parse::<MarketField>().map_err(|e| McpError::invalid_params(e, None)))
            .transpose()?
            .unwrap_or_default();

        let value = self.source.market_value(date, field).await?;
        let metric = match field {
            MarketField::Price => "price",
            MarketField::MarketCap => "market_cap",
        };
        to_json(&MetricValue { metric, date: label(date), value })
    }

    /// Combined Algorand stablecoin market cap.
    #[tool(
        description = "Get total Algorand stablecoin market cap in USD from DefiLlama for a date"
    )]
    pub async fn get_stables_tvl(
        &self,
        Parameters(input): Parameters<DateInput>,
    ) -> Result<String, McpError> {
        tracing::info!(date = ?input.date, "get_stables_tvl called");
        let date = or_date_message!(resolve_date(input.date.as_deref()));

        let value = self.source.stables_mcap(date).await?;
        to_json(&MetricValue { metric: "stables_mcap", date: label(date), value })
    }

    /// Combined RWA protocol TVL.
    #[tool(
        description = "Get total Algorand real-world-asset TVL in USD from DefiLlama for a date"
    )]
    pub async fn get_rwa_tvl(
        &self,
        Parameters(input): Parameters<DateInput>,
    ) -> Result<String, McpError> {
        tracing::info!(date = ?input.date, "get_rwa_tvl called");
        let date = or_date_message!(resolve_date(input.date.as_deref()));

        let value = self.source.rwa_tvl(date).await?;
        to_json(&MetricValue { metric: "rwa_tvl", date: label(date), value })
    }

    /// Run a warehouse query.
    #[tool(
        description = "Run a SQL query on the analytics warehouse. The query must return (date, value) rows."
    )]
    pub async fn execute_query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<String, McpError> {
        tracing::info!("execute_query called");
        if input.sql.trim().is_empty() {
            return Err(McpError::invalid_params("sql cannot be empty", None));
        }

        let rows = self.source.query(&input.sql).await?;
        to_json(&rows)
    }

    /// Node count from the Nodely API.
    #[tool(description = "Get the number of unique Algorand node IPs for a date")]
    pub async fn get_nodes(
        &self,
        Parameters(input): Parameters<DateInput>,
    ) -> Result<String, McpError> {
        tracing::info!(date = ?input.date, "get_nodes called");
        let date = or_date_message!(resolve_date(input.date.as_deref()));

        let value = self.source.node_count(date).await?;
        to_json(&MetricValue { metric: "nodes", date: label(date), value })
    }

    /// Market-cap rank from CoinMarketCap historical snapshots.
    #[tool(
        description = "Get Algorand's CoinMarketCap rank from the historical snapshot of a date"
    )]
    pub async fn get_cmc_ranking(
        &self,
        Parameters(input): Parameters<DateInput>,
    ) -> Result<String, McpError> {
        tracing::info!(date = ?input.date, "get_cmc_ranking called");
        let date = or_date_message!(resolve_date(input.date.as_deref()));

        let value = self.source.market_rank(date).await?;
        to_json(&MetricValue { metric: "cmc_ranking", date: label(date), value })
    }

    /// AlgoKit PyPI and npm downloads for a week.
    #[tool(description = "Get AlgoKit downloads for the week of a date: PyPI (BigQuery) and npm")]
    pub async fn get_algokit_downloads(
        &self,
        Parameters(input): Parameters<DownloadsInput>,
    ) -> Result<String, McpError> {
        tracing::info!(
            date = ?input.date,
            custom_sql = input.sql.is_some(),
            "get_algokit_downloads called"
        );
        let date = or_date_message!(resolve_date(input.date.as_deref()));

        let sql = match input.sql {
            Some(sql) => sql,
            None => {
                let catalog = QueryCatalog::load(&self.weekly_queries)?;
                let query = catalog.get(ALGOKIT_DOWNLOADS).ok_or_else(|| {
                    AppError::MissingData(format!("query '{}' in catalog", ALGOKIT_DOWNLOADS))
                })?;
                query.render(&week_bindings(date))
            }
        };

        let python = self.source.python_downloads(&sql).await?;
        let npm = self.source.npm_downloads(date).await?;
        to_json(&DownloadCounts { week: label(date), python, npm })
    }

    /// Active developers for a week.
    #[tool(description = "Get the number of active developers for a week (YYYY-MM-DD)")]
    pub async fn get_active_devs(
        &self,
        Parameters(input): Parameters<WeekInput>,
    ) -> Result<String, McpError> {
        tracing::info!(week = ?input.week, "get_active_devs called");
        let week = or_date_message!(resolve_date(input.week.as_deref()));

        let value = self.source.active_devs(week).await?;
        to_json(&MetricValue { metric: "active_devs", date: label(week), value })
    }

    /// Month-over-month TVL sub-report.
    #[tool(
        description = "Month-over-month TVL report: TVL in USD and ALGO, RWA TVL and circulating supply for the given month end and the previous month end"
    )]
    pub async fn get_tvl_report(
        &self,
        Parameters(input): Parameters<MonthInput>,
    ) -> Result<String, McpError> {
        tracing::info!(month = ?input.month, "get_tvl_report called");
        let period = or_date_message!(Period::monthly(input.month.as_deref()));

        let report = reports::tvl_report(self.source.as_ref(), &period).await?;
        to_json(&report)
    }

    /// Month-over-month stablecoin sub-report.
    #[tool(description = "Month-over-month Algorand stablecoin market cap report")]
    pub async fn get_stables_mcap(
        &self,
        Parameters(input): Parameters<MonthInput>,
    ) -> Result<String, McpError> {
        tracing::info!(month = ?input.month, "get_stables_mcap called");
        let period = or_date_message!(Period::monthly(input.month.as_deref()));

        let report = reports::stables_report(self.source.as_ref(), &period).await?;
        to_json(&report)
    }

    /// Full monthly insights report.
    #[tool(
        description = "Full month-over-month Algorand insights report: warehouse metrics, nodes, inflation, stablecoins and TVL, with the change for every metric"
    )]
    pub async fn get_report(
        &self,
        Parameters(input): Parameters<MonthInput>,
    ) -> Result<String, McpError> {
        tracing::info!(month = ?input.month, "get_report called");
        let period = or_date_message!(Period::monthly(input.month.as_deref()));

        let report = self.monthly_report(&period).await?;
        to_json(&report)
    }

    /// Publish the monthly report to a new summary tab.
    #[tool(
        description = "Build the monthly insights report and write it to a new 'Summary Table' sheet tab"
    )]
    pub async fn update_sheet(
        &self,
        Parameters(input): Parameters<MonthInput>,
    ) -> Result<String, McpError> {
        tracing::info!(month = ?input.month, "update_sheet called");
        let period = or_date_message!(Period::monthly(input.month.as_deref()));
        let writer = self.sheets.insights.as_ref().ok_or_else(|| {
            McpError::from(AppError::Config(
                "INSIGHTS_SPREADSHEET_ID and GOOGLE_APPLICATION_CREDENTIALS must be set".into(),
            ))
        })?;

        let report = self.monthly_report(&period).await?;
        let summary = publish::publish_monthly(writer.as_ref(), &report, &period).await?;
        to_json(&summary)
    }

    /// Week-over-week TVL and ranking sub-report.
    #[tool(description = "Week-over-week report of CoinMarketCap rank and TVL in USD and ALGO")]
    pub async fn get_weekly_tvl_report(
        &self,
        Parameters(input): Parameters<WeekInput>,
    ) -> Result<String, McpError> {
        tracing::info!(week = ?input.week, "get_weekly_tvl_report called");
        let period = or_date_message!(Period::weekly(input.week.as_deref()));

        let report = reports::weekly_tvl_report(self.source.as_ref(), &period).await?;
        to_json(&report)
    }

    /// Full weekly KPI report.
    #[tool(
        description = "Full week-over-week KPI report: warehouse metrics, nodes, ranking, TVL, AlgoKit downloads and active developers"
    )]
    pub async fn get_kpis_report(
        &self,
        Parameters(input): Parameters<WeekInput>,
    ) -> Result<String, McpError> {
        tracing::info!(week = ?input.week, "get_kpis_report called");
        let period = or_date_message!(Period::weekly(input.week.as_deref()));

        let report = self.kpis_report(&period).await?;
        to_json(&report)
    }

    /// Append the weekly KPIs to a marketing sheet tab.
    #[tool(
        description = "Build the weekly KPI report and append the week's row to the 'Financials & OnChain' or 'Algokit' sheet tab"
    )]
    pub async fn publish_kpis(
        &self,
        Parameters(input): Parameters<PublishKpisInput>,
    ) -> Result<String, McpError> {
        tracing::info!(week = ?input.week, sheet = %input.sheet, "publish_kpis called");
        let period = or_date_message!(Period::weekly(input.week.as_deref()));
        let sheet = input.sheet.parse::<KpiSheet>().map_err(|e| McpError::invalid_params(e, None))?;
        let writer = self.sheets.kpis.as_ref().ok_or_else(|| {
            McpError::from(AppError::Config(
                "KPIS_SPREADSHEET_ID and GOOGLE_APPLICATION_CREDENTIALS must be set".into(),
            ))
        })?;

        let report = self.kpis_report(&period).await?;
        let summary = publish::publish_weekly(writer.as_ref(), &report, &period, sheet).await?;
        to_json(&summary)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for InsightsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "algo-insights-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Algorand Insights MCP Server. Provides tools for network metrics, \
                 monthly and weekly comparative reports, and publishing them to spreadsheets. \
                 Dates are YYYY-MM-DD."
                    .to_string(),
            ),
        }
    }
}
