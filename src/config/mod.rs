//! Configuration management module.
//!
//! Handles loading configuration from environment variables.

use std::{env, path::PathBuf, time::Duration};

use crate::error::AppError;

/// Default monthly query catalog location.
pub const DEFAULT_MONTHLY_QUERIES: &str = "docs/algo_insights/queries.yaml";

/// Default weekly query catalog location.
pub const DEFAULT_WEEKLY_QUERIES: &str = "docs/kpis/queries.yaml";

/// Base URLs of every upstream the adapters talk to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// DefiLlama main API (chain dataset, protocols).
    pub defillama: String,
    /// DefiLlama stablecoins API.
    pub stablecoins: String,
    /// CoinGecko site (CSV export).
    pub coingecko: String,
    /// Nodely analytics API.
    pub nodely: String,
    /// npm downloads API.
    pub npm: String,
    /// BigQuery REST API.
    pub bigquery: String,
    /// CoinMarketCap site (historical snapshots).
    pub coinmarketcap: String,
    /// Google Sheets REST API.
    pub sheets: String,
    /// Pause between consecutive per-protocol fetches.
    pub request_spacing: Duration,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            defillama: "https://api.llama.fi".to_string(),
            stablecoins: "https://stablecoins.llama.fi".to_string(),
            coingecko: "https://www.coingecko.com".to_string(),
            nodely: "https://algoanalytics.api.nodely.io".to_string(),
            npm: "https://api.npmjs.org".to_string(),
            bigquery: "https://bigquery.googleapis.com".to_string(),
            coinmarketcap: "https://coinmarketcap.com".to_string(),
            sheets: "https://sheets.googleapis.com".to_string(),
            request_spacing: Duration::from_millis(500),
        }
    }
}

/// ClickHouse connection settings.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl WarehouseConfig {
    /// HTTP interface URL.
    pub fn url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Analytics warehouse connection.
    pub warehouse: WarehouseConfig,
    /// Nodely API basic-auth user.
    pub nodely_user: String,
    /// Nodely API basic-auth password.
    pub nodely_password: String,
    /// Developer-activity feed URL.
    pub active_devs_url: Option<String>,
    /// Google Cloud project for BigQuery jobs.
    pub project_id: Option<String>,
    /// Service-account credentials JSON file.
    pub google_credentials: Option<PathBuf>,
    /// Spreadsheet receiving the monthly insights summary.
    pub insights_spreadsheet_id: Option<String>,
    /// Spreadsheet receiving weekly KPI rows.
    pub kpis_spreadsheet_id: Option<String>,
    /// Monthly query catalog.
    pub monthly_queries: PathBuf,
    /// Weekly query catalog.
    pub weekly_queries: PathBuf,
    /// Upstream base URLs.
    pub endpoints: Endpoints,
    /// Logging level (default: info).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `DB_HOST`, `DB_USER`, `DB_PASS`: ClickHouse warehouse credentials
    /// - `NODELY_API_USER`, `NODELY_API_PASS`: node-count API credentials
    ///
    /// Optional environment variables:
    /// - `DB_PORT`: ClickHouse HTTP port (default: 8123)
    /// - `ACTIVE_DEVS_URL`: developer-activity feed
    /// - `PROJECT_ID`: BigQuery project for PyPI downloads
    /// - `GOOGLE_APPLICATION_CREDENTIALS`: service-account JSON file
    /// - `INSIGHTS_SPREADSHEET_ID`, `KPIS_SPREADSHEET_ID`: publish targets
    /// - `MONTHLY_QUERIES_PATH`, `WEEKLY_QUERIES_PATH`: query catalogs
    /// - `LOG_LEVEL`: Logging level (default: info)
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let port = match optional("DB_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("Invalid DB_PORT '{}': {}", raw, e)))?,
            None => 8123,
        };

        let warehouse = WarehouseConfig {
            host: required("DB_HOST")?,
            port,
            user: required("DB_USER")?,
            password: required("DB_PASS")?,
        };

        Ok(Self {
            warehouse,
            nodely_user: required("NODELY_API_USER")?,
            nodely_password: required("NODELY_API_PASS")?,
            active_devs_url: optional("ACTIVE_DEVS_URL"),
            project_id: optional("PROJECT_ID"),
            google_credentials: optional("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
            insights_spreadsheet_id: optional("INSIGHTS_SPREADSHEET_ID"),
            kpis_spreadsheet_id: optional("KPIS_SPREADSHEET_ID"),
            monthly_queries: optional("MONTHLY_QUERIES_PATH")
                .unwrap_or_else(|| DEFAULT_MONTHLY_QUERIES.to_string())
                .into(),
            weekly_queries: optional("WEEKLY_QUERIES_PATH")
                .unwrap_or_else(|| DEFAULT_WEEKLY_QUERIES.to_string())
                .into(),
            endpoints: Endpoints::default(),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Config(format!("{} environment variable not set", name)))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Unwrap an optional setting for a tool that needs it.
pub fn need<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .ok_or_else(|| AppError::Config(format!("{} environment variable not set", name)))
}
