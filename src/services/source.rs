//! The adapter seam used by the report assemblers.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    config::{need, Config},
    error::{AppError, Result},
    services::{
        coingecko::{CoinGeckoService, MarketField},
        defillama::DefiLlamaService,
        devs::ActiveDevsService,
        downloads::DownloadsService,
        google::GoogleAuth,
        http,
        nodes::NodesService,
        ranking::RankingService,
        warehouse::{QueryRow, WarehouseService},
    },
};

/// Every external value a report can ask for.
///
/// Calls are issued one after another by the assemblers; implementations
/// need not be concurrency-aware beyond `Send + Sync`.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Chain TVL in USD.
    async fn chain_tvl(&self, date: NaiveDate) -> Result<f64>;

    /// Coin price or market cap in USD.
    async fn market_value(&self, date: NaiveDate, field: MarketField) -> Result<f64>;

    /// Combined stablecoin market cap in USD.
    async fn stables_mcap(&self, date: NaiveDate) -> Result<f64>;

    /// Combined RWA protocol TVL in USD.
    async fn rwa_tvl(&self, date: NaiveDate) -> Result<f64>;

    /// Warehouse query returning `(date, value)` rows.
    async fn query(&self, sql: &str) -> Result<Vec<QueryRow>>;

    /// Unique node IPs.
    async fn node_count(&self, date: NaiveDate) -> Result<f64>;

    /// PyPI downloads from a BigQuery statement.
    async fn python_downloads(&self, sql: &str) -> Result<f64>;

    /// npm downloads over the week containing `date`.
    async fn npm_downloads(&self, date: NaiveDate) -> Result<f64>;

    /// Active developers for the week labelled `week`.
    async fn active_devs(&self, week: NaiveDate) -> Result<f64>;

    /// Market-cap rank.
    async fn market_rank(&self, date: NaiveDate) -> Result<f64>;
}

/// Production adapters over HTTP.
#[derive(Clone)]
pub struct HttpMetricSource {
    defillama: DefiLlamaService,
    coingecko: CoinGeckoService,
    warehouse: WarehouseService,
    nodes: NodesService,
    downloads: DownloadsService,
    devs: ActiveDevsService,
    ranking: RankingService,
    google: Option<GoogleAuth>,
    project_id: Option<String>,
    active_devs_url: Option<String>,
}

impl HttpMetricSource {
    /// Build all adapters. No network calls are made here.
    pub fn new(config: &Config) -> Result<Self> {
        let client = http::build_client()?;
        let endpoints = config.endpoints.clone();

        let google = config
            .google_credentials
            .as_ref()
            .map(|path| GoogleAuth::from_key_file(client.clone(), path))
            .transpose()?;

        Ok(Self {
            defillama: DefiLlamaService::new(client.clone(), endpoints.clone()),
            coingecko: CoinGeckoService::new(client.clone(), endpoints.clone()),
            warehouse: WarehouseService::new(client.clone(), config.warehouse.clone()),
            nodes: NodesService::new(
                client.clone(),
                endpoints.clone(),
                config.nodely_user.clone(),
                config.nodely_password.clone(),
            ),
            downloads: DownloadsService::new(client.clone(), endpoints.clone()),
            devs: ActiveDevsService::new(client.clone()),
            ranking: RankingService::new(client, endpoints),
            google,
            project_id: config.project_id.clone(),
            active_devs_url: config.active_devs_url.clone(),
        })
    }

    /// Google credentials shared with the sheet publishers.
    pub fn google_auth(&self) -> Option<&GoogleAuth> {
        self.google.as_ref()
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn chain_tvl(&self, date: NaiveDate) -> Result<f64> {
        self.defillama.chain_tvl(date).await
    }

    async fn market_value(&self, date: NaiveDate, field: MarketField) -> Result<f64> {
        self.coingecko.market_value(date, field).await
    }

    async fn stables_mcap(&self, date: NaiveDate) -> Result<f64> {
        self.defillama.stables_mcap(date).await
    }

    async fn rwa_tvl(&self, date: NaiveDate) -> Result<f64> {
        self.defillama.rwa_tvl(date).await
    }

    async fn query(&self, sql: &str) -> Result<Vec<QueryRow>> {
        self.warehouse.query(sql).await
    }

    async fn node_count(&self, date: NaiveDate) -> Result<f64> {
        self.nodes.node_count(date).await
    }

    async fn python_downloads(&self, sql: &str) -> Result<f64> {
        let auth = self.google.as_ref().ok_or_else(|| {
            AppError::Config("GOOGLE_APPLICATION_CREDENTIALS environment variable not set".into())
        })?;
        let project = need(&self.project_id, "PROJECT_ID")?;
        self.downloads.python_downloads(auth, project, sql).await
    }

    async fn npm_downloads(&self, date: NaiveDate) -> Result<f64> {
        self.downloads.npm_downloads(date).await
    }

    async fn active_devs(&self, week: NaiveDate) -> Result<f64> {
        let url = need(&self.active_devs_url, "ACTIVE_DEVS_URL")?;
        self.devs.active_devs(url, week).await
    }

    async fn market_rank(&self, date: NaiveDate) -> Result<f64> {
        self.ranking.rank(date).await
    }
}
