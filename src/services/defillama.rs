//! DefiLlama adapters: chain TVL, stablecoin supply and RWA protocol TVL.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::Endpoints,
    error::{AppError, Result},
    services::http::{self, SCRAPER_USER_AGENT},
    types::label,
};

/// Chain whose figures are reported.
pub const CHAIN: &str = "algorand";

/// Stablecoins tracked on the chain, by DefiLlama stablecoin id.
pub const STABLECOINS: [(&str, u32); 6] = [
    ("usdt", 1),
    ("usdc", 2),
    ("eurd", 161),
    ("stbl", 38),
    ("eurs", 51),
    ("monerium", 101),
];

/// RWA protocols tracked on the chain, by DefiLlama protocol slug.
pub const RWA_PROTOCOLS: [(&str, &str); 4] = [
    ("lofty", "lofty"),
    ("asa_gold", "asa.gold"),
    ("meld", "meld%20gold"),
    ("vesta", "vesta%20equity"),
];

const CHAIN_DATASET_FLAGS: &str = "pool2=true&staking=true&borrowed=true&doublecounted=true\
&liquidstaking=true&vesting=true&govtokens=true";

/// A date-keyed daily series.
pub type DailySeries = BTreeMap<NaiveDate, f64>;

#[derive(Debug, Deserialize)]
struct StablecoinPoint {
    date: Value,
    #[serde(rename = "totalCirculatingUSD", default)]
    total_circulating_usd: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ProtocolResponse {
    #[serde(default)]
    tvl: Vec<ProtocolTvlPoint>,
}

#[derive(Debug, Deserialize)]
struct ProtocolTvlPoint {
    date: Value,
    #[serde(rename = "totalLiquidityUSD", default)]
    total_liquidity_usd: Option<Value>,
}

/// Client for the DefiLlama APIs.
#[derive(Clone)]
pub struct DefiLlamaService {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl DefiLlamaService {
    pub fn new(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// Total chain TVL in USD on `date`.
    pub async fn chain_tvl(&self, date: NaiveDate) -> Result<f64> {
        let url = format!(
            "{}/simpleChainDataset/{}?{}",
            self.endpoints.defillama, CHAIN, CHAIN_DATASET_FLAGS
        );
        debug!(url = %url, date = %date, "Fetching chain TVL dataset");

        let body = http::send(self.client.get(&url)).await?.text().await?;
        parse_chain_tvl(&body, date)
    }

    /// Combined stablecoin market cap in USD on `date`.
    pub async fn stables_mcap(&self, date: NaiveDate) -> Result<f64> {
        let mut series = Vec::with_capacity(STABLECOINS.len());
        for (i, (name, id)) in STABLECOINS.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.endpoints.request_spacing).await;
            }
            series.push(self.stablecoin_series(name, *id).await?);
        }
        value_on(&merge_sum(&series), date, "stables_mcap")
    }

    /// Combined RWA protocol TVL in USD on `date`.
    pub async fn rwa_tvl(&self, date: NaiveDate) -> Result<f64> {
        let mut series = Vec::with_capacity(RWA_PROTOCOLS.len());
        for (i, (name, slug)) in RWA_PROTOCOLS.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.endpoints.request_spacing).await;
            }
            series.push(self.protocol_series(name, slug).await?);
        }
        value_on(&merge_sum(&series), date, "rwa_tvl")
    }

    /// Circulating USD supply of one stablecoin on the chain.
    pub async fn stablecoin_series(&self, name: &str, id: u32) -> Result<DailySeries> {
        let url =
            format!("{}/stablecoincharts/{}?stablecoin={}", self.endpoints.stablecoins, CHAIN, id);
        let request = self.client.get(&url).header("User-agent", SCRAPER_USER_AGENT);

        let points: Vec<StablecoinPoint> = http::send_with_retry(request).await?.json().await?;
        let series = points
            .iter()
            .filter_map(|p| {
                Some((unix_date(&p.date)?, pegged_usd(p.total_circulating_usd.as_ref()?)?))
            })
            .collect::<DailySeries>();

        debug!(stablecoin = name, records = series.len(), "Fetched stablecoin series");
        Ok(series)
    }

    /// Liquidity TVL of one protocol.
    pub async fn protocol_series(&self, name: &str, slug: &str) -> Result<DailySeries> {
        let url = format!("{}/protocol/{}", self.endpoints.defillama, slug);
        let request = self.client.get(&url).header("User-agent", SCRAPER_USER_AGENT);

        let body: ProtocolResponse = http::send_with_retry(request).await?.json().await?;
        let series = body
            .tvl
            .iter()
            .filter_map(|p| {
                Some((unix_date(&p.date)?, pegged_usd(p.total_liquidity_usd.as_ref()?)?))
            })
            .collect::<DailySeries>();

        debug!(protocol = name, records = series.len(), "Fetched protocol TVL series");
        Ok(series)
    }
}

/// Value of the `Total` row in the column for `date` of the chain CSV.
///
/// Columns after `Protocol` are `dd/mm/yyyy` dates.
pub fn parse_chain_tvl(csv_text: &str, date: NaiveDate) -> Result<f64> {
    let missing = || AppError::MissingData(format!("chain TVL on {}", label(date)));

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(csv_text.as_bytes());
    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| NaiveDate::parse_from_str(h.trim(), "%d/%m/%Y").ok() == Some(date))
        .ok_or_else(missing)?;

    for record in reader.records() {
        let record = record?;
        if record.get(0).map(str::trim) != Some("Total") {
            continue;
        }
        let raw = record.get(column).map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(missing());
        }
        return Ok(raw.parse::<f64>()?);
    }

    Err(missing())
}

/// Outer-join several series on date, treating gaps as zero, and sum them.
pub fn merge_sum(series: &[DailySeries]) -> DailySeries {
    let mut merged = DailySeries::new();
    for s in series {
        for (date, value) in s {
            *merged.entry(*date).or_insert(0.0) += value;
        }
    }
    merged
}

fn value_on(series: &DailySeries, date: NaiveDate, metric: &str) -> Result<f64> {
    series
        .get(&date)
        .copied()
        .ok_or_else(|| AppError::MissingData(format!("{} on {}", metric, label(date))))
}

/// Unix seconds (number or numeric string) to a UTC calendar date.
fn unix_date(value: &Value) -> Option<NaiveDate> {
    let secs = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

/// `{"peggedUSD": x}` or a bare number.
fn pegged_usd(value: &Value) -> Option<f64> {
    match value {
        Value::Object(map) => map.get("peggedUSD").and_then(Value::as_f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
