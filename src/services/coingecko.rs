//! CoinGecko price history adapter (public CSV export).

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::Endpoints,
    error::{AppError, Result},
    services::http,
    types::label,
};

/// Coin whose history is exported.
pub const COIN_ID: &str = "algorand";

/// Column read from the price export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketField {
    #[default]
    Price,
    MarketCap,
}

impl MarketField {
    fn column(self) -> &'static str {
        match self {
            MarketField::Price => "price",
            MarketField::MarketCap => "market_cap",
        }
    }
}

impl FromStr for MarketField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "price" => Ok(MarketField::Price),
            "market_cap" | "mcap" => Ok(MarketField::MarketCap),
            other => Err(format!("Invalid field '{}'. Expected 'price' or 'market_cap'", other)),
        }
    }
}

/// Client for the CoinGecko CSV export.
#[derive(Clone)]
pub struct CoinGeckoService {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl CoinGeckoService {
    pub fn new(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// USD price or market cap snapped on `date`.
    pub async fn market_value(&self, date: NaiveDate, field: MarketField) -> Result<f64> {
        let url = format!("{}/price_charts/export/{}/usd.csv", self.endpoints.coingecko, COIN_ID);
        debug!(url = %url, date = %date, field = ?field, "Fetching price export");

        let body = http::send(self.client.get(&url)).await?.text().await?;
        parse_price_export(&body, date, field)
    }
}

/// Read `field` from the row whose `snapped_at` falls on `date`.
///
/// `snapped_at` looks like `2024-01-31 00:00:00 UTC`.
pub fn parse_price_export(csv_text: &str, date: NaiveDate, field: MarketField) -> Result<f64> {
    let missing = || AppError::MissingData(format!("{} on {}", field.column(), label(date)));

    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let headers = reader.headers()?.clone();
    let snapped_col = headers
        .iter()
        .position(|h| h.trim() == "snapped_at")
        .ok_or_else(|| AppError::Parse("price export has no snapped_at column".into()))?;
    let value_col = headers
        .iter()
        .position(|h| h.trim() == field.column())
        .ok_or_else(|| AppError::Parse(format!("price export has no {} column", field.column())))?;

    for record in reader.records() {
        let record = record?;
        let snapped = record.get(snapped_col).unwrap_or_default();
        let Some(day) = snapped.get(..10) else { continue };
        if NaiveDate::parse_from_str(day, "%Y-%m-%d").ok() != Some(date) {
            continue;
        }
        let raw = record.get(value_col).map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(missing());
        }
        return Ok(raw.parse::<f64>()?);
    }

    Err(missing())
}
