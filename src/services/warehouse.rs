//! ClickHouse analytics warehouse over its HTTP interface.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::WarehouseConfig,
    error::{AppError, Result},
    types::label,
};

/// One `(period label, value)` pair returned by a metric query.
pub type QueryRow = (String, Option<f64>);

#[derive(Debug, Deserialize)]
struct JsonCompactResponse {
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

/// Client for metric queries.
#[derive(Clone)]
pub struct WarehouseService {
    client: reqwest::Client,
    config: WarehouseConfig,
}

impl WarehouseService {
    pub fn new(client: reqwest::Client, config: WarehouseConfig) -> Self {
        Self { client, config }
    }

    /// Run a query whose rows are `(date, value)`.
    pub async fn query(&self, sql: &str) -> Result<Vec<QueryRow>> {
        debug!(sql = %sql, "Running warehouse query");

        let response = self
            .client
            .post(self.config.url())
            .basic_auth(&self.config.user, Some(&self.config.password))
            .query(&[
                ("default_format", "JSONCompact"),
                ("output_format_json_quote_64bit_integers", "0"),
            ])
            .body(sql.to_string())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Query(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }

        parse_rows(&body)
    }
}

/// Decode a `JSONCompact` body into labelled values.
pub fn parse_rows(body: &str) -> Result<Vec<QueryRow>> {
    let response: JsonCompactResponse = serde_json::from_str(body)?;
    response
        .data
        .into_iter()
        .map(|row| {
            let mut cells = row.into_iter();
            let key = cells
                .next()
                .ok_or_else(|| AppError::Query("query returned an empty row".into()))?;
            let value = cells.next().map(|v| numeric(&v)).transpose()?.flatten();
            Ok((period_key(&key), value))
        })
        .collect()
}

/// Normalise a date or datetime cell to a period label.
fn period_key(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map(label)
        .unwrap_or(raw)
}

fn numeric(value: &Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => Ok(Some(s.trim().parse::<f64>()?)),
        other => Err(AppError::Query(format!("non-numeric value {}", other))),
    }
}
