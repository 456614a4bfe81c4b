//! Developer-activity feed: a JSON object of active developers keyed by week.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{AppError, Result},
    services::http,
    types::label,
};

/// Client for the developer-activity feed.
#[derive(Clone)]
pub struct ActiveDevsService {
    client: reqwest::Client,
}

impl ActiveDevsService {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Active developers for the week labelled `week`.
    pub async fn active_devs(&self, feed_url: &str, week: NaiveDate) -> Result<f64> {
        debug!(url = %feed_url, week = %week, "Fetching active developers");
        let feed: Value = http::send(self.client.get(feed_url)).await?.json().await?;
        lookup_week(&feed, week)
    }
}

fn lookup_week(feed: &Value, week: NaiveDate) -> Result<f64> {
    let key = label(week);
    match feed.get(&key) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| AppError::Parse(n.to_string())),
        Some(Value::String(s)) => Ok(s.trim().parse::<f64>()?),
        _ => Err(AppError::MissingData(format!("active_devs for {}", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_week() {
        let feed = json!({"2024-01-07": 312, "2024-01-14": "298"});
        let week = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(lookup_week(&feed, week).unwrap(), 312.0);
        let next = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        assert_eq!(lookup_week(&feed, next).unwrap(), 298.0);
    }

    #[test]
    fn test_lookup_missing_week() {
        let feed = json!({"2024-01-07": 312});
        let week = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();
        assert!(matches!(lookup_week(&feed, week), Err(AppError::MissingData(_))));
    }
}
