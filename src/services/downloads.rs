//! Package download counters: npm registry and the PyPI dataset on BigQuery.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    config::Endpoints,
    error::{AppError, Result},
    services::{google::GoogleAuth, http},
    types::{label, week_range},
};

/// npm package whose downloads are counted.
pub const NPM_PACKAGE: &str = "@algorandfoundation/algokit-utils";

/// Column holding the PyPI count in the BigQuery result.
pub const PYTHON_DOWNLOADS_FIELD: &str = "python_downloads";

#[derive(Debug, Deserialize)]
struct NpmPointResponse {
    downloads: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BigQueryResponse {
    #[serde(default)]
    job_complete: bool,
    schema: Option<BigQuerySchema>,
    #[serde(default)]
    rows: Vec<BigQueryRow>,
}

#[derive(Debug, Deserialize)]
struct BigQuerySchema {
    fields: Vec<BigQueryField>,
}

#[derive(Debug, Deserialize)]
struct BigQueryField {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BigQueryRow {
    f: Vec<BigQueryCell>,
}

#[derive(Debug, Deserialize)]
struct BigQueryCell {
    v: Value,
}

/// Client for the download counters.
#[derive(Clone)]
pub struct DownloadsService {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl DownloadsService {
    pub fn new(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// npm downloads over the Monday–Sunday week containing `date`.
    pub async fn npm_downloads(&self, date: NaiveDate) -> Result<f64> {
        let (start, end) = week_range(date);
        let url = format!(
            "{}/downloads/point/{}:{}/{}",
            self.endpoints.npm,
            label(start),
            label(end),
            encode_package(NPM_PACKAGE)
        );
        debug!(url = %url, "Fetching npm downloads");

        let body: NpmPointResponse = http::send(self.client.get(&url)).await?.json().await?;
        body.downloads.ok_or_else(|| {
            AppError::MissingData(format!("npm downloads for week of {}", label(date)))
        })
    }

    /// Run a BigQuery job and read `python_downloads` from its first row.
    pub async fn python_downloads(
        &self,
        auth: &GoogleAuth,
        project: &str,
        sql: &str,
    ) -> Result<f64> {
        let url = format!("{}/bigquery/v2/projects/{}/queries", self.endpoints.bigquery, project);
        debug!(project = %project, "Running BigQuery downloads job");

        let token = auth.access_token().await?;
        let request = self.client.post(&url).bearer_auth(token).json(&json!({
            "query": sql,
            "useLegacySql": false,
            "timeoutMs": 60000,
        }));
        let body: BigQueryResponse = http::send(request).await?.json().await?;
        read_python_downloads(body)
    }
}

fn read_python_downloads(body: BigQueryResponse) -> Result<f64> {
    if !body.job_complete {
        return Err(AppError::Query("BigQuery job did not complete in time".into()));
    }

    let column = body
        .schema
        .as_ref()
        .and_then(|s| s.fields.iter().position(|f| f.name == PYTHON_DOWNLOADS_FIELD))
        .ok_or_else(|| {
            AppError::Query(format!("result has no {} column", PYTHON_DOWNLOADS_FIELD))
        })?;

    let cell = body
        .rows
        .first()
        .and_then(|row| row.f.get(column))
        .ok_or_else(|| AppError::MissingData(PYTHON_DOWNLOADS_FIELD.into()))?;

    match &cell.v {
        Value::String(s) => Ok(s.trim().parse::<f64>()?),
        Value::Number(n) => n.as_f64().ok_or_else(|| AppError::Parse(n.to_string())),
        _ => Err(AppError::MissingData(PYTHON_DOWNLOADS_FIELD.into())),
    }
}

/// Scoped package names are path-encoded (`@` and `/`).
fn encode_package(name: &str) -> String {
    name.replace('@', "%40").replace('/', "%2F")
}
