//! Spreadsheet access (Google Sheets v4 REST API).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    error::{AppError, Result},
    services::{google::GoogleAuth, http},
    types::{CellUpdate, CellValue},
};

/// Cell-addressed spreadsheet operations used by the publishers.
///
/// Implemented by [`GoogleSheetsClient`]; tests substitute an in-memory
/// recorder.
#[async_trait]
pub trait SheetWriter: Send + Sync {
    /// Create a new tab.
    async fn add_sheet(&self, title: &str, rows: u32, cols: u32) -> Result<()>;

    /// Write individual cells of a tab.
    async fn write_cells(&self, sheet: &str, updates: &[CellUpdate]) -> Result<()>;

    /// All rows of a tab as displayed text.
    async fn read_values(&self, sheet: &str) -> Result<Vec<Vec<String>>>;

    /// Write `values` left to right starting at column A of 1-based `row`.
    async fn write_row(&self, sheet: &str, row: usize, values: &[CellValue]) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Sheets API client bound to one spreadsheet.
#[derive(Clone)]
pub struct GoogleSheetsClient {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    auth: GoogleAuth,
}

impl GoogleSheetsClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        auth: GoogleAuth,
    ) -> Self {
        Self { client, base_url: base_url.into(), spreadsheet_id: spreadsheet_id.into(), auth }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}/values", self.spreadsheet_url()))
            .map_err(|e| AppError::Config(format!("Invalid Sheets URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("Sheets URL cannot be a base".into()))?
            .push(range);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let token = self.auth.access_token().await?;
        http::send(request.bearer_auth(token)).await.map_err(|e| AppError::Sheet(e.to_string()))
    }
}

#[async_trait]
impl SheetWriter for GoogleSheetsClient {
    async fn add_sheet(&self, title: &str, rows: u32, cols: u32) -> Result<()> {
        debug!(title = %title, "Adding sheet");
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": {"rowCount": rows, "columnCount": cols}
                    }
                }
            }]
        });
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn write_cells(&self, sheet: &str, updates: &[CellUpdate]) -> Result<()> {
        debug!(sheet = %sheet, cells = updates.len(), "Writing cells");
        let data: Vec<Value> = updates
            .iter()
            .map(|u| json!({"range": a1(sheet, &u.cell), "values": [[u.value.to_json()]]}))
            .collect();
        let body = json!({"valueInputOption": "USER_ENTERED", "data": data});
        let url = format!("{}/values:batchUpdate", self.spreadsheet_url());
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn read_values(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        let url = self.values_url(&quote_sheet(sheet))?;
        let range: ValueRange = self.send(self.client.get(url)).await?.json().await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect())
    }

    async fn write_row(&self, sheet: &str, row: usize, values: &[CellValue]) -> Result<()> {
        debug!(sheet = %sheet, row, "Writing row");
        let range = a1(sheet, &format!("A{}", row));
        let url = self.values_url(&range)?;
        let cells: Vec<Value> = values.iter().map(CellValue::to_json).collect();
        let body = json!({"range": range, "majorDimension": "ROWS", "values": [cells]});
        let request =
            self.client.put(url).query(&[("valueInputOption", "USER_ENTERED")]).json(&body);
        self.send(request).await?;
        Ok(())
    }
}

/// Tab name quoted for A1 notation.
fn quote_sheet(sheet: &str) -> String {
    format!("'{}'", sheet.replace('\'', "''"))
}

fn a1(sheet: &str, cell: &str) -> String {
    format!("{}!{}", quote_sheet(sheet), cell)
}
