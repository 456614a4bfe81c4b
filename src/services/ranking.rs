//! Market-cap ranking scraped from CoinMarketCap historical snapshots.

use chrono::NaiveDate;
use scraper::{Html, Selector};
use tracing::debug;

use crate::{
    config::Endpoints,
    error::{AppError, Result},
    services::http,
};

/// Name looked up in the snapshot table.
pub const COIN_NAME: &str = "Algorand";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";
const TOP_N: usize = 100;

/// Client for the historical snapshot pages.
#[derive(Clone)]
pub struct RankingService {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl RankingService {
    pub fn new(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// 1-based market-cap rank of [`COIN_NAME`] on `date`.
    pub async fn rank(&self, date: NaiveDate) -> Result<f64> {
        let url = format!("{}/historical/{}/", self.endpoints.coinmarketcap, date.format("%Y%m%d"));
        debug!(url = %url, "Fetching historical ranking");

        let request = self.client.get(&url).header("User-Agent", BROWSER_USER_AGENT);
        let html = http::send(request).await?.text().await?;

        let names = top_names(&html)?;
        names
            .iter()
            .position(|n| n == COIN_NAME)
            .map(|i| (i + 1) as f64)
            .ok_or_else(|| {
                AppError::MissingData(format!("{} not in top {} on {}", COIN_NAME, TOP_N, date))
            })
    }
}

/// Coin names of the first hundred table rows.
///
/// Linked names carry a `title` on the server-rendered rows; lazily rendered
/// rows only have the link text.
pub fn top_names(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let row_selector = selector("tr.cmc-table-row")?;
    let link_selector = selector("a.cmc-link")?;

    let names = document
        .select(&row_selector)
        .take(TOP_N)
        .filter_map(|row| {
            let link = row.select(&link_selector).next()?;
            let name = match link.value().attr("title") {
                Some(title) => title.trim().to_string(),
                None => link.text().collect::<String>().trim().to_string(),
            };
            (!name.is_empty()).then_some(name)
        })
        .collect();

    Ok(names)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Parse(format!("selector '{}': {}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <table><tbody>
          <tr class="cmc-table-row"><td><a class="cmc-link" title="Bitcoin" href="/currencies/bitcoin/">BTC</a></td></tr>
          <tr class="cmc-table-row"><td><a class="cmc-link" title="Ethereum" href="/currencies/ethereum/">ETH</a></td></tr>
          <tr class="cmc-table-row"><td><span>no link</span></td></tr>
          <tr class="sc-row cmc-table-row"><td><a class="cmc-link" href="/currencies/algorand/"> Algorand </a></td></tr>
        </tbody></table>
    "#;

    #[test]
    fn test_top_names_prefers_title_then_text() {
        let names = top_names(PAGE).unwrap();
        assert_eq!(names, vec!["Bitcoin", "Ethereum", "Algorand"]);
    }

    #[test]
    fn test_top_names_empty_page() {
        assert!(top_names("<html><body></body></html>").unwrap().is_empty());
    }
}
