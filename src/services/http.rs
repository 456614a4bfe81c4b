//! Shared HTTP plumbing for the source adapters.

use std::time::Duration;

use reqwest::{header::RETRY_AFTER, RequestBuilder, Response, StatusCode};
use tracing::warn;

use crate::error::{AppError, Result};

/// Wait applied when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// User agent sent to the DefiLlama and CoinMarketCap endpoints.
pub const SCRAPER_USER_AGENT: &str = "Price Scrapper";

/// Build the shared HTTP client.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| AppError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// Send a request and fail on non-success status.
pub async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await?;
    ensure_success(response)
}

/// Send a request, retrying exactly once after a 429.
///
/// The retry waits for the `Retry-After` seconds given by the server.
/// Whatever the second attempt returns is final.
pub async fn send_with_retry(request: RequestBuilder) -> Result<Response> {
    let retry = request.try_clone();
    let response = request.send().await?;

    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return ensure_success(response);
    }

    let Some(retry) = retry else {
        return ensure_success(response);
    };

    let delay = retry_after(&response);
    warn!(url = %response.url(), delay_secs = delay.as_secs(), "Rate limited, retrying once");
    tokio::time::sleep(delay).await;

    let response = retry.send().await?;
    ensure_success(response)
}

/// Delay requested by a rate-limited response.
pub fn retry_after(response: &Response) -> Duration {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(AppError::Http { status: status.as_u16(), url: response.url().to_string() })
    }
}
