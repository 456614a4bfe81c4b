//! Node-count adapter (Nodely analytics API).

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::Endpoints,
    error::{AppError, Result},
    services::http,
    types::label,
};

#[derive(Debug, Deserialize)]
struct NodesResponse {
    unique_ips: Option<f64>,
}

/// Client for the node-count endpoint.
#[derive(Clone)]
pub struct NodesService {
    client: reqwest::Client,
    endpoints: Endpoints,
    user: String,
    password: String,
}

impl NodesService {
    pub fn new(
        client: reqwest::Client,
        endpoints: Endpoints,
        user: String,
        password: String,
    ) -> Self {
        Self { client, endpoints, user, password }
    }

    /// Unique node IPs seen on `date`.
    pub async fn node_count(&self, date: NaiveDate) -> Result<f64> {
        let url = format!("{}/v1/env/network/nodes/{}", self.endpoints.nodely, label(date));
        debug!(url = %url, "Fetching node count");

        let request = self.client.get(&url).basic_auth(&self.user, Some(&self.password));
        let body: NodesResponse = http::send(request).await?.json().await?;
        body.unique_ips
            .ok_or_else(|| AppError::MissingData(format!("nodes on {}", label(date))))
    }
}
