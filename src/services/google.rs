//! Google service-account OAuth for the Sheets and BigQuery APIs.

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    error::{AppError, Result},
    services::http,
};

/// Scopes requested for every token.
pub const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/bigquery";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: u64 = 3600;
/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Fields used from a service-account key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Token held until shortly before expiry.
pub struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Source of bearer tokens for Google APIs.
#[derive(Clone)]
pub enum GoogleAuth {
    /// JWT-bearer exchange with a service-account key.
    ServiceAccount {
        client: reqwest::Client,
        key: Arc<ServiceAccountKey>,
        cache: Arc<Mutex<Option<CachedToken>>>,
    },
    /// Fixed token, e.g. from `gcloud auth print-access-token`.
    Static(String),
}

impl GoogleAuth {
    /// Load a service-account key file.
    pub fn from_key_file(client: reqwest::Client, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        let key: ServiceAccountKey = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("Invalid credentials file: {}", e)))?;
        info!(account = %key.client_email, "Loaded Google service account");
        Ok(Self::ServiceAccount { client, key: Arc::new(key), cache: Arc::new(Mutex::new(None)) })
    }

    /// A bearer token valid for at least the next minute.
    pub async fn access_token(&self) -> Result<String> {
        match self {
            GoogleAuth::Static(token) => Ok(token.clone()),
            GoogleAuth::ServiceAccount { client, key, cache } => {
                let mut guard = cache.lock().await;
                if let Some(cached) = guard.as_ref() {
                    if cached.expires_at > Instant::now() + EXPIRY_MARGIN {
                        return Ok(cached.token.clone());
                    }
                }

                let fresh = exchange(client, key).await?;
                let token = fresh.token.clone();
                *guard = Some(fresh);
                Ok(token)
            }
        }
    }
}

async fn exchange(client: &reqwest::Client, key: &ServiceAccountKey) -> Result<CachedToken> {
    debug!(token_uri = %key.token_uri, "Exchanging service-account assertion");

    let assertion = signed_assertion(key, unix_now())?;
    let request = client.post(&key.token_uri).form(&[
        ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
        ("assertion", assertion.as_str()),
    ]);

    let body: TokenResponse = http::send(request)
        .await
        .map_err(|e| AppError::Auth(format!("token exchange failed: {}", e)))?
        .json()
        .await?;

    let lifetime = body.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
    Ok(CachedToken {
        token: body.access_token,
        expires_at: Instant::now() + Duration::from_secs(lifetime),
    })
}

/// RS256-signed JWT asserting the service account for [`SCOPES`].
pub fn signed_assertion(key: &ServiceAccountKey, now: u64) -> Result<String> {
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat: now,
        exp: now + TOKEN_LIFETIME_SECS,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?)
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
