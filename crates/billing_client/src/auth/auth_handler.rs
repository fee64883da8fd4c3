use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use billing_core::{Config, JsonResource};
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use reqwest::{Method, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::diagnostics::ConnectionDiagnostics;
use crate::error::{BillingError, Result, ServiceError};
use crate::utils::http_utils::{debug_id, exchange_record};

const TOKEN_PATH: &str = "v1/oauth2/token";
/// Tokens closer than this to expiry are refreshed.
const EXPIRY_BUFFER_SECS: i64 = 60;
/// Upper bound applied to the `expires_in` the server reports.
const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

// Response of the client-credentials grant
#[derive(Debug, Serialize, Deserialize, Clone)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub nonce: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// `None` for tokens supplied through configuration.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn preset(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let lifetime = response.expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS);
        if lifetime != response.expires_in {
            warn!(
                "Token expires_in {} out of range, using {}s",
                response.expires_in, lifetime
            );
        }
        Self {
            token: response.access_token,
            expires_at: Some(now + Duration::seconds(lifetime)),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at - Duration::seconds(EXPIRY_BUFFER_SECS) > now,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Clone)]
struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

// Fetches and caches OAuth2 bearer tokens for the execution context
#[derive(Debug, Clone)]
pub struct OAuthTokenHandler {
    client: Arc<ClientWithMiddleware>,
    token_url: String,
    credentials: Option<ClientCredentials>,
    cached: Arc<Mutex<Option<AccessToken>>>,
    diagnostics: ConnectionDiagnostics,
}

impl OAuthTokenHandler {
    pub fn new(
        client: Arc<ClientWithMiddleware>,
        config: &Config,
        diagnostics: ConnectionDiagnostics,
    ) -> Result<Self> {
        let preset = config
            .access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .map(AccessToken::preset);

        let credentials = if config.has_client_credentials() {
            Some(ClientCredentials {
                client_id: config.client_id.clone().unwrap_or_default(),
                client_secret: config.client_secret.clone().unwrap_or_default(),
            })
        } else {
            None
        };

        if preset.is_none() && credentials.is_none() {
            return Err(BillingError::Config(
                "either access_token or client_id and client_secret must be configured".into(),
            ));
        }

        Ok(OAuthTokenHandler {
            client,
            token_url: format!("{}/{}", config.api_base_url(), TOKEN_PATH),
            credentials,
            cached: Arc::new(Mutex::new(preset)),
            diagnostics,
        })
    }

    /// Returns a valid bearer token, fetching a new one when the cached token
    /// is missing or about to expire.
    pub async fn access_token(&self) -> Result<String> {
        // Held across the fetch so concurrent callers wait for one exchange.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(Utc::now()) {
                return Ok(token.token.clone());
            }
            info!("Cached access token expired, requesting a new one");
        }

        let token = self.fetch_token().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drops the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if self.credentials.is_some() {
            *cached = None;
        }
    }

    pub async fn cached_token(&self) -> Option<AccessToken> {
        self.cached.lock().await.clone()
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            BillingError::Auth("access token expired and no client credentials configured".into())
        })?;

        info!("=== FETCH_ACCESS_TOKEN START ===");
        let started = Instant::now();
        let outcome = self
            .client
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header("Accept", "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(BillingError::from);
        self.diagnostics
            .record_exchange(exchange_record(&Method::POST, &self.token_url, started, &outcome));
        let response = outcome?;

        let status = response.status();
        if status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
            return Err(BillingError::ProxyAuthRequired);
        }
        if !status.is_success() {
            let debug_id = debug_id(&response);
            let body = response.text().await.unwrap_or_default();
            error!("Failed to get access token: {body} with status {status}");
            if status == StatusCode::UNAUTHORIZED {
                return Err(BillingError::Auth(format!(
                    "client credentials rejected: {body}"
                )));
            }
            return Err(BillingError::Service(ServiceError::from_body(
                status.as_u16(),
                body,
                debug_id,
            )));
        }

        let body = response.bytes().await?;
        let token_response = TokenResponse::from_slice(&body)?;
        info!(
            "Got {} token for app {:?}, expires in {}s",
            token_response.token_type, token_response.app_id, token_response.expires_in
        );
        Ok(AccessToken::from_response(token_response, Utc::now()))
    }
}
