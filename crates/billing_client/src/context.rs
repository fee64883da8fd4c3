use std::sync::Arc;
use std::time::{Duration, Instant};

use billing_core::config::{Config, ProxyAuth};
use log::{info, warn};
use reqwest::{Client, Method, Proxy, Response, StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Serialize;

use crate::api::plans::PlanClient;
use crate::auth::OAuthTokenHandler;
use crate::diagnostics::ConnectionDiagnostics;
use crate::error::{BillingError, Result};
use crate::utils::http_utils::{exchange_record, execute_request};

const USER_AGENT: &str = concat!("billing-client-rust/", env!("CARGO_PKG_VERSION"));

fn apply_proxy_auth(proxy: Proxy, auth: Option<&ProxyAuth>) -> Proxy {
    let Some(auth) = auth else {
        return proxy;
    };
    if auth.username.is_empty() {
        return proxy;
    }
    proxy.basic_auth(&auth.username, &auth.password)
}

/// Authenticated execution context shared by every remote operation.
///
/// Cloning is cheap: the HTTP client, token cache and diagnostics are shared.
#[derive(Debug, Clone)]
pub struct ApiContext {
    client: Arc<ClientWithMiddleware>,
    config: Config,
    base_url: String,
    auth: OAuthTokenHandler,
    diagnostics: ConnectionDiagnostics,
    request_id: Option<String>,
}

impl ApiContext {
    pub fn new(config: Config) -> Result<Self> {
        let client = Self::build_http_client(&config)?;
        let retry_client = Self::build_retry_client(client, config.max_retries);
        let shared_client = Arc::new(retry_client);
        let diagnostics = ConnectionDiagnostics::new();

        let auth = OAuthTokenHandler::new(Arc::clone(&shared_client), &config, diagnostics.clone())?;
        let base_url = config.api_base_url();
        info!("Billing API context targeting {}", base_url);

        Ok(ApiContext {
            client: shared_client,
            config,
            base_url,
            auth,
            diagnostics,
            request_id: None,
        })
    }

    /// Context built from `Config::new()` (files and environment).
    pub fn from_env() -> Result<Self> {
        Self::new(Config::new())
    }

    /// Sends every creation request with this `PayPal-Request-Id` instead of a
    /// fresh one, so the service treats repeats as the same request.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    fn build_http_client(config: &Config) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout());
        if !config.http_proxy.is_empty() {
            let mut proxy = Proxy::http(&config.http_proxy)
                .map_err(|e| BillingError::Config(format!("invalid http_proxy: {e}")))?;
            proxy = apply_proxy_auth(proxy, config.http_proxy_auth.as_ref());
            builder = builder.proxy(proxy);
        }
        if !config.https_proxy.is_empty() {
            let mut proxy = Proxy::https(&config.https_proxy)
                .map_err(|e| BillingError::Config(format!("invalid https_proxy: {e}")))?;
            proxy = apply_proxy_auth(proxy, config.https_proxy_auth.as_ref());
            builder = builder.proxy(proxy);
        }
        builder
            .build()
            .map_err(|e| BillingError::Config(format!("Failed to build HTTP client: {e}")))
    }

    fn build_retry_client(client: Client, max_retries: u32) -> ClientWithMiddleware {
        // Exponential backoff from 500ms, capped at 30s, with jitter
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_secs(30))
            .build_with_max_retries(max_retries);

        ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn diagnostics(&self) -> &ConnectionDiagnostics {
        &self.diagnostics
    }

    pub fn auth(&self) -> &OAuthTokenHandler {
        &self.auth
    }

    pub fn plans(&self) -> PlanClient<'_> {
        PlanClient::new(self)
    }

    /// URL of `path` under the API base. `resource_id` is appended as a
    /// single percent-encoded segment.
    pub(crate) fn endpoint(&self, path: &str, resource_id: Option<&str>) -> Result<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_matches('/'));
        let mut url = Url::parse(&joined)
            .map_err(|e| BillingError::Config(format!("invalid API URL {joined}: {e}")))?;
        if let Some(resource_id) = resource_id {
            url.path_segments_mut()
                .map_err(|_| {
                    BillingError::Config(format!("API base {} cannot take a path", self.base_url))
                })?
                .push(resource_id);
        }
        Ok(url)
    }

    /// Request id for a creation request: the fixed override, or a new v4 uuid.
    pub(crate) fn next_request_id(&self) -> String {
        self.request_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Sends one authenticated request and records it in the diagnostics.
    /// A 401 drops the cached token and surfaces as an auth error.
    pub(crate) async fn send<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        query: &[(&str, String)],
        json_body: Option<&T>,
        request_id: Option<&str>,
    ) -> Result<Response> {
        let token = self.auth.access_token().await?;

        let started = Instant::now();
        let outcome = execute_request(
            &self.client,
            method.clone(),
            url.as_str(),
            &token,
            query,
            json_body,
            request_id,
        )
        .await;
        self.diagnostics
            .record_exchange(exchange_record(&method, url.as_str(), started, &outcome));

        let response = outcome?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Access token rejected by {}, clearing cache", url);
            self.auth.invalidate().await;
            let body = response.text().await.unwrap_or_default();
            return Err(BillingError::Auth(format!("access token rejected: {body}")));
        }
        Ok(response)
    }
}
