use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::paths::config_json_path;

pub const SANDBOX_API_BASE: &str = "https://api.sandbox.paypal.com";
pub const LIVE_API_BASE: &str = "https://api.paypal.com";

const CONFIG_FILE_PATH: &str = "config.toml";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Sandbox,
    Live,
}

impl Mode {
    pub fn api_base(self) -> &'static str {
        match self {
            Mode::Sandbox => SANDBOX_API_BASE,
            Mode::Live => LIVE_API_BASE,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Some(Mode::Sandbox),
            "live" => Some(Mode::Live),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Preset bearer token; skips the OAuth exchange when set.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub http_proxy: String,
    #[serde(default)]
    pub https_proxy: String,
    #[serde(default)]
    pub http_proxy_auth: Option<ProxyAuth>,
    #[serde(default)]
    pub https_proxy_auth: Option<ProxyAuth>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "***")
}

impl fmt::Debug for ProxyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("mode", &self.mode)
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("access_token", &redacted(&self.access_token))
            .field("api_base", &self.api_base)
            .field("http_proxy", &self.http_proxy)
            .field("https_proxy", &self.https_proxy)
            .field("http_proxy_auth", &self.http_proxy_auth)
            .field("https_proxy_auth", &self.https_proxy_auth)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

impl Config {
    /// Configuration with no credentials, sandbox mode and default limits.
    pub fn empty() -> Self {
        Config {
            mode: Mode::Sandbox,
            client_id: None,
            client_secret: None,
            access_token: None,
            api_base: None,
            http_proxy: String::new(),
            https_proxy: String::new(),
            http_proxy_auth: None,
            https_proxy_auth: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Loads ~/.billing/config.json, falling back to ./config.toml, then
    /// applies environment overrides.
    pub fn new() -> Self {
        let json_path = config_json_path();
        let mut config = Self::from_json_file(&json_path)
            .or_else(|| Self::from_toml_file(Path::new(CONFIG_FILE_PATH)))
            .unwrap_or_else(Self::empty);

        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn from_json_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| log::warn!("Failed to read {}: {}", path.display(), e))
            .ok()?;
        serde_json::from_str::<Config>(&content)
            .map_err(|e| log::warn!("Failed to parse {}: {}", path.display(), e))
            .ok()
    }

    pub fn from_toml_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| log::warn!("Failed to read {}: {}", path.display(), e))
            .ok()?;
        toml::from_str::<Config>(&content)
            .map_err(|e| log::warn!("Failed to parse {}: {}", path.display(), e))
            .ok()
    }

    /// Applies `BILLING_*` and proxy overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("BILLING_MODE") {
            match Mode::parse(&mode) {
                Some(mode) => self.mode = mode,
                None => log::warn!("Ignoring unknown BILLING_MODE {mode:?}"),
            }
        }
        if let Some(client_id) = lookup("BILLING_CLIENT_ID") {
            self.client_id = Some(client_id);
        }
        if let Some(client_secret) = lookup("BILLING_CLIENT_SECRET") {
            self.client_secret = Some(client_secret);
        }
        if let Some(access_token) = lookup("BILLING_ACCESS_TOKEN") {
            self.access_token = Some(access_token);
        }
        if let Some(api_base) = lookup("BILLING_API_BASE") {
            self.api_base = Some(api_base);
        }
        if let Some(http_proxy) = lookup("HTTP_PROXY") {
            self.http_proxy = http_proxy;
        }
        if let Some(https_proxy) = lookup("HTTPS_PROXY") {
            self.https_proxy = https_proxy;
        }
        if let Some(timeout) = lookup("BILLING_TIMEOUT_SECS") {
            match timeout.trim().parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(e) => log::warn!("Ignoring BILLING_TIMEOUT_SECS {timeout:?}: {e}"),
            }
        }
        if let Some(retries) = lookup("BILLING_MAX_RETRIES") {
            match retries.trim().parse() {
                Ok(n) => self.max_retries = n,
                Err(e) => log::warn!("Ignoring BILLING_MAX_RETRIES {retries:?}: {e}"),
            }
        }
    }

    /// Base URL without trailing slash.
    pub fn api_base_url(&self) -> String {
        self.api_base
            .as_deref()
            .filter(|base| !base.trim().is_empty())
            .unwrap_or(self.mode.api_base())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_client_credentials(&self) -> bool {
        matches!(
            (self.client_id.as_deref(), self.client_secret.as_deref()),
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty()
        )
    }
}
