/*
 * Responsibility
 * - Load settings from the environment (.env is honoured via dotenvy)
 * - Validate them once at startup (invalid → startup fails)
 * - Token authority client settings (base url, timeout) are read here only;
 *   nothing mutates them at runtime
 */
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_OAUTH_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_OAUTH_TIMEOUT_MS: u64 = 100;
const MAX_OAUTH_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // Token authority
    pub oauth_base_url: Url,
    pub oauth_timeout: Duration,

    // Global per-request timeout of this server
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (tests use a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid("PORT"))?,
        };
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        let oauth_base_url = lookup("OAUTH_BASE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_OAUTH_BASE_URL.to_string());
        let oauth_base_url =
            Url::parse(&oauth_base_url).map_err(|_| ConfigError::Invalid("OAUTH_BASE_URL"))?;
        if !matches!(oauth_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("OAUTH_BASE_URL"));
        }

        let oauth_timeout_ms = match lookup("OAUTH_TIMEOUT_MS") {
            None => DEFAULT_OAUTH_TIMEOUT_MS,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| (1..=MAX_OAUTH_TIMEOUT_MS).contains(ms))
                .ok_or(ConfigError::Invalid("OAUTH_TIMEOUT_MS"))?,
        };

        let request_timeout_seconds = match lookup("REQUEST_TIMEOUT_SECONDS") {
            None => DEFAULT_REQUEST_TIMEOUT_SECONDS,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"))?,
        };

        Ok(Self {
            addr,
            app_env,
            oauth_base_url,
            oauth_timeout: Duration::from_millis(oauth_timeout_ms),
            request_timeout: Duration::from_secs(request_timeout_seconds),
        })
    }
}
