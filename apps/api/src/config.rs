use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub assessment_service_url: String,
    pub directory_service_url: String,
    pub port: u16,
    pub rust_log: String,
    pub http_timeout: Duration,
    /// How long a candidate-facing notice stays visible.
    pub notice_ttl: Duration,
    pub default_page_size: usize,
    /// Where clients are sent once a test has ended.
    pub feedback_path: String,
    /// Flows untouched for this long are dropped from the registry.
    pub flow_idle_ttl: Duration,
    pub flow_sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            assessment_service_url: trim_base_url(require_env("ASSESSMENT_SERVICE_URL")?),
            directory_service_url: trim_base_url(require_env("DIRECTORY_SERVICE_URL")?),
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 30u64)?),
            notice_ttl: Duration::from_secs(parse_env("NOTICE_TTL_SECS", 5u64)?),
            default_page_size: parse_env("DEFAULT_PAGE_SIZE", 10usize)?,
            feedback_path: std::env::var("FEEDBACK_PATH")
                .unwrap_or_else(|_| "/feedback".to_string()),
            flow_idle_ttl: Duration::from_secs(parse_env("FLOW_IDLE_TTL_SECS", 7200u64)?),
            flow_sweep_interval: Duration::from_secs(
                parse_env("FLOW_SWEEP_INTERVAL_SECS", 60u64)?.max(1),
            ),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
