//! Runtime configuration
//!
//! Values come from the environment (a `.env` file is loaded first by the
//! binaries) and may be overridden from the command line.

use crate::collector::{CollectorConfig, DEFAULT_PAGE_SIZE};
use crate::error::{Result, SyncError};
use crate::graphql::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://open-api.eprocorpo.com.br/graphql";

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub page_size: u32,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub collector: CollectorConfig,
    pub database_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            collector: CollectorConfig::default(),
            database_url: None,
        }
    }
}

impl SyncConfig {
    /// Build from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("BILLCHARGE_API_URL") {
            config.api_url = url;
        }
        config.token = get("BILLCHARGE_TOKEN");
        config.database_url = get("DATABASE_URL");

        if let Some(v) = get("BILLCHARGE_PAGE_SIZE") {
            config.page_size = parse("BILLCHARGE_PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("BILLCHARGE_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse("BILLCHARGE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("BILLCHARGE_MAX_RETRIES") {
            config.retry.max_retries = parse("BILLCHARGE_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("BILLCHARGE_RETRY_BASE_SECS") {
            config.retry.base_delay = Duration::from_secs(parse("BILLCHARGE_RETRY_BASE_SECS", &v)?);
        }
        if let Some(v) = get("BILLCHARGE_RETRY_CAP_SECS") {
            config.retry.max_delay = Duration::from_secs(parse("BILLCHARGE_RETRY_CAP_SECS", &v)?);
        }
        if let Some(v) = get("BILLCHARGE_PAGE_DELAY_MS") {
            config.collector.page_delay = Duration::from_millis(parse("BILLCHARGE_PAGE_DELAY_MS", &v)?);
        }
        if let Some(v) = get("BILLCHARGE_MAX_PAGE_RETRIES") {
            config.collector.max_page_retries = if v.trim().eq_ignore_ascii_case("unbounded") {
                None
            } else {
                Some(parse("BILLCHARGE_MAX_PAGE_RETRIES", &v)?)
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(SyncError::Config("page size must be at least 1".to_string()));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(SyncError::Config(format!(
                "retry base delay {:?} exceeds cap {:?}",
                self.retry.base_delay, self.retry.max_delay
            )));
        }
        Ok(())
    }

    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| SyncError::Config("BILLCHARGE_TOKEN is not set".to_string()))
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| SyncError::Config("DATABASE_URL is not set".to_string()))
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| SyncError::Config(format!("{}='{}': {}", key, raw, e)))
}
