use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::service::news::{newsapi, perplexity};

pub const DEFAULT_NEWS_LIMIT: usize = 5;
pub const MAX_NEWS_LIMIT: usize = 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    MissingVar(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("no news provider credentials configured (set PERPLEXITY_API_KEY and/or NEWS_API_KEY)")]
    MissingCredentials,
}

/// Provider credentials and endpoints for the news aggregator.
#[derive(Clone)]
pub struct NewsConfig {
    pub perplexity_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub perplexity_model: String,
    pub perplexity_base_url: String,
    pub news_api_base_url: String,
    pub http_timeout: Duration,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            perplexity_api_key: None,
            news_api_key: None,
            perplexity_model: perplexity::DEFAULT_MODEL.to_string(),
            perplexity_base_url: perplexity::DEFAULT_BASE_URL.to_string(),
            news_api_base_url: newsapi::DEFAULT_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl NewsConfig {
    pub fn has_credentials(&self) -> bool {
        self.perplexity_api_key.is_some() || self.news_api_key.is_some()
    }
}

pub struct BotConfig {
    pub discord_token: String,
    pub application_id: u64,
    /// Guilds that get instant command registration in debug builds.
    pub guild_ids: Vec<u64>,
    pub default_limit: usize,
    pub news: NewsConfig,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let discord_token = read("DISCORD_TOKEN").ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;
        let application_id = read("APPLICATION_ID")
            .ok_or(ConfigError::MissingVar("APPLICATION_ID"))?
            .parse::<u64>()
            .map_err(|e| ConfigError::Invalid {
                key: "APPLICATION_ID",
                reason: format!("must be a numeric ID: {e}"),
            })?;

        let guild_ids = read("GUILD_IDS")
            .or_else(|| read("GUILD_ID"))
            .unwrap_or_default()
            .split(',')
            .filter_map(|id| id.trim().parse::<u64>().ok())
            .collect();

        let default_limit = match read("DEFAULT_NEWS_LIMIT") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| ConfigError::Invalid {
                    key: "DEFAULT_NEWS_LIMIT",
                    reason: e.to_string(),
                })?
                .clamp(1, MAX_NEWS_LIMIT),
            None => DEFAULT_NEWS_LIMIT,
        };

        let http_timeout = match read("HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                key: "HTTP_TIMEOUT_SECS",
                reason: e.to_string(),
            })?),
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let defaults = NewsConfig::default();
        let news = NewsConfig {
            perplexity_api_key: read("PERPLEXITY_API_KEY"),
            news_api_key: read("NEWS_API_KEY"),
            perplexity_model: read("PERPLEXITY_MODEL").unwrap_or(defaults.perplexity_model),
            perplexity_base_url: read("PERPLEXITY_BASE_URL").unwrap_or(defaults.perplexity_base_url),
            news_api_base_url: read("NEWS_API_BASE_URL").unwrap_or(defaults.news_api_base_url),
            http_timeout,
        };

        if !news.has_credentials() {
            return Err(ConfigError::MissingCredentials);
        }

        Ok(Self {
            discord_token,
            application_id,
            guild_ids,
            default_limit,
            news,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_minimal_configuration() {
        let config = BotConfig::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "token"),
            ("APPLICATION_ID", "42"),
            ("NEWS_API_KEY", "news-key"),
            ("GUILD_IDS", "1, 2,nope"),
        ]))
        .ok()
        .unwrap();

        assert_eq!(config.application_id, 42);
        assert_eq!(config.guild_ids, vec![1, 2]);
        assert_eq!(config.default_limit, DEFAULT_NEWS_LIMIT);
        assert_eq!(config.news.perplexity_api_key, None);
        assert_eq!(config.news.news_api_key.as_deref(), Some("news-key"));
        assert_eq!(config.news.perplexity_model, perplexity::DEFAULT_MODEL);
    }

    #[test]
    fn blank_credentials_are_missing() {
        let err = BotConfig::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "token"),
            ("APPLICATION_ID", "42"),
            ("PERPLEXITY_API_KEY", "   "),
            ("NEWS_API_KEY", ""),
        ]))
        .err()
        .unwrap();

        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn rejects_non_numeric_application_id() {
        let err = BotConfig::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "token"),
            ("APPLICATION_ID", "abc"),
            ("PERPLEXITY_API_KEY", "key"),
        ]))
        .err()
        .unwrap();

        assert!(matches!(err, ConfigError::Invalid { key: "APPLICATION_ID", .. }));
    }

    #[test]
    fn default_limit_is_clamped() {
        let config = BotConfig::from_lookup(lookup(&[
            ("DISCORD_TOKEN", "token"),
            ("APPLICATION_ID", "42"),
            ("PERPLEXITY_API_KEY", "key"),
            ("DEFAULT_NEWS_LIMIT", "50"),
        ]))
        .ok()
        .unwrap();

        assert_eq!(config.default_limit, MAX_NEWS_LIMIT);
    }
}
