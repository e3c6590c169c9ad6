use chrono::Utc;
use serenity::async_trait;
use tracing::{debug, info, warn};

use crate::config::NewsConfig;
use crate::models::{category_query, NewsCategory, NewsItem, NewsResult, ResultOrigin};

pub mod newsapi;
pub mod parser;
pub mod perplexity;
pub mod placeholder;

pub use newsapi::NewsApiProvider;
pub use perplexity::PerplexityProvider;

#[derive(Debug, thiserror::Error)]
pub enum NewsServiceError {
    #[error("{0} credential not configured")]
    ProviderUnavailable(&'static str),
    #[error("{provider} request failed: {message}")]
    ProviderRequestFailed {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },
    #[error("no news provider answered ({failed} failed, {skipped} skipped)")]
    AllProvidersFailed { failed: usize, skipped: usize },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

impl NewsServiceError {
    pub fn request_failed(
        provider: &'static str,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        NewsServiceError::ProviderRequestFailed {
            provider,
            status,
            message: message.into(),
        }
    }
}

/// One strategy in the aggregator's fallback chain.
#[async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn origin(&self) -> ResultOrigin;
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, NewsServiceError>;
}

/// Looks up news through an ordered chain of providers, falling back to
/// placeholder items when every provider fails.
pub struct NewsAggregator {
    providers: Vec<Box<dyn NewsProvider>>,
}

impl NewsAggregator {
    /// Build the default chain (Perplexity, then NewsAPI) with default endpoints.
    pub fn new(
        perplexity_key: Option<String>,
        news_api_key: Option<String>,
    ) -> Result<Self, NewsServiceError> {
        Self::from_config(&NewsConfig {
            perplexity_api_key: perplexity_key,
            news_api_key,
            ..NewsConfig::default()
        })
    }

    pub fn from_config(config: &NewsConfig) -> Result<Self, NewsServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let perplexity = PerplexityProvider::new(client.clone(), config.perplexity_api_key.clone())
            .with_model(config.perplexity_model.clone())
            .with_base_url(config.perplexity_base_url.clone());
        let news_api = NewsApiProvider::new(client, config.news_api_key.clone())
            .with_base_url(config.news_api_base_url.clone());

        Ok(Self::with_providers(vec![
            Box::new(perplexity),
            Box::new(news_api),
        ]))
    }

    /// Use a custom, ordered provider chain.
    pub fn with_providers(providers: Vec<Box<dyn NewsProvider>>) -> Self {
        Self { providers }
    }

    /// Fetch up to `limit` items for `query`. Never fails: when every
    /// provider fails the result carries placeholder items instead.
    pub async fn fetch(&self, query: &str, limit: usize) -> NewsResult {
        let limit = limit.max(1);
        let mut failed = 0;
        let mut skipped = 0;

        for provider in &self.providers {
            match provider.fetch(query, limit).await {
                Ok(mut items) => {
                    items.truncate(limit);
                    info!(
                        "{} answered \"{}\" with {} items",
                        provider.name(),
                        query,
                        items.len()
                    );
                    return finish(query, items, provider.origin());
                }
                Err(NewsServiceError::ProviderUnavailable(name)) => {
                    debug!("Skipping {}: credential not configured", name);
                    skipped += 1;
                }
                Err(err) => {
                    warn!(
                        "{} failed for \"{}\", trying next provider: {}",
                        provider.name(),
                        query,
                        err
                    );
                    failed += 1;
                }
            }
        }

        warn!(
            "{}; serving placeholder for \"{}\"",
            NewsServiceError::AllProvidersFailed { failed, skipped },
            query
        );
        let now = Utc::now();
        NewsResult {
            items: placeholder::placeholder_items(query, limit, now),
            query: query.to_string(),
            retrieved_at: now,
            origin: ResultOrigin::Placeholder,
        }
    }

    /// Fetch news for a category label. Labels outside the known set still
    /// work and use the same query template.
    pub async fn fetch_by_category(&self, category: &str, limit: usize) -> NewsResult {
        let query = match NewsCategory::parse(category) {
            Some(known) => known.query(),
            None => {
                debug!("Unrecognized category \"{}\", using generic query", category);
                category_query(category)
            }
        };
        self.fetch(&query, limit).await
    }
}

fn finish(query: &str, items: Vec<NewsItem>, origin: ResultOrigin) -> NewsResult {
    NewsResult {
        items,
        query: query.to_string(),
        retrieved_at: Utc::now(),
        origin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Behaviour {
        Items(usize),
        Unavailable,
        Fails,
    }

    struct StubProvider {
        behaviour: Behaviour,
        origin: ResultOrigin,
        calls: Arc<AtomicUsize>,
        seen_queries: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl StubProvider {
        fn boxed(behaviour: Behaviour, origin: ResultOrigin) -> (Box<dyn NewsProvider>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let provider = StubProvider {
                behaviour,
                origin,
                calls: calls.clone(),
                seen_queries: Arc::default(),
            };
            (Box::new(provider), calls)
        }
    }

    #[async_trait]
    impl NewsProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn origin(&self) -> ResultOrigin {
            self.origin
        }

        async fn fetch(&self, query: &str, _limit: usize) -> Result<Vec<NewsItem>, NewsServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_queries.lock().unwrap().push(query.to_string());
            match self.behaviour {
                Behaviour::Items(n) => Ok((0..n)
                    .map(|i| NewsItem {
                        title: format!("Story {i}"),
                        summary: format!("Summary {i}"),
                        url: None,
                        source: None,
                        published_at: None,
                    })
                    .collect()),
                Behaviour::Unavailable => Err(NewsServiceError::ProviderUnavailable("stub")),
                Behaviour::Fails => Err(NewsServiceError::request_failed("stub", Some(500), "boom")),
            }
        }
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let (primary, primary_calls) = StubProvider::boxed(Behaviour::Items(3), ResultOrigin::Perplexity);
        let (alternate, alternate_calls) = StubProvider::boxed(Behaviour::Items(3), ResultOrigin::NewsApi);
        let aggregator = NewsAggregator::with_providers(vec![primary, alternate]);

        let result = aggregator.fetch("rust", 3).await;

        assert_eq!(result.origin, ResultOrigin::Perplexity);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(alternate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_fall_through_in_order() {
        let (primary, _) = StubProvider::boxed(Behaviour::Fails, ResultOrigin::Perplexity);
        let (alternate, alternate_calls) = StubProvider::boxed(Behaviour::Items(2), ResultOrigin::NewsApi);
        let aggregator = NewsAggregator::with_providers(vec![primary, alternate]);

        let result = aggregator.fetch("rust", 5).await;

        assert_eq!(result.origin, ResultOrigin::NewsApi);
        assert_eq!(result.items.len(), 2);
        assert_eq!(alternate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn items_never_exceed_limit() {
        let (primary, _) = StubProvider::boxed(Behaviour::Items(8), ResultOrigin::Perplexity);
        let aggregator = NewsAggregator::with_providers(vec![primary]);

        let result = aggregator.fetch("rust", 4).await;

        assert_eq!(result.items.len(), 4);
        assert_eq!(result.query, "rust");
    }

    #[tokio::test]
    async fn exhausted_chain_serves_placeholder() {
        let (primary, _) = StubProvider::boxed(Behaviour::Unavailable, ResultOrigin::Perplexity);
        let (alternate, _) = StubProvider::boxed(Behaviour::Fails, ResultOrigin::NewsApi);
        let aggregator = NewsAggregator::with_providers(vec![primary, alternate]);

        let before = Utc::now();
        let result = aggregator.fetch("rust", 1).await;
        let after = Utc::now();

        assert_eq!(result.origin, ResultOrigin::Placeholder);
        assert_eq!(result.items.len(), 1);
        let stamped = result.items[0].published_at.unwrap();
        assert!(stamped >= before && stamped <= after);
        assert_eq!(result.retrieved_at, stamped);
    }

    #[test]
    fn exhausted_chain_reports_skipped_and_failed_separately() {
        let err = NewsServiceError::AllProvidersFailed { failed: 1, skipped: 1 };
        assert_eq!(err.to_string(), "no news provider answered (1 failed, 1 skipped)");
    }

    #[tokio::test]
    async fn blank_credentials_skip_both_default_providers() {
        let aggregator = NewsAggregator::new(Some(String::new()), Some("  ".to_string())).unwrap();

        let result = aggregator.fetch("rust", 3).await;

        assert_eq!(result.origin, ResultOrigin::Placeholder);
        assert_eq!(result.items.len(), 2);
    }

    #[tokio::test]
    async fn category_labels_map_to_template_queries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let provider = StubProvider {
            behaviour: Behaviour::Items(1),
            origin: ResultOrigin::Perplexity,
            calls,
            seen_queries: seen.clone(),
        };
        let aggregator = NewsAggregator::with_providers(vec![Box::new(provider)]);

        let known = aggregator.fetch_by_category("Science", 1).await;
        let unknown = aggregator.fetch_by_category("Crypto", 1).await;

        assert_eq!(known.query, "latest science news today");
        assert_eq!(unknown.query, "latest crypto news today");
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["latest science news today", "latest crypto news today"]
        );
    }
}
