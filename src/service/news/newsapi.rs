use chrono::{DateTime, Utc};
use serde::Deserialize;
use serenity::async_trait;
use tracing::{debug, info, warn};

use crate::models::{NewsItem, ResultOrigin};

use super::parser::{truncate_chars, TRUNCATION_MARKER};
use super::{NewsProvider, NewsServiceError};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

const PROVIDER: &str = "NewsAPI";
const CONTENT_PREVIEW_CHARS: usize = 200;
const NO_DESCRIPTION: &str = "No description available.";
const REMOVED_MARKER: &str = "[Removed]";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "totalResults")]
    total_results: Option<u64>,
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiArticle {
    #[serde(default)]
    source: Option<ApiSource>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSource {
    #[serde(default)]
    name: Option<String>,
}

/// Structured-data provider backed by NewsAPI's `everything` endpoint.
pub struct NewsApiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl NewsApiProvider {
    /// A blank key counts as no key.
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v2/everything", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl NewsProvider for NewsApiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn origin(&self) -> ResultOrigin {
        ResultOrigin::NewsApi
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, NewsServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(NewsServiceError::ProviderUnavailable(PROVIDER))?;

        let page_size = limit.to_string();
        info!("Requesting {} articles about \"{}\" from {}", limit, query, PROVIDER);

        let resp = self
            .client
            .get(self.endpoint())
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .map_err(|e| {
                warn!("{} request failed: {}", PROVIDER, e);
                NewsServiceError::request_failed(PROVIDER, None, format!("request failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unable to read body".to_string());
            warn!("{} returned error status {}: {}", PROVIDER, status, body);
            return Err(NewsServiceError::request_failed(
                PROVIDER,
                Some(status.as_u16()),
                format!("status {status}: {body}"),
            ));
        }

        let raw_bytes = resp.bytes().await.map_err(|e| {
            warn!("Failed to read {} body: {}", PROVIDER, e);
            NewsServiceError::request_failed(
                PROVIDER,
                Some(status.as_u16()),
                format!("body read failed: {e}"),
            )
        })?;

        let parsed: ApiResponse = serde_json::from_slice(&raw_bytes).map_err(|e| {
            let preview = String::from_utf8_lossy(&raw_bytes[..raw_bytes.len().min(500)]);
            warn!(
                "Failed to parse {} response: {}; body preview: {}",
                PROVIDER, e, preview
            );
            NewsServiceError::request_failed(
                PROVIDER,
                Some(status.as_u16()),
                format!("parse failed: {e}"),
            )
        })?;

        if parsed.status != "ok" {
            let code = parsed.code.unwrap_or_else(|| "unknown".to_string());
            let message = parsed.message.unwrap_or_default();
            warn!("{} returned status={} code={}: {}", PROVIDER, parsed.status, code, message);
            return Err(NewsServiceError::request_failed(
                PROVIDER,
                Some(status.as_u16()),
                format!("api error {code}: {message}"),
            ));
        }

        let received = parsed.articles.len();
        let items: Vec<NewsItem> = parsed
            .articles
            .into_iter()
            .filter_map(map_article)
            .take(limit)
            .collect();

        debug!(
            "{} reported {:?} total results; kept {} of {} articles",
            PROVIDER,
            parsed.total_results,
            items.len(),
            received
        );

        if items.is_empty() {
            warn!("{} returned no usable articles for \"{}\"", PROVIDER, query);
            return Err(NewsServiceError::request_failed(
                PROVIDER,
                Some(status.as_u16()),
                "no articles returned",
            ));
        }

        Ok(items)
    }
}

fn map_article(article: ApiArticle) -> Option<NewsItem> {
    let title = article.title.map(|t| t.trim().to_string()).unwrap_or_default();
    if title.is_empty() || title == REMOVED_MARKER {
        return None;
    }

    let summary = non_empty(article.description)
        .or_else(|| non_empty(article.content).map(|c| content_preview(&c)))
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    let published_at = article
        .published_at
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));

    Some(NewsItem {
        title,
        summary,
        url: non_empty(article.url),
        source: article.source.and_then(|s| non_empty(s.name)),
        published_at,
    })
}

/// First characters of the article body, without NewsAPI's "[+N chars]" tail.
fn content_preview(content: &str) -> String {
    let body = match content.rfind("[+") {
        Some(idx) if content.ends_with("chars]") => content[..idx].trim_end(),
        _ => content,
    };
    let body = body.trim_end_matches('…').trim_end();
    let preview = truncate_chars(body, CONTENT_PREVIEW_CHARS);
    if preview.ends_with(TRUNCATION_MARKER) || body.len() == content.len() {
        preview
    } else {
        format!("{preview}{TRUNCATION_MARKER}")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(json: serde_json::Value) -> ApiArticle {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn maps_fields_one_to_one() {
        let item = map_article(article(serde_json::json!({
            "source": { "id": "bbc-news", "name": "BBC News" },
            "title": "Ferry Service Resumes",
            "description": "Crossings restart after the storm.",
            "url": "https://example.com/ferry",
            "publishedAt": "2026-10-18T09:30:00Z",
            "content": "Long body"
        })))
        .unwrap();

        assert_eq!(item.title, "Ferry Service Resumes");
        assert_eq!(item.summary, "Crossings restart after the storm.");
        assert_eq!(item.url.as_deref(), Some("https://example.com/ferry"));
        assert_eq!(item.source.as_deref(), Some("BBC News"));
        assert_eq!(
            item.published_at.map(|t| t.to_rfc3339()),
            Some("2026-10-18T09:30:00+00:00".to_string())
        );
    }

    #[test]
    fn missing_description_uses_content_preview() {
        let body = "a".repeat(300);
        let item = map_article(article(serde_json::json!({
            "title": "Only Content",
            "content": format!("{body} [+2100 chars]")
        })))
        .unwrap();

        assert!(item.summary.ends_with(TRUNCATION_MARKER));
        assert_eq!(item.summary.trim_end_matches(TRUNCATION_MARKER).chars().count(), 200);
        assert!(item.published_at.is_none());
    }

    #[test]
    fn short_content_with_char_count_tail_is_marked_truncated() {
        let item = map_article(article(serde_json::json!({
            "title": "Brief",
            "content": "Officials confirmed the plan… [+512 chars]"
        })))
        .unwrap();

        assert_eq!(item.summary, "Officials confirmed the plan...");
    }

    #[test]
    fn removed_and_untitled_articles_are_skipped() {
        assert!(map_article(article(serde_json::json!({ "title": "[Removed]" }))).is_none());
        assert!(map_article(article(serde_json::json!({ "title": "  " }))).is_none());
    }

    #[test]
    fn no_description_or_content_uses_placeholder_text() {
        let item = map_article(article(serde_json::json!({ "title": "Bare" }))).unwrap();
        assert_eq!(item.summary, NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn blank_key_is_unavailable_without_a_request() {
        let provider = NewsApiProvider::new(reqwest::Client::new(), Some(String::new()))
            .with_base_url("http://127.0.0.1:9");
        let err = provider.fetch("rust", 3).await.unwrap_err();
        assert!(matches!(err, NewsServiceError::ProviderUnavailable(PROVIDER)));
    }
}
