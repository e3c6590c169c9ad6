use serde::{Deserialize, Serialize};
use serenity::async_trait;
use tracing::{info, warn};

use crate::models::{NewsItem, ResultOrigin};

use super::parser::parse_news_text;
use super::{NewsProvider, NewsServiceError};

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_MODEL: &str = "sonar";

const PROVIDER: &str = "Perplexity";
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.2;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Natural-language provider speaking the OpenAI-compatible chat completions API.
pub struct PerplexityProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl PerplexityProvider {
    /// A blank key counts as no key.
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Prompt asking for a numbered list the text parser understands.
pub fn build_prompt(query: &str, limit: usize) -> String {
    format!(
        "Find the {limit} most recent and important news stories about \"{query}\". \
         For each story give the title, a 2-3 sentence summary and the source name. \
         Format the answer as a numbered list, one story per number, with the title on the \
         numbered line, the summary on the following lines and the source as \"Source: <name>\"."
    )
}

#[async_trait]
impl NewsProvider for PerplexityProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn origin(&self) -> ResultOrigin {
        ResultOrigin::Perplexity
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NewsItem>, NewsServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(NewsServiceError::ProviderUnavailable(PROVIDER))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(
                        "You are a news assistant. Report only real, recent stories and be concise."
                            .to_string(),
                    ),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(build_prompt(query, limit)),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        info!("Requesting {} stories about \"{}\" from {}", limit, query, PROVIDER);

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
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

        let parsed: ChatResponse = serde_json::from_slice(&raw_bytes).map_err(|e| {
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

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                warn!("{} response carried no completion content", PROVIDER);
                NewsServiceError::request_failed(
                    PROVIDER,
                    Some(status.as_u16()),
                    "response has no completion content",
                )
            })?;

        let items = parse_news_text(&content);
        info!("Parsed {} stories from {} answer", items.len(), PROVIDER);
        Ok(items)
    }
}
