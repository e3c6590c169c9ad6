use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Which strategy in the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    Perplexity,
    NewsApi,
    Placeholder,
}

impl fmt::Display for ResultOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResultOrigin::Perplexity => "Perplexity",
            ResultOrigin::NewsApi => "NewsAPI",
            ResultOrigin::Placeholder => "placeholder",
        };
        f.write_str(label)
    }
}

/// Response envelope for one aggregation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsResult {
    pub items: Vec<NewsItem>,
    pub query: String,
    pub retrieved_at: DateTime<Utc>,
    pub origin: ResultOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    Technology,
    Business,
    Sports,
    Health,
    Science,
    Politics,
    World,
    Entertainment,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 8] = [
        NewsCategory::Technology,
        NewsCategory::Business,
        NewsCategory::Sports,
        NewsCategory::Health,
        NewsCategory::Science,
        NewsCategory::Politics,
        NewsCategory::World,
        NewsCategory::Entertainment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Technology => "technology",
            NewsCategory::Business => "business",
            NewsCategory::Sports => "sports",
            NewsCategory::Health => "health",
            NewsCategory::Science => "science",
            NewsCategory::Politics => "politics",
            NewsCategory::World => "world",
            NewsCategory::Entertainment => "entertainment",
        }
    }

    /// Case-insensitive lookup; `None` for labels outside the fixed set.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }

    pub fn query(&self) -> String {
        category_query(self.as_str())
    }
}

impl fmt::Display for NewsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canned query for a category label. Unknown labels use the same template.
pub fn category_query(label: &str) -> String {
    format!("latest {} news today", label.trim().to_lowercase())
}
