use chrono::{DateTime, Utc};

use crate::models::NewsItem;

pub const SYSTEM_SOURCE: &str = "System";
pub const BOT_SOURCE: &str = "News AI Bot";

const MAX_PLACEHOLDER_ITEMS: usize = 2;

/// Static advisory items served when every provider failed.
///
/// Always returns `min(limit, 2)` items stamped with `now`.
pub fn placeholder_items(query: &str, limit: usize, now: DateTime<Utc>) -> Vec<NewsItem> {
    let advisories = [
        NewsItem {
            title: "News Service Temporarily Unavailable".to_string(),
            summary: format!(
                "Sorry, I couldn't reach any news source for \"{}\" right now. Please try again in a few minutes.",
                query
            ),
            url: None,
            source: Some(SYSTEM_SOURCE.to_string()),
            published_at: Some(now),
        },
        NewsItem {
            title: "Try Another Search".to_string(),
            summary: "Broader topics usually work better. You can also browse a fixed topic with the category command, e.g. `category technology`.".to_string(),
            url: None,
            source: Some(BOT_SOURCE.to_string()),
            published_at: Some(now),
        },
    ];

    advisories
        .into_iter()
        .take(limit.min(MAX_PLACEHOLDER_ITEMS))
        .collect()
}
