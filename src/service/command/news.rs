use serenity::all::{
    CommandDataOptionValue, CommandInteraction, CommandOptionType, CreateCommand,
    CreateCommandOption,
};
use tracing::warn;

use crate::config::MAX_NEWS_LIMIT;
use crate::models::{NewsCategory, NewsResult, ResultOrigin};
use crate::service::news::NewsAggregator;

// Discord rejects messages over 2000 characters
const DISCORD_MESSAGE_LIMIT: usize = 2000;
const TRUNCATED_NOTICE: &str = "\n\n⚠️ *Message truncated. Ask for fewer stories to see them in full.*";

pub fn register_command() -> CreateCommand {
    CreateCommand::new("news")
        .description("Latest news about any topic")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "What to search for, e.g., electric cars",
            )
            .required(true),
        )
        .add_option(limit_option())
}

pub fn register_category_command() -> CreateCommand {
    let mut category = CreateCommandOption::new(
        CommandOptionType::String,
        "category",
        "News category",
    )
    .required(true);
    for c in NewsCategory::ALL {
        category = category.add_string_choice(c.as_str(), c.as_str());
    }

    CreateCommand::new("category")
        .description("Today's headlines for a category")
        .add_option(category)
        .add_option(limit_option())
}

pub fn register_categories_command() -> CreateCommand {
    CreateCommand::new("categories").description("List the available news categories")
}

pub fn register_help_command() -> CreateCommand {
    CreateCommand::new("help").description("How to use the news bot")
}

fn limit_option() -> CreateCommandOption {
    CreateCommandOption::new(
        CommandOptionType::Integer,
        "limit",
        "How many stories (1-10)",
    )
    .min_int_value(1)
    .max_int_value(10)
}

pub async fn handle(
    command: &CommandInteraction,
    news: &NewsAggregator,
    default_limit: usize,
) -> Result<String, String> {
    let query = get_str_opt(command, "query")
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or("query is required")?;
    let limit = resolve_limit(get_int_opt(command, "limit"), default_limit);

    Ok(handle_text(news, query, limit).await)
}

pub async fn handle_category(
    command: &CommandInteraction,
    news: &NewsAggregator,
    default_limit: usize,
) -> Result<String, String> {
    let category = get_str_opt(command, "category").ok_or("category is required")?;
    let limit = resolve_limit(get_int_opt(command, "limit"), default_limit);

    Ok(handle_category_text(news, category, limit).await)
}

pub async fn handle_text(news: &NewsAggregator, query: &str, limit: usize) -> String {
    let result = news.fetch(query, limit).await;
    format_result(&result)
}

pub async fn handle_category_text(news: &NewsAggregator, category: &str, limit: usize) -> String {
    let result = news.fetch_by_category(category, limit).await;
    format_result(&result)
}

pub fn categories_text() -> String {
    let names: Vec<&str> = NewsCategory::ALL.iter().map(|c| c.as_str()).collect();
    format!("📂 Available categories: {}", names.join(", "))
}

fn resolve_limit(requested: Option<i64>, default_limit: usize) -> usize {
    requested
        .map(|l| l.clamp(1, MAX_NEWS_LIMIT as i64) as usize)
        .unwrap_or(default_limit)
}

/// Render a result as a numbered list, omitting optional fields that are absent.
pub fn format_result(result: &NewsResult) -> String {
    let mut lines = Vec::new();
    lines.push(format!("📰 News for \"{}\"", result.query));

    for (idx, item) in result.items.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("{}. **{}**", idx + 1, item.title));
        lines.push(item.summary.clone());

        let mut meta = Vec::new();
        if let Some(source) = &item.source {
            meta.push(format!("Source: {source}"));
        }
        if let Some(published) = item.published_at {
            meta.push(published.format("%Y-%m-%d %H:%M UTC").to_string());
        }
        if !meta.is_empty() {
            lines.push(format!("*{}*", meta.join(" | ")));
        }
        if let Some(url) = &item.url {
            lines.push(format!("<{url}>"));
        }
    }

    let footer = match result.origin {
        ResultOrigin::Placeholder => "⚠️ News sources are unavailable right now.".to_string(),
        origin => format!(
            "_via {} at {}_",
            origin,
            result.retrieved_at.format("%H:%M UTC")
        ),
    };
    lines.push(String::new());
    lines.push(footer);

    fit_discord_limit(lines.join("\n"))
}

fn fit_discord_limit(output: String) -> String {
    if output.chars().count() <= DISCORD_MESSAGE_LIMIT {
        return output;
    }

    warn!(
        "Output is {} characters, truncating to fit Discord limit",
        output.chars().count()
    );
    let keep = DISCORD_MESSAGE_LIMIT - TRUNCATED_NOTICE.chars().count();
    let cut = output
        .char_indices()
        .nth(keep)
        .map(|(idx, _)| idx)
        .unwrap_or(output.len());
    format!("{}{}", &output[..cut], TRUNCATED_NOTICE)
}

fn get_str_opt<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| match o.value {
            CommandDataOptionValue::String(ref s) => Some(s.as_str()),
            _ => None,
        })
}

fn get_int_opt(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| match o.value {
            CommandDataOptionValue::Integer(i) => Some(i),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsItem;
    use chrono::{TimeZone, Utc};

    fn result(items: Vec<NewsItem>, origin: ResultOrigin) -> NewsResult {
        NewsResult {
            items,
            query: "rust".to_string(),
            retrieved_at: Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap(),
            origin,
        }
    }

    #[test]
    fn formats_numbered_items_and_skips_missing_fields() {
        let items = vec![
            NewsItem {
                title: "First".into(),
                summary: "One.".into(),
                url: Some("https://example.com/1".into()),
                source: Some("Wire".into()),
                published_at: Some(Utc.with_ymd_and_hms(2026, 10, 18, 7, 5, 0).unwrap()),
            },
            NewsItem {
                title: "Second".into(),
                summary: "Two.".into(),
                url: None,
                source: None,
                published_at: None,
            },
        ];
        let text = format_result(&result(items, ResultOrigin::NewsApi));

        assert!(text.starts_with("📰 News for \"rust\""));
        assert!(text.contains("1. **First**"));
        assert!(text.contains("*Source: Wire | 2026-10-18 07:05 UTC*"));
        assert!(text.contains("<https://example.com/1>"));
        assert!(text.contains("2. **Second**\nTwo.\n\n"));
        assert!(text.ends_with("_via NewsAPI at 08:30 UTC_"));
    }

    #[test]
    fn placeholder_results_carry_warning_footer() {
        let text = format_result(&result(Vec::new(), ResultOrigin::Placeholder));
        assert!(text.ends_with("⚠️ News sources are unavailable right now."));
    }

    #[test]
    fn long_output_is_cut_to_discord_limit() {
        let items = (0..10)
            .map(|i| NewsItem {
                title: format!("Story {i}"),
                summary: "é".repeat(400),
                url: None,
                source: None,
                published_at: None,
            })
            .collect();
        let text = format_result(&result(items, ResultOrigin::Perplexity));

        assert_eq!(text.chars().count(), DISCORD_MESSAGE_LIMIT);
        assert!(text.ends_with(TRUNCATED_NOTICE));
    }

    #[test]
    fn limits_are_clamped() {
        assert_eq!(resolve_limit(None, 5), 5);
        assert_eq!(resolve_limit(Some(0), 5), 1);
        assert_eq!(resolve_limit(Some(99), 5), MAX_NEWS_LIMIT);
    }

    #[test]
    fn lists_every_category() {
        let text = categories_text();
        for c in NewsCategory::ALL {
            assert!(text.contains(c.as_str()));
        }
    }
}
