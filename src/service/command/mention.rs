use crate::config::MAX_NEWS_LIMIT;
use crate::service::news::NewsAggregator;

use super::news;

pub async fn handle(
    text: &str,
    aggregator: &NewsAggregator,
    default_limit: usize,
) -> Result<String, String> {
    let mut parts = text.split_whitespace();
    let cmd = parts
        .next()
        .ok_or_else(|| "No command provided. Try: ".to_string() + help_text())?
        .to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();

    match cmd.as_str() {
        "news" => {
            let (query, limit) = split_limit(&args, default_limit)?;
            if query.is_empty() {
                return Err("query required, e.g., news electric cars 3".into());
            }
            Ok(news::handle_text(aggregator, &query, limit).await)
        }
        "category" => {
            let (category, limit) = split_limit(&args, default_limit)?;
            if category.is_empty() {
                return Err(format!(
                    "category required, e.g., category technology 3. {}",
                    news::categories_text()
                ));
            }
            Ok(news::handle_category_text(aggregator, &category, limit).await)
        }
        "categories" => Ok(news::categories_text()),
        "help" => Ok(help_text().to_string()),
        _ => Err(format!("Unknown command: {}. {}", cmd, help_text())),
    }
}

pub fn help_text() -> &'static str {
    "Usage: @Bot news QUERY [LIMIT] | category CATEGORY [LIMIT] | categories | help"
}

/// Treat a trailing number as the item limit; the remaining words form the query.
fn split_limit(args: &[&str], default_limit: usize) -> Result<(String, usize), String> {
    match args.split_last() {
        Some((last, rest)) if last.chars().all(|c| c.is_ascii_digit()) => {
            let limit = last
                .parse::<usize>()
                .map_err(|e| format!("invalid limit: {e}"))?
                .clamp(1, MAX_NEWS_LIMIT);
            Ok((rest.join(" "), limit))
        }
        _ => Ok((args.join(" "), default_limit)),
    }
}
