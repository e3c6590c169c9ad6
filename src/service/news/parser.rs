//! Turns a numbered or bulleted natural-language answer into `NewsItem`s.
//!
//! The parser walks non-empty lines with a two-state machine. While
//! `AwaitingTitle`, continuation lines are dropped. Once a title line is seen
//! the parser moves to `AccumulatingSummary` and collects summary text, source
//! and date hints into a single accumulator until the next title line or the
//! end of input finalizes it.

use std::mem;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::NewsItem;

/// Parsed output is capped at this many items regardless of the requested limit.
pub const MAX_PARSED_ITEMS: usize = 5;
pub const FALLBACK_TITLE: &str = "Latest News Summary";
pub const TRUNCATION_MARKER: &str = "...";

const DEFAULT_TITLE: &str = "News Update";
const MIN_SUMMARY_LINE_CHARS: usize = 20;
const WEAK_TITLE_MAX_CHARS: usize = 100;
const FALLBACK_SUMMARY_CHARS: usize = 500;

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[.)](?:\s|$)").expect("ordinal pattern"));
static CAPITALIZED_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z'’]*:").expect("label pattern"));
static TITLE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:title|headline)\s*:\s*").expect("title field pattern"));
static SUMMARY_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:summary|description|details)\s*:\s*").expect("summary field pattern")
});
static SOURCE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[(\[]?\s*\bsource\s*:\s*([^()\[\]]+?)\s*[)\]]?\s*\.?\s*$")
        .expect("source label pattern")
});
static VIA_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[(\[]?\s*\b(?:via|from)\s+([A-Z][\w&.'’-]*(?:\s+[A-Z&][\w&.'’-]*){0,4})\s*[)\]]?\s*\.?\s*$")
        .expect("via/from pattern")
});
static DASH_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s[-–—]\s*([A-Z][\w&.'’]*(?:\s+[A-Z&][\w&.'’]*){0,5})\s*$")
        .expect("dash suffix pattern")
});
static RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:earlier today|this morning|this afternoon|today|yesterday)\b")
        .expect("relative time pattern")
});

/// Parse free text into at most [`MAX_PARSED_ITEMS`] items.
///
/// Non-empty text that yields no complete item produces a single
/// [`FALLBACK_TITLE`] item holding the start of the raw text.
pub fn parse_news_text(text: &str) -> Vec<NewsItem> {
    parse_news_text_at(text, Utc::now())
}

/// Same as [`parse_news_text`] with an explicit "now" for relative dates.
pub fn parse_news_text_at(text: &str, now: DateTime<Utc>) -> Vec<NewsItem> {
    let mut parser = TextParser::new(now);
    for line in text.lines() {
        parser.push_line(line);
    }
    let mut items = parser.finish();

    if items.is_empty() && !text.trim().is_empty() {
        items.push(NewsItem {
            title: FALLBACK_TITLE.to_string(),
            summary: truncate_chars(text.trim(), FALLBACK_SUMMARY_CHARS),
            url: None,
            source: None,
            published_at: Some(now),
        });
    }

    items.truncate(MAX_PARSED_ITEMS);
    items
}

/// Keep the first `max` characters, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}{}", text[..idx].trim_end(), TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    title: String,
    summary: Vec<String>,
    source: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

impl Accumulator {
    fn into_item(self) -> Option<NewsItem> {
        if self.title.is_empty() || self.summary.is_empty() {
            return None;
        }
        Some(NewsItem {
            title: self.title,
            summary: self.summary.join(" "),
            url: None,
            source: self.source,
            published_at: self.published_at,
        })
    }
}

#[derive(Debug)]
enum ParseState {
    AwaitingTitle,
    AccumulatingSummary(Accumulator),
}

#[derive(Debug, PartialEq)]
enum LineKind {
    Title(String),
    Content(String),
    SourceOnly,
}

struct TextParser {
    state: ParseState,
    items: Vec<NewsItem>,
    now: DateTime<Utc>,
}

impl TextParser {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: ParseState::AwaitingTitle,
            items: Vec::new(),
            now,
        }
    }

    fn push_line(&mut self, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        let (core, source) = split_attribution(line);
        let published_at = RELATIVE_TIME.is_match(line).then_some(self.now);

        match classify(line, &core) {
            LineKind::Title(title) => {
                self.finalize();
                self.state = ParseState::AccumulatingSummary(Accumulator {
                    title: clean_title(&title),
                    summary: Vec::new(),
                    source,
                    published_at,
                });
            }
            LineKind::Content(text) => {
                if let ParseState::AccumulatingSummary(acc) = &mut self.state {
                    if text.chars().count() > MIN_SUMMARY_LINE_CHARS {
                        acc.summary.push(text);
                    }
                    if source.is_some() {
                        acc.source = source;
                    }
                    if published_at.is_some() {
                        acc.published_at = published_at;
                    }
                }
            }
            LineKind::SourceOnly => {
                if let ParseState::AccumulatingSummary(acc) = &mut self.state {
                    acc.source = source;
                }
            }
        }
    }

    fn finalize(&mut self) {
        if let ParseState::AccumulatingSummary(acc) =
            mem::replace(&mut self.state, ParseState::AwaitingTitle)
        {
            if let Some(item) = acc.into_item() {
                self.items.push(item);
            }
        }
    }

    fn finish(mut self) -> Vec<NewsItem> {
        self.finalize();
        self.items
    }
}

fn classify(line: &str, core: &str) -> LineKind {
    if core.is_empty() {
        return LineKind::SourceOnly;
    }
    if let Some(m) = SUMMARY_FIELD.find(core) {
        return LineKind::Content(core[m.end()..].trim().to_string());
    }
    if looks_like_title(line, core) {
        LineKind::Title(core.to_string())
    } else {
        LineKind::Content(core.to_string())
    }
}

fn looks_like_title(line: &str, core: &str) -> bool {
    if ORDINAL.is_match(line) {
        return true;
    }
    if line.starts_with(&['•', '-', '*'][..]) {
        return true;
    }
    if CAPITALIZED_LABEL.is_match(line) {
        return true;
    }
    // weak heuristic, judged without the trailing attribution
    core.chars().count() < WEAK_TITLE_MAX_CHARS
        && core.chars().next().is_some_and(char::is_uppercase)
        && !core.ends_with('.')
}

/// Split a trailing source attribution off a line.
///
/// Returns the remaining text and the source name, if one was found.
fn split_attribution(line: &str) -> (String, Option<String>) {
    for pattern in [&*SOURCE_LABEL, &*VIA_FROM, &*DASH_SUFFIX] {
        if let Some(caps) = pattern.captures(line) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let source = name.as_str().trim().trim_end_matches('.').trim();
            if source.is_empty() {
                continue;
            }
            let rest = line[..whole.start()]
                .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '(' | '[' | '-' | '–' | '—' | ','))
                .to_string();
            return (rest, Some(source.to_string()));
        }
    }
    (line.to_string(), None)
}

fn clean_title(raw: &str) -> String {
    let mut title = raw.trim();
    if let Some(m) = ORDINAL.find(title) {
        title = &title[m.end()..];
    }
    title = title.trim_start_matches(|c: char| matches!(c, '•' | '-' | '*' | '#') || c.is_whitespace());
    if let Some(m) = TITLE_FIELD.find(title) {
        title = &title[m.end()..];
    }

    let cleaned = title
        .replace("**", "")
        .replace("__", "")
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_string();

    if cleaned.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        cleaned
    }
}
