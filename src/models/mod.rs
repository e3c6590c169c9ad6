pub mod news;

pub use news::{category_query, NewsCategory, NewsItem, NewsResult, ResultOrigin};
