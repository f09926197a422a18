mod fetcher;
mod sanitize;

pub use fetcher::FeedFetcher;
pub use sanitize::{sanitize, truncate_chars};
