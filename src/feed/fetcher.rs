use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::model::Link;
use feed_rs::parser;
use reqwest::Client;

use crate::error::Result;
use crate::models::{FeedSource, NewArticle};

pub struct FeedFetcher {
    client: Client,
    max_articles: usize,
}

impl FeedFetcher {
    pub fn new(max_articles: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("bubblewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            max_articles,
        })
    }

    /// Fetches one feed. Failures are logged and yield no articles so a broken
    /// feed never stops the others from being processed.
    pub async fn fetch_feed(&self, feed: &FeedSource) -> Vec<NewArticle> {
        match self.try_fetch(feed).await {
            Ok(articles) => {
                tracing::debug!("Fetched {} articles from {}", articles.len(), feed.name);
                articles
            }
            Err(e) => {
                tracing::warn!("Error fetching {}: {}", feed.name, e);
                Vec::new()
            }
        }
    }

    async fn try_fetch(&self, feed: &FeedSource) -> Result<Vec<NewArticle>> {
        let response = self.client.get(&feed.url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        parse_entries(&bytes[..], &feed.name, self.max_articles, Utc::now())
    }
}

/// Normalizes the first `max_articles` entries of an RSS/Atom document.
///
/// Entries without a link keep an empty url; callers decide whether to store
/// them. Content is returned as published, markup included.
pub fn parse_entries(
    bytes: &[u8],
    source: &str,
    max_articles: usize,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<NewArticle>> {
    let feed = parser::parse(bytes)?;

    let articles = feed
        .entries
        .into_iter()
        .take(max_articles)
        .map(|entry| {
            // Try content first, then fall back to summary
            let content = entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content))
                .unwrap_or_default();

            NewArticle {
                title: entry
                    .title
                    .map(|t| t.content)
                    .unwrap_or_else(|| "Untitled".to_string()),
                url: article_link(&entry.links),
                source: source.to_string(),
                published_date: Some(entry.published.or(entry.updated).unwrap_or(fetched_at)),
                content: Some(content),
            }
        })
        .collect();

    Ok(articles)
}

/// The entry's alternate link. Atom entries often list `replies`, `edit` or
/// `self` links first, so those are only used when nothing else is present.
fn article_link(links: &[Link]) -> String {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|l| l.href.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use axum::routing::get;
    use axum::Router;
    use chrono::TimeZone;

    use super::*;
    use crate::test_support::serve;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Test</title>
    <link>http://a/</link>
    <description>Test feed</description>
    <item>
      <title>T1</title>
      <link>http://a/1</link>
      <pubDate>Wed, 01 Jan 2025 10:00:00 GMT</pubDate>
      <description>short summary</description>
      <content:encoded><![CDATA[<p>Hello <b>world</b></p>]]></content:encoded>
    </item>
    <item>
      <link>http://a/2</link>
      <description><![CDATA[<p>Only a summary</p>]]></description>
    </item>
    <item>
      <title>No link</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Test</title>
  <id>urn:test</id>
  <updated>2025-02-02T08:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:test:1</id>
    <link href="http://b/1"/>
    <updated>2025-02-02T08:00:00Z</updated>
  </entry>
</feed>"#;

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap()
    }

    #[test]
    fn normalizes_rss_entries() {
        let articles = parse_entries(RSS.as_bytes(), "Test Feed", 15, fetched_at()).unwrap();
        assert_eq!(articles.len(), 3);

        let first = &articles[0];
        assert_eq!(first.title, "T1");
        assert_eq!(first.url, "http://a/1");
        assert_eq!(first.source, "Test Feed");
        assert_eq!(
            first.published_date,
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap())
        );
        assert!(first.content.as_deref().unwrap().contains("Hello <b>world</b>"));

        let second = &articles[1];
        assert_eq!(second.title, "Untitled");
        assert_eq!(second.published_date, Some(fetched_at()));
        assert!(second.content.as_deref().unwrap().contains("Only a summary"));

        let third = &articles[2];
        assert_eq!(third.url, "");
        assert_eq!(third.content.as_deref(), Some(""));
    }

    #[test]
    fn caps_entries_per_feed() {
        let articles = parse_entries(RSS.as_bytes(), "Test Feed", 2, fetched_at()).unwrap();
        assert_eq!(articles.len(), 2);
    }

    #[test]
    fn atom_falls_back_to_updated_time() {
        let articles = parse_entries(ATOM.as_bytes(), "Atom", 15, fetched_at()).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].url, "http://b/1");
        assert_eq!(
            articles[0].published_date,
            Some(Utc.with_ymd_and_hms(2025, 2, 2, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn atom_prefers_the_alternate_link() {
        let feed = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Blog</title>
  <id>urn:blog</id>
  <updated>2025-02-02T08:00:00Z</updated>
  <entry>
    <title>Post</title>
    <id>urn:blog:1</id>
    <link rel="replies" type="application/atom+xml" href="http://blog/feeds/1/comments"/>
    <link rel="edit" href="http://blog/api/posts/1"/>
    <link rel="alternate" type="text/html" href="http://blog/2025/post.html"/>
    <updated>2025-02-02T08:00:00Z</updated>
  </entry>
  <entry>
    <title>Comments only</title>
    <id>urn:blog:2</id>
    <link rel="replies" href="http://blog/feeds/2/comments"/>
    <updated>2025-02-02T08:00:00Z</updated>
  </entry>
</feed>"#;

        let articles = parse_entries(feed.as_bytes(), "Blog", 15, fetched_at()).unwrap();
        assert_eq!(articles[0].url, "http://blog/2025/post.html");
        assert_eq!(articles[1].url, "http://blog/feeds/2/comments");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse_entries(b"definitely not xml", "Bad", 15, fetched_at()).is_err());
    }

    #[tokio::test]
    async fn fetches_over_http() {
        let base = serve(Router::new().route("/feed.xml", get(|| async { RSS }))).await;
        let fetcher = FeedFetcher::new(15).unwrap();

        let articles = fetcher
            .fetch_feed(&FeedSource::new("Test Feed", &format!("{base}/feed.xml"), "AI"))
            .await;

        assert_eq!(articles.len(), 3);
    }

    #[tokio::test]
    async fn http_errors_yield_no_articles() {
        let base = serve(Router::new()).await;
        let fetcher = FeedFetcher::new(15).unwrap();

        let missing = fetcher
            .fetch_feed(&FeedSource::new("Missing", &format!("{base}/nope.xml"), "AI"))
            .await;
        let unreachable = fetcher
            .fetch_feed(&FeedSource::new("Down", "http://127.0.0.1:1/feed.xml", "AI"))
            .await;

        assert!(missing.is_empty());
        assert!(unreachable.is_empty());
    }
}
