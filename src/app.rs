use crate::ai::Analyzer;
use crate::config::Config;
use crate::db::Repository;
use crate::error::Result;
use crate::feed::{sanitize, FeedFetcher};
use crate::models::{ArticleUpdate, FeedSource, InsertOutcome};

/// Owns the store and both external clients and runs the two pipelines.
pub struct App {
    pub repository: Repository,
    pub analyzer: Analyzer,
    fetcher: FeedFetcher,
    feeds: Vec<FeedSource>,
    analysis_batch_size: u32,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let fetcher = FeedFetcher::new(config.max_articles_per_feed)?;
        let analyzer = Analyzer::new(config.analyzer_settings())?;

        Ok(Self {
            repository,
            analyzer,
            fetcher,
            feeds: config.feeds.clone(),
            analysis_batch_size: config.analysis_batch_size,
        })
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    /// Fetches every configured feed in turn and stores the articles not seen
    /// before. Returns how many were new.
    pub async fn refresh_feeds(&self) -> usize {
        let mut new_count = 0;

        for feed in &self.feeds {
            let articles = self.fetcher.fetch_feed(feed).await;
            let mut feed_new = 0;

            for mut article in articles {
                if article.url.is_empty() {
                    continue;
                }
                article.content = article.content.as_deref().map(sanitize);

                match self.repository.insert(article).await {
                    Ok(InsertOutcome::Inserted(id)) => {
                        tracing::trace!("Stored article {}", id);
                        feed_new += 1;
                    }
                    Ok(InsertOutcome::Duplicate) => {}
                    Err(e) => tracing::warn!("Failed to store article from {}: {}", feed.name, e),
                }
            }

            tracing::debug!("{}: {} new articles", feed.name, feed_new);
            new_count += feed_new;
        }

        tracing::info!("Refresh complete: {} new articles", new_count);
        new_count
    }

    /// Classifies up to one batch of unanalyzed articles. Articles the
    /// analyzer cannot handle stay unprocessed for a later run.
    pub async fn process_unanalyzed(&self) -> Result<usize> {
        if !self.analyzer.has_api_key().await {
            tracing::debug!("No API key configured, skipping analysis");
            return Ok(0);
        }

        let articles = self.repository.unprocessed(self.analysis_batch_size).await?;
        let mut processed = 0;

        for article in articles {
            let content = article.content.as_deref().unwrap_or_default();
            let Some(analysis) = self.analyzer.analyze(&article.title, content).await else {
                continue;
            };
            if let Some(note) = &analysis.investment_relevance {
                tracing::debug!("Article {} relevance: {}", article.id, note);
            }

            match self
                .repository
                .update(article.id, ArticleUpdate::from(analysis))
                .await
            {
                Ok(true) => processed += 1,
                Ok(false) => tracing::debug!("Article {} vanished before analysis was saved", article.id),
                Err(e) => tracing::warn!("Failed to save analysis for article {}: {}", article.id, e),
            }
        }

        tracing::info!(
            "Analyzed {} articles with {}",
            processed,
            self.analyzer.model_version()
        );
        Ok(processed)
    }
}
