use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ai::{AnalyzerSettings, DEFAULT_API_URL, DEFAULT_MODEL};
use crate::error::{AppError, Result};
use crate::models::FeedSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub claude_api_key: Option<String>,

    #[serde(default = "default_model")]
    pub claude_model: String,

    #[serde(default = "default_api_url")]
    pub claude_api_url: String,

    /// 0 disables the background refresh in `serve`.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_minutes: u32,

    #[serde(default = "default_max_articles_per_feed")]
    pub max_articles_per_feed: usize,

    #[serde(default = "default_analysis_batch_size")]
    pub analysis_batch_size: u32,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedSource>,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bubblewatch");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("news.db").to_string_lossy().to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_refresh_interval() -> u32 {
    15
}

fn default_max_articles_per_feed() -> usize {
    15
}

fn default_analysis_batch_size() -> u32 {
    5
}

fn default_port() -> u16 {
    5000
}

fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new(
            "TechCrunch AI",
            "https://techcrunch.com/category/artificial-intelligence/feed/",
            "AI Industry",
        ),
        FeedSource::new(
            "MIT Technology Review",
            "https://www.technologyreview.com/feed/",
            "AI Research",
        ),
        FeedSource::new(
            "The Verge AI",
            "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml",
            "AI Industry",
        ),
        FeedSource::new(
            "Ars Technica",
            "https://feeds.arstechnica.com/arstechnica/technology-lab",
            "AI Industry",
        ),
        FeedSource::new(
            "VentureBeat AI",
            "https://venturebeat.com/category/ai/feed/",
            "AI Business",
        ),
        FeedSource::new(
            "Hacker News AI",
            "https://hnrss.org/newest?q=AI+OR+artificial+intelligence+OR+LLM+OR+OpenAI",
            "AI Community",
        ),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            claude_api_key: None,
            claude_model: default_model(),
            claude_api_url: default_api_url(),
            refresh_interval_minutes: default_refresh_interval(),
            max_articles_per_feed: default_max_articles_per_feed(),
            analysis_batch_size: default_analysis_batch_size(),
            port: default_port(),
            feeds: default_feeds(),
        }
    }
}

impl Config {
    /// Reads the config file (writing a default one on first run), then
    /// applies environment overrides. Overrides are never written back.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bubblewatch")
            .join("config.toml")
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.claude_api_key = Some(key);
        }
        if let Some(path) = lookup("BUBBLEWATCH_DB") {
            self.db_path = path;
        }
        if let Some(value) = lookup("MAX_ARTICLES_PER_FEED") {
            self.max_articles_per_feed = parse_number("MAX_ARTICLES_PER_FEED", &value)?;
        }
        if let Some(value) = lookup("ANALYSIS_BATCH_SIZE") {
            self.analysis_batch_size = parse_number("ANALYSIS_BATCH_SIZE", &value)?;
        }
        if let Some(value) = lookup("PORT") {
            self.port = parse_number("PORT", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for feed in &self.feeds {
            url::Url::parse(&feed.url).map_err(|e| {
                AppError::Config(format!("feed {:?} has an invalid url: {}", feed.name, e))
            })?;
        }
        url::Url::parse(&self.claude_api_url)
            .map_err(|e| AppError::Config(format!("invalid claude_api_url: {}", e)))?;
        Ok(())
    }

    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        AnalyzerSettings {
            api_key: self.claude_api_key.clone(),
            api_url: self.claude_api_url.clone(),
            model: self.claude_model.clone(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} must be a number, got {:?}", name, value)))
}
