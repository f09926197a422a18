use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Analysis, Category, Sentiment};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_date: Option<DateTime<Utc>>,
    pub fetched_date: DateTime<Utc>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub category: Option<Category>,
    pub sentiment: Option<Sentiment>,
    pub sentiment_score: Option<f64>,
    pub bubble_indicators: Option<Vec<String>>,
    pub is_read: bool,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_date: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// An article with the same url is already stored.
    Duplicate,
}

/// Partial update over the fixed set of mutable article columns.
/// `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleUpdate {
    pub summary: Option<String>,
    pub category: Option<Category>,
    pub sentiment: Option<Sentiment>,
    pub sentiment_score: Option<f64>,
    pub bubble_indicators: Option<Vec<String>>,
    pub is_read: Option<bool>,
}

impl ArticleUpdate {
    pub fn mark_read() -> Self {
        Self {
            is_read: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<Analysis> for ArticleUpdate {
    fn from(analysis: Analysis) -> Self {
        Self {
            summary: Some(analysis.summary),
            category: Some(analysis.category),
            sentiment: Some(analysis.sentiment),
            sentiment_score: Some(analysis.sentiment_score),
            bubble_indicators: Some(analysis.bubble_indicators),
            is_read: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArticleQuery {
    pub limit: i64,
    pub sentiment: Option<Sentiment>,
    pub category: Option<Category>,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            sentiment: None,
            category: None,
        }
    }
}
