use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Article, ArticleQuery, ArticleUpdate, InsertOutcome, NewArticle, Stats};

use super::schema::SCHEMA;

const ARTICLE_COLUMNS: &str = "id, title, url, source, published_date, fetched_date, content, \
     summary, category, sentiment, sentiment_score, bubble_indicators, is_read";

/// Article store. Every method runs as a single closure on the connection
/// thread, so separate calls never share a transaction.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Stores a new article. A url that is already present leaves the table
    /// untouched and yields [`InsertOutcome::Duplicate`].
    pub async fn insert(&self, article: NewArticle) -> Result<InsertOutcome> {
        let now = Utc::now();
        let fetched_date = format_timestamp(now);
        let published_date = format_timestamp(article.published_date.unwrap_or(now));

        let outcome = self
            .conn
            .call(move |conn| {
                let inserted = conn.execute(
                    r#"INSERT INTO articles (title, url, source, published_date, fetched_date, content)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(url) DO NOTHING"#,
                    params![
                        article.title,
                        article.url,
                        article.source,
                        published_date,
                        fetched_date,
                        article.content,
                    ],
                )?;
                if inserted == 0 {
                    Ok(InsertOutcome::Duplicate)
                } else {
                    Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
                }
            })
            .await?;
        Ok(outcome)
    }

    pub async fn list(&self, query: ArticleQuery) -> Result<Vec<Article>> {
        let mut sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE 1=1");
        let mut values: Vec<Value> = Vec::new();

        if let Some(sentiment) = query.sentiment {
            sql.push_str(" AND sentiment = ?");
            values.push(Value::Text(sentiment.as_str().to_string()));
        }
        if let Some(category) = query.category {
            sql.push_str(" AND category = ?");
            values.push(Value::Text(category.as_str().to_string()));
        }
        sql.push_str(" ORDER BY published_date DESC LIMIT ?");
        values.push(Value::Integer(query.limit));

        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params_from_iter(values), article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"))?;
                let article = stmt.query_row(params![id], article_from_row).optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Applies every set field of `update` in one statement. Returns `false`
    /// when no article has this id.
    pub async fn update(&self, id: i64, update: ArticleUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(self.get(id).await?.is_some());
        }

        let mut assignments: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(summary) = update.summary {
            assignments.push("summary = ?");
            values.push(Value::Text(summary));
        }
        if let Some(category) = update.category {
            assignments.push("category = ?");
            values.push(Value::Text(category.as_str().to_string()));
        }
        if let Some(sentiment) = update.sentiment {
            assignments.push("sentiment = ?");
            values.push(Value::Text(sentiment.as_str().to_string()));
        }
        if let Some(score) = update.sentiment_score {
            assignments.push("sentiment_score = ?");
            values.push(Value::Real(score));
        }
        if let Some(indicators) = update.bubble_indicators {
            assignments.push("bubble_indicators = ?");
            values.push(Value::Text(serde_json::to_string(&indicators)?));
        }
        if let Some(is_read) = update.is_read {
            assignments.push("is_read = ?");
            values.push(Value::Integer(i64::from(is_read)));
        }

        let sql = format!("UPDATE articles SET {} WHERE id = ?", assignments.join(", "));
        values.push(Value::Integer(id));

        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, params_from_iter(values))?))
            .await?;
        Ok(changed > 0)
    }

    pub async fn mark_read(&self, id: i64) -> Result<bool> {
        self.update(id, ArticleUpdate::mark_read()).await
    }

    pub async fn stats(&self) -> Result<Stats> {
        let stats = self
            .conn
            .call(|conn| {
                let sentiment = label_counts(
                    conn,
                    r#"SELECT sentiment, COUNT(*) FROM articles
                       WHERE sentiment IS NOT NULL
                       GROUP BY sentiment ORDER BY sentiment"#,
                )?;
                let categories = label_counts(
                    conn,
                    r#"SELECT category, COUNT(*) AS count FROM articles
                       WHERE category IS NOT NULL
                       GROUP BY category ORDER BY count DESC, category"#,
                )?;
                let total: i64 =
                    conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                Ok(Stats {
                    sentiment,
                    categories,
                    total,
                })
            })
            .await?;
        Ok(stats)
    }

    /// Articles still waiting for analysis, most recently fetched first.
    pub async fn unprocessed(&self, limit: u32) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles WHERE summary IS NULL \
                     ORDER BY fetched_date DESC, id DESC LIMIT ?1"
                ))?;
                let articles = stmt
                    .query_map(params![limit], article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }
}

fn label_counts(conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(sql)?;
    let counts = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(counts)
}

/// Fixed-width UTC timestamps, so text ordering in SQL matches time ordering.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime('now') format
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        source: row.get(3)?,
        published_date: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| parse_datetime(&s)),
        fetched_date: parse_datetime(&row.get::<_, String>(5)?).unwrap_or_else(Utc::now),
        content: row.get(6)?,
        summary: row.get(7)?,
        category: row
            .get::<_, Option<String>>(8)?
            .and_then(|s| s.parse().ok()),
        sentiment: row
            .get::<_, Option<String>>(9)?
            .and_then(|s| s.parse().ok()),
        sentiment_score: row.get(10)?,
        bubble_indicators: row
            .get::<_, Option<String>>(11)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        is_read: row.get::<_, i64>(12)? != 0,
    })
}
