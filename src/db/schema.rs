pub const SCHEMA: &str = r#"
-- articles table
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    published_date TEXT,
    fetched_date TEXT NOT NULL,
    content TEXT,
    summary TEXT,
    category TEXT,
    sentiment TEXT,
    sentiment_score REAL,
    bubble_indicators TEXT,
    is_read INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_articles_published_date ON articles(published_date DESC);
CREATE INDEX IF NOT EXISTS idx_articles_fetched_date ON articles(fetched_date DESC);
CREATE INDEX IF NOT EXISTS idx_articles_sentiment ON articles(sentiment);
"#;
