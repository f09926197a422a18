use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Deserializer};
use serde_json::json;

use crate::error::Result;
use crate::models::{Article, ArticleQuery, Category, Sentiment, Stats};

use super::SharedApp;

const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ArticlesParams {
    sentiment: Option<String>,
    category: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    /// `None` when the field is absent, `Some(None)` for an explicit null.
    #[serde(default, deserialize_with = "present")]
    api_key: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Anything SQLite accepts as a LIMIT, so a negative value means no limit.
fn parse_limit(limit: Option<&str>) -> i64 {
    limit
        .and_then(|l| l.trim().parse().ok())
        .unwrap_or(DEFAULT_LIMIT)
}

/// Filters match stored labels exactly. `Ok(None)` means no filter,
/// `Err(())` a label that can never match.
fn exact_label<T: Copy>(
    value: Option<&str>,
    labels: &[T],
    name: impl Fn(&T) -> &'static str,
) -> std::result::Result<Option<T>, ()> {
    match value.filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => labels.iter().copied().find(|l| name(l) == v).map(Some).ok_or(()),
    }
}

pub async fn list_articles(
    State(app): State<SharedApp>,
    Query(params): Query<ArticlesParams>,
) -> Result<Json<Vec<Article>>> {
    let sentiment = exact_label(params.sentiment.as_deref(), &Sentiment::ALL, Sentiment::as_str);
    let category = exact_label(params.category.as_deref(), &Category::ALL, Category::as_str);
    let (Ok(sentiment), Ok(category)) = (sentiment, category) else {
        return Ok(Json(Vec::new()));
    };

    let limit = parse_limit(params.limit.as_deref());

    let articles = app
        .repository
        .list(ArticleQuery {
            limit,
            sentiment,
            category,
        })
        .await?;
    Ok(Json(articles))
}

/// Returns the article as stored, then marks it read.
pub async fn get_article(State(app): State<SharedApp>, Path(id): Path<i64>) -> Result<Response> {
    match app.repository.get(id).await? {
        Some(article) => {
            app.repository.mark_read(id).await?;
            Ok(Json(article).into_response())
        }
        None => Ok((StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()),
    }
}

pub async fn stats(State(app): State<SharedApp>) -> Result<Json<Stats>> {
    Ok(Json(app.repository.stats().await?))
}

pub async fn refresh(State(app): State<SharedApp>) -> Json<serde_json::Value> {
    let new_articles = app.refresh_feeds().await;
    Json(json!({ "new_articles": new_articles }))
}

pub async fn analyze(State(app): State<SharedApp>) -> Result<Json<serde_json::Value>> {
    if !app.analyzer.has_api_key().await {
        return Ok(Json(json!({ "error": "API key not configured", "processed": 0 })));
    }
    let processed = app.process_unanalyzed().await?;
    Ok(Json(json!({ "processed": processed })))
}

pub async fn get_config(State(app): State<SharedApp>) -> Json<serde_json::Value> {
    Json(json!({ "has_api_key": app.analyzer.has_api_key().await }))
}

pub async fn update_config(
    State(app): State<SharedApp>,
    Json(update): Json<ConfigUpdate>,
) -> Json<serde_json::Value> {
    if let Some(api_key) = update.api_key {
        let cleared = api_key.is_none();
        app.analyzer.set_api_key(api_key).await;
        if cleared {
            tracing::info!("API key cleared");
        } else {
            tracing::info!("API key updated");
        }
    }
    Json(json!({ "status": "saved" }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::api::router;
    use crate::app::tests::harness;
    use crate::test_support::serve;

    const REPLY: &str = r#"{"summary":"s","category":"AI Funding","sentiment":"Bearish","sentiment_score":-0.4,"bubble_indicators":["froth","hype"]}"#;

    struct Api {
        base: String,
        client: reqwest::Client,
        llm_calls: Arc<std::sync::atomic::AtomicUsize>,
        _dir: tempfile::TempDir,
    }

    impl Api {
        async fn start(api_key: Option<&str>) -> Self {
            let h = harness(api_key, REPLY).await;
            Self {
                base: serve(router(Arc::new(h.app))).await,
                client: reqwest::Client::new(),
                llm_calls: h.llm_calls,
                _dir: h.dir,
            }
        }

        async fn get(&self, path: &str) -> (u16, Value) {
            let response = self.client.get(format!("{}{}", self.base, path)).send().await.unwrap();
            (response.status().as_u16(), response.json().await.unwrap())
        }

        async fn post(&self, path: &str, body: Value) -> (u16, Value) {
            let response = self
                .client
                .post(format!("{}{}", self.base, path))
                .json(&body)
                .send()
                .await
                .unwrap();
            (response.status().as_u16(), response.json().await.unwrap())
        }
    }

    #[test]
    fn label_filters_are_exact() {
        let labels = &Sentiment::ALL;
        assert_eq!(exact_label(None, labels, Sentiment::as_str), Ok(None));
        assert_eq!(exact_label(Some(""), labels, Sentiment::as_str), Ok(None));
        assert_eq!(
            exact_label(Some("Bearish"), labels, Sentiment::as_str),
            Ok(Some(Sentiment::Bearish))
        );
        assert_eq!(exact_label(Some("bearish"), labels, Sentiment::as_str), Err(()));
    }

    #[test]
    fn limit_passes_through_to_sqlite() {
        assert_eq!(parse_limit(None), 50);
        assert_eq!(parse_limit(Some("abc")), 50);
        assert_eq!(parse_limit(Some(" 3 ")), 3);
        assert_eq!(parse_limit(Some("-1")), -1);
    }

    #[tokio::test]
    async fn empty_store_endpoints() {
        let api = Api::start(None).await;

        assert_eq!(
            api.get("/api/stats").await,
            (200, json!({"sentiment": {}, "categories": {}, "total": 0}))
        );
        assert_eq!(api.get("/api/articles").await, (200, json!([])));
        assert_eq!(api.get("/api/article/1").await, (404, json!({"error": "Not found"})));
    }

    #[tokio::test]
    async fn refresh_analyze_and_read_flow() {
        let api = Api::start(Some("test-key")).await;

        assert_eq!(
            api.post("/api/refresh", json!({})).await,
            (200, json!({"new_articles": 1}))
        );
        assert_eq!(
            api.post("/api/analyze", json!({})).await,
            (200, json!({"processed": 1}))
        );
        assert_eq!(api.llm_calls.load(Ordering::SeqCst), 1);

        let (status, articles) = api.get("/api/articles?sentiment=Bearish&category=AI%20Funding").await;
        assert_eq!(status, 200);
        assert_eq!(articles.as_array().unwrap().len(), 1);
        let article = &articles[0];
        assert_eq!(article["content"], "Hello world");
        assert_eq!(article["bubble_indicators"], json!(["froth", "hype"]));
        assert_eq!(article["is_read"], false);

        let (_, others) = api.get("/api/articles?sentiment=Bullish").await;
        assert_eq!(others, json!([]));
        let (_, unknown) = api.get("/api/articles?category=Sports").await;
        assert_eq!(unknown, json!([]));

        let path = format!("/api/article/{}", article["id"]);
        let (status, first_view) = api.get(&path).await;
        assert_eq!(status, 200);
        assert_eq!(first_view["is_read"], false);
        let (_, second_view) = api.get(&path).await;
        assert_eq!(second_view["is_read"], true);

        let (_, stats) = api.get("/api/stats").await;
        assert_eq!(
            stats,
            json!({"sentiment": {"Bearish": 1}, "categories": {"AI Funding": 1}, "total": 1})
        );
    }

    #[tokio::test]
    async fn analyze_reports_missing_key_until_configured() {
        let api = Api::start(None).await;
        api.post("/api/refresh", json!({})).await;

        assert_eq!(api.get("/api/config").await, (200, json!({"has_api_key": false})));
        assert_eq!(
            api.post("/api/analyze", json!({})).await,
            (200, json!({"error": "API key not configured", "processed": 0}))
        );
        assert_eq!(api.llm_calls.load(Ordering::SeqCst), 0);

        assert_eq!(
            api.post("/api/config", json!({"api_key": "test-key"})).await,
            (200, json!({"status": "saved"}))
        );
        assert_eq!(api.get("/api/config").await, (200, json!({"has_api_key": true})));
        assert_eq!(
            api.post("/api/analyze", json!({})).await,
            (200, json!({"processed": 1}))
        );
    }

    #[tokio::test]
    async fn config_update_distinguishes_null_from_absent() {
        let api = Api::start(Some("test-key")).await;

        assert_eq!(api.post("/api/config", json!({})).await, (200, json!({"status": "saved"})));
        assert_eq!(api.get("/api/config").await, (200, json!({"has_api_key": true})));

        assert_eq!(
            api.post("/api/config", json!({"api_key": null})).await,
            (200, json!({"status": "saved"}))
        );
        assert_eq!(api.get("/api/config").await, (200, json!({"has_api_key": false})));
    }
}
