use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::feed::truncate_chars;
use crate::models::{Analysis, Category, Sentiment};

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const MAX_TOKENS: u32 = 600;
const MAX_PROMPT_CONTENT_CHARS: usize = 2500;

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

/// The JSON object the model is asked to produce, before validation.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    summary: Option<SummaryText>,
    category: Option<String>,
    sentiment: Option<String>,
    sentiment_score: Option<f64>,
    bubble_indicators: Option<Vec<String>>,
    investment_relevance: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryText {
    Text(String),
    Lines(Vec<String>),
}

/// Classifies articles through the Anthropic Messages API.
///
/// The credential lives on the instance and can be replaced at runtime with
/// [`Analyzer::set_api_key`]. Without one, [`Analyzer::analyze`] returns
/// `None` and makes no request.
pub struct Analyzer {
    client: Client,
    api_key: RwLock<Option<String>>,
    api_url: String,
    model: String,
}

impl Analyzer {
    pub fn new(settings: AnalyzerSettings) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            api_key: RwLock::new(normalize_key(settings.api_key)),
            api_url: settings.api_url,
            model: settings.model,
        })
    }

    pub async fn set_api_key(&self, api_key: Option<String>) {
        *self.api_key.write().await = normalize_key(api_key);
    }

    pub async fn has_api_key(&self) -> bool {
        self.api_key.read().await.is_some()
    }

    pub fn model_version(&self) -> &str {
        &self.model
    }

    /// Returns `None` when no key is configured or the request or its reply
    /// fails in any way; the error is logged, never propagated.
    pub async fn analyze(&self, title: &str, content: &str) -> Option<Analysis> {
        let api_key = self.api_key.read().await.clone()?;

        match self.request(&api_key, title, content).await {
            Ok(reply) => {
                let analysis = parse_analysis(&reply);
                if analysis.is_none() {
                    tracing::warn!("Could not parse analysis for {:?}", title);
                }
                analysis
            }
            Err(e) => {
                tracing::warn!("AI analysis error: {}", e);
                None
            }
        }
    }

    async fn request(&self, api_key: &str, title: &str, content: &str) -> Result<String> {
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(title, content),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::ClaudeApi(format!("HTTP {}: {}", status, error_text)));
        }

        let message_response: MessageResponse = response.json().await?;

        let reply = message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(reply)
    }
}

fn normalize_key(api_key: Option<String>) -> Option<String> {
    api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

fn build_prompt(title: &str, content: &str) -> String {
    let categories = Category::ALL
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        r#"Analyze this AI news article from an INVESTMENT perspective, focusing on AI bubble indicators.

ARTICLE TITLE: {title}
CONTENT: {content}

Provide analysis in JSON format:
{{
    "summary": "2-3 bullet points summarizing key points (use bullet character •)",
    "category": "One of: {categories}",
    "sentiment": "Bullish (positive for AI investment), Neutral, or Bearish (bubble warning signs)",
    "sentiment_score": -1.0 to 1.0 (bearish to bullish),
    "bubble_indicators": ["list", "of", "bubble", "warning", "signs", "if", "any"],
    "investment_relevance": "Brief note on why this matters for AI investors"
}}

Focus on identifying:
- Overvaluation signals (excessive funding, unrealistic valuations)
- Market correction signs (layoffs, funding pullback, failed products)
- Hype vs reality gaps
- Sustainable growth indicators"#,
        content = truncate_chars(content, MAX_PROMPT_CONTENT_CHARS),
    )
}

/// Returns the span from the first `{` to the last `}` of `reply`.
///
/// Braces inside string values or several objects in one reply can make this
/// pick the wrong span; the JSON parse that follows rejects most of those.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Parses a model reply into a complete [`Analysis`]. Anything missing or
/// outside the label sets rejects the whole reply.
pub fn parse_analysis(reply: &str) -> Option<Analysis> {
    let payload = extract_json_object(reply)?;
    let raw: RawAnalysis = match serde_json::from_str(payload) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!("Analysis payload is not valid JSON: {}", e);
            return None;
        }
    };

    let summary = match raw.summary? {
        SummaryText::Text(text) => text,
        SummaryText::Lines(lines) => lines.join("\n"),
    };
    let summary = summary.trim().to_string();
    if summary.is_empty() {
        return None;
    }

    let category: Category = raw.category?.parse().ok()?;
    let sentiment: Sentiment = raw.sentiment?.parse().ok()?;
    let sentiment_score = raw.sentiment_score.filter(|s| s.is_finite())?.clamp(-1.0, 1.0);

    Some(Analysis {
        summary,
        category,
        sentiment,
        sentiment_score,
        bubble_indicators: raw.bubble_indicators.unwrap_or_default(),
        investment_relevance: raw.investment_relevance,
    })
}
