use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Market sentiment of an article from an AI-investment point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Neutral,
    Bearish,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Bullish, Sentiment::Neutral, Sentiment::Bearish];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "Bullish",
            Sentiment::Neutral => "Neutral",
            Sentiment::Bearish => "Bearish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "AI Funding")]
    Funding,
    #[serde(rename = "AI Valuations")]
    Valuations,
    #[serde(rename = "AI Layoffs")]
    Layoffs,
    #[serde(rename = "AI Products")]
    Products,
    #[serde(rename = "AI Research")]
    Research,
    #[serde(rename = "AI Regulation")]
    Regulation,
    #[serde(rename = "AI Market")]
    Market,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Funding,
        Category::Valuations,
        Category::Layoffs,
        Category::Products,
        Category::Research,
        Category::Regulation,
        Category::Market,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Funding => "AI Funding",
            Category::Valuations => "AI Valuations",
            Category::Layoffs => "AI Layoffs",
            Category::Products => "AI Products",
            Category::Research => "AI Research",
            Category::Regulation => "AI Regulation",
            Category::Market => "AI Market",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown label: {:?}", self.0)
    }
}

impl std::error::Error for UnknownLabel {}

/// Models tend to echo the prompt's hint ("Bullish (positive for AI investment)"),
/// so a label matches when the input starts with it as a whole word, ignoring
/// ASCII case.
fn match_label<T: Copy>(input: &str, labels: &[T], name: impl Fn(&T) -> &'static str) -> Option<T> {
    let input = input.trim();
    labels.iter().copied().find(|label| {
        let label_name = name(label);
        let (Some(head), Some(rest)) = (input.get(..label_name.len()), input.get(label_name.len()..))
        else {
            return false;
        };
        head.eq_ignore_ascii_case(label_name)
            && rest.chars().next().map_or(true, |c| !c.is_alphanumeric())
    })
}

impl FromStr for Sentiment {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match_label(s, &Self::ALL, Sentiment::as_str).ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl FromStr for Category {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match_label(s, &Self::ALL, Category::as_str).ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete, validated classification of one article.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub summary: String,
    pub category: Category,
    pub sentiment: Sentiment,
    /// Always within `-1.0..=1.0`.
    pub sentiment_score: f64,
    pub bubble_indicators: Vec<String>,
    /// Returned by the model for display only; never persisted.
    pub investment_relevance: Option<String>,
}
