use sentiment::{Sentiment, SentimentAnalysis};
use serde::{Deserialize, Serialize};

/// Markup and rendered text of one review element, as read from the browser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    pub outer_html: String,
    pub rendered_text: String,
}

impl RawElement {
    pub fn new(outer_html: impl Into<String>, rendered_text: impl Into<String>) -> Self {
        Self {
            outer_html: outer_html.into(),
            rendered_text: rendered_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub author: String,
    pub date: String,
    pub stars: f64,
    pub text: String,
    pub analysis: SentimentAnalysis,
}

impl ReviewRecord {
    pub fn sentiment(&self) -> Sentiment {
        self.analysis.sentiment
    }
}

/// Why an element produced no record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("no review text found")]
    EmptyText,

    #[error("review text too short ({chars} < {min} chars)")]
    TooShort { chars: usize, min: usize },

    #[error("only UI text found: {0:?}")]
    UiArtifact(String),
}
