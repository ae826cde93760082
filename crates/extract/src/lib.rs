pub mod config;
pub mod locator;
pub mod schema;

pub use config::ExtractionConfig;
pub use locator::{InvalidSelector, RatingLocator, TextLocator};
pub use schema::{RawElement, ReviewRecord, SkipReason};

use locator::{RatingChain, TextChain};
use scraper::Html;
use sentiment::SentimentAnalyzer;
use std::sync::Arc;

/// Builds scored review records out of raw review elements.
#[derive(Debug, Clone)]
pub struct ReviewExtractor {
    author: TextChain,
    date: TextChain,
    text: TextChain,
    rating: RatingChain,
    min_text_chars: usize,
    ui_artifacts: Vec<String>,
    anonymous_author: String,
    analyzer: Arc<SentimentAnalyzer>,
}

impl ReviewExtractor {
    pub fn new(config: &ExtractionConfig, analyzer: Arc<SentimentAnalyzer>) -> Result<Self, InvalidSelector> {
        Ok(Self {
            author: TextChain::compile("author", &config.author)?,
            date: TextChain::compile("date", &config.date)?,
            text: TextChain::compile("text", &config.text)?,
            rating: RatingChain::compile(&config.rating)?,
            min_text_chars: config.min_text_chars,
            ui_artifacts: config.ui_artifacts.clone(),
            anonymous_author: config.anonymous_author.clone(),
            analyzer,
        })
    }

    /// Resolve every field through its locator chain, then score the text.
    ///
    /// Missing author, date or rating fall back to defaults; only a missing,
    /// too short or UI-only text discards the element.
    pub fn extract(&self, raw: &RawElement) -> Result<ReviewRecord, SkipReason> {
        let doc = Html::parse_fragment(&raw.outer_html);

        let mut artifact = None;
        let text = self.text.resolve(&doc, raw, |candidate| {
            if self.is_ui_artifact(candidate) {
                artifact.get_or_insert_with(|| candidate.to_string());
                false
            } else {
                true
            }
        });

        let text = match (text, artifact) {
            (Some(text), _) => text,
            (None, Some(artifact)) => return Err(SkipReason::UiArtifact(artifact)),
            (None, None) => return Err(SkipReason::EmptyText),
        };

        let chars = text.chars().count();
        if chars < self.min_text_chars {
            return Err(SkipReason::TooShort { chars, min: self.min_text_chars });
        }

        let author = self
            .author
            .resolve(&doc, raw, |_| true)
            .unwrap_or_else(|| self.anonymous_author.clone());
        let date = self.date.resolve(&doc, raw, |_| true).unwrap_or_default();
        let stars = self.rating.resolve(&doc).unwrap_or(0.0);

        let analysis = self.analyzer.analyze(&text, stars);

        Ok(ReviewRecord {
            author,
            date,
            stars,
            text,
            analysis,
        })
    }

    fn is_ui_artifact(&self, text: &str) -> bool {
        self.ui_artifacts.iter().any(|artifact| artifact.trim() == text.trim())
    }
}
