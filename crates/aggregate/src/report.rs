use anyhow::{Context, Result};
use extract::ReviewRecord;
use regex::Regex;
use sentiment::Sentiment;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

use crate::summary::EntitySummary;

/// Entries kept in each per-sentiment preview list.
pub const PREVIEW_LIMIT: usize = 15;
/// Characters of review text kept in a preview entry.
pub const PREVIEW_TEXT_CHARS: usize = 300;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityInfo {
    pub name: String,
    pub url: String,
    pub parsed_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentAnalysis {
    pub score: i32,
    pub raw_score: i32,
    pub positive_words: Vec<String>,
    pub negative_words: Vec<String>,
    pub text_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserComment {
    pub name: String,
    pub stars: f64,
    pub date: String,
    pub text: String,
    pub sentiment: Sentiment,
    pub analysis: CommentAnalysis,
}

impl From<&ReviewRecord> for UserComment {
    fn from(record: &ReviewRecord) -> Self {
        Self {
            name: record.author.clone(),
            stars: record.stars,
            date: record.date.clone(),
            text: record.text.clone(),
            sentiment: record.sentiment(),
            analysis: CommentAnalysis {
                score: record.analysis.adjusted_score,
                raw_score: record.analysis.raw_score,
                positive_words: record.analysis.positive_words.clone(),
                negative_words: record.analysis.negative_words.clone(),
                text_length: record.text.chars().count(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentStats {
    pub total_comments: usize,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
}

impl From<&EntitySummary> for SentimentStats {
    fn from(summary: &EntitySummary) -> Self {
        Self {
            total_comments: summary.total_count,
            positive_count: summary.positive_count,
            negative_count: summary.negative_count,
            neutral_count: summary.neutral_count,
            positive_percentage: summary.positive_percentage,
            negative_percentage: summary.negative_percentage,
            neutral_percentage: summary.neutral_percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentPreview {
    pub name: String,
    pub text: String,
    pub stars: f64,
    pub date: String,
}

impl From<&ReviewRecord> for CommentPreview {
    fn from(record: &ReviewRecord) -> Self {
        Self {
            name: record.author.clone(),
            text: record.text.chars().take(PREVIEW_TEXT_CHARS).collect(),
            stars: record.stars,
            date: record.date.clone(),
        }
    }
}

/// The per-entity JSON artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReport {
    pub restaurant_info: EntityInfo,
    #[serde(serialize_with = "numbered_comments")]
    pub user_comments: Vec<UserComment>,
    pub sentiment_analysis: SentimentStats,
    pub positive_comments: Vec<CommentPreview>,
    pub negative_comments: Vec<CommentPreview>,
    pub neutral_comments: Vec<CommentPreview>,
}

/// `[a, b]` as `{"review_0": a, "review_1": b}`, in order.
fn numbered_comments<S: Serializer>(comments: &[UserComment], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(comments.len()))?;
    for (i, comment) in comments.iter().enumerate() {
        map.serialize_entry(&format!("review_{}", i), comment)?;
    }
    map.end()
}

impl EntityReport {
    pub fn build(summary: &EntitySummary, records: &[ReviewRecord]) -> Self {
        let preview = |wanted: Sentiment| -> Vec<CommentPreview> {
            records
                .iter()
                .filter(|r| r.sentiment() == wanted)
                .take(PREVIEW_LIMIT)
                .map(CommentPreview::from)
                .collect()
        };

        Self {
            restaurant_info: EntityInfo {
                name: summary.entity_name.clone(),
                url: summary.source_url.clone(),
                parsed_at: summary.extracted_at.format(TIMESTAMP_FORMAT).to_string(),
            },
            user_comments: records.iter().map(UserComment::from).collect(),
            sentiment_analysis: SentimentStats::from(summary),
            positive_comments: preview(Sentiment::Positive),
            negative_comments: preview(Sentiment::Negative),
            neutral_comments: preview(Sentiment::Neutral),
        }
    }

    pub fn file_name(&self, unix_ts: i64) -> String {
        format!("reviews_{}_{}.json", safe_name(&self.restaurant_info.name), unix_ts)
    }

    /// Write the report as pretty JSON into `dir`, creating it if needed.
    pub async fn write(&self, dir: &Path, unix_ts: i64) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .context(format!("Failed to create output directory {}", dir.display()))?;

        let path = dir.join(self.file_name(unix_ts));
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        tokio::fs::write(&path, json)
            .await
            .context(format!("Failed to write report {}", path.display()))?;

        info!(path = %path.display(), reviews = self.user_comments.len(), "Report written");
        Ok(path)
    }
}

static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();

fn unsafe_chars() -> &'static Regex {
    UNSAFE_CHARS.get_or_init(|| Regex::new(r"[^\w\s-]").expect("unsafe-char regex must compile"))
}

/// File-name-safe form of an entity name: keeps word characters, whitespace
/// and `-`, trims, then turns spaces into underscores.
pub fn safe_name(name: &str) -> String {
    unsafe_chars().replace_all(name, "").trim().replace(' ', "_")
}
