use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::summary::round2;

/// Just the header blocks of a report file; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportHeader {
    pub restaurant_info: HeaderInfo,
    pub sentiment_analysis: HeaderStats,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeaderInfo {
    pub name: String,
    pub url: String,
    pub parsed_at: String,
}

impl Default for HeaderInfo {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            url: String::new(),
            parsed_at: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HeaderStats {
    pub total_comments: u64,
    pub positive_count: u64,
    pub negative_count: u64,
    pub neutral_count: u64,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
}

/// One flattened report, as loaded into the warehouse table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseRow {
    pub name: String,
    pub total: u64,
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub parsed_at: String,
    pub url: String,
}

impl WarehouseRow {
    pub fn from_report_header(header: ReportHeader) -> Self {
        let ReportHeader {
            restaurant_info: info,
            sentiment_analysis: stats,
        } = header;

        Self {
            name: info.name,
            total: stats.total_comments,
            positive: stats.positive_count,
            negative: stats.negative_count,
            neutral: stats.neutral_count,
            positive_pct: stats.positive_percentage,
            negative_pct: stats.negative_percentage,
            parsed_at: info.parsed_at,
            url: info.url,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let header: ReportHeader = serde_json::from_str(json).context("Malformed report file")?;
        Ok(Self::from_report_header(header))
    }
}

/// Every `*.json` report in `dir`, highest positive share first.
///
/// A missing directory yields no rows; unreadable or malformed files are
/// skipped with a warning.
pub async fn load_rows(dir: &Path) -> Result<Vec<WarehouseRow>> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        return Ok(Vec::new());
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .context(format!("Failed to read report directory {}", dir.display()))?;

    let mut rows = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .context(format!("Failed to list report directory {}", dir.display()))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let row = match tokio::fs::read_to_string(&path).await {
            Ok(json) => WarehouseRow::from_json(&json),
            Err(e) => Err(e.into()),
        };

        match row {
            Ok(row) => rows.push(row),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping report file"),
        }
    }

    // Directory order is arbitrary; sort by name first so ties are deterministic.
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows.sort_by(|a, b| b.positive_pct.total_cmp(&a.positive_pct));

    info!(rows = rows.len(), dir = %dir.display(), "Loaded warehouse rows");
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseStats {
    pub total_entities: usize,
    pub total_reviews: u64,
    pub total_positive: u64,
    pub total_negative: u64,
    pub total_neutral: u64,
    pub avg_positive: f64,
}

impl WarehouseStats {
    /// `None` when there is nothing to summarize.
    pub fn from_rows(rows: &[WarehouseRow]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let total_reviews = rows.iter().map(|r| r.total).sum();
        let avg_positive = rows.iter().map(|r| r.positive_pct).sum::<f64>() / rows.len() as f64;

        Some(Self {
            total_entities: rows.len(),
            total_reviews,
            total_positive: rows.iter().map(|r| r.positive).sum(),
            total_negative: rows.iter().map(|r| r.negative).sum(),
            total_neutral: rows.iter().map(|r| r.neutral).sum(),
            avg_positive: round2(avg_positive),
        })
    }
}

/// What the dashboard should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DashboardView {
    Ready {
        rows: Vec<WarehouseRow>,
        stats: WarehouseStats,
    },
    NoData,
    ConnectionError { message: String },
}

impl DashboardView {
    pub fn from_rows(loaded: Result<Vec<WarehouseRow>>) -> Self {
        match loaded {
            Err(e) => DashboardView::ConnectionError {
                message: format!("{:#}", e),
            },
            Ok(rows) => match WarehouseStats::from_rows(&rows) {
                Some(stats) => DashboardView::Ready { rows, stats },
                None => DashboardView::NoData,
            },
        }
    }

    pub async fn load(dir: &Path) -> Self {
        Self::from_rows(load_rows(dir).await)
    }
}
