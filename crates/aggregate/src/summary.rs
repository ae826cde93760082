use chrono::NaiveDateTime;
use extract::ReviewRecord;
use sentiment::Sentiment;
use serde::{Deserialize, Serialize};

/// Identity of the entity a batch of records belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub name: String,
    pub source_url: String,
    pub extracted_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub entity_name: String,
    pub source_url: String,
    pub extracted_at: NaiveDateTime,
    pub total_count: usize,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
}

impl EntitySummary {
    pub fn from_records(meta: EntityMeta, records: &[ReviewRecord]) -> Self {
        let counts = SentimentCounts::from_sentiments(records.iter().map(ReviewRecord::sentiment));

        Self {
            entity_name: meta.name,
            source_url: meta.source_url,
            extracted_at: meta.extracted_at,
            total_count: counts.total(),
            positive_count: counts.positive,
            negative_count: counts.negative,
            neutral_count: counts.neutral,
            positive_percentage: percentage(counts.positive, counts.total()),
            negative_percentage: percentage(counts.negative, counts.total()),
            neutral_percentage: percentage(counts.neutral, counts.total()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SentimentCounts {
    positive: usize,
    negative: usize,
    neutral: usize,
}

impl SentimentCounts {
    fn from_sentiments(sentiments: impl Iterator<Item = Sentiment>) -> Self {
        sentiments.fold(Self::default(), |mut counts, sentiment| {
            match sentiment {
                Sentiment::Positive => counts.positive += 1,
                Sentiment::Negative => counts.negative += 1,
                Sentiment::Neutral => counts.neutral += 1,
            }
            counts
        })
    }

    fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// `count / total * 100` rounded to two decimals; 0 for an empty total.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Order by positive percentage, highest first. Ties keep their input order.
pub fn rank(mut summaries: Vec<EntitySummary>) -> Vec<EntitySummary> {
    summaries.sort_by(|a, b| b.positive_percentage.total_cmp(&a.positive_percentage));
    summaries
}

/// Totals across every successfully processed entity of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    pub entities: usize,
    pub total_reviews: usize,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
}

impl RunTotals {
    pub fn from_summaries(summaries: &[EntitySummary]) -> Self {
        let positive_count: usize = summaries.iter().map(|s| s.positive_count).sum();
        let negative_count: usize = summaries.iter().map(|s| s.negative_count).sum();
        let neutral_count: usize = summaries.iter().map(|s| s.neutral_count).sum();
        let total_reviews: usize = summaries.iter().map(|s| s.total_count).sum();

        Self {
            entities: summaries.len(),
            total_reviews,
            positive_count,
            negative_count,
            neutral_count,
            positive_percentage: percentage(positive_count, total_reviews),
            negative_percentage: percentage(negative_count, total_reviews),
            neutral_percentage: percentage(neutral_count, total_reviews),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sentiment::SentimentAnalysis;

    pub(crate) fn record(text: &str, sentiment: Sentiment, score: i32) -> ReviewRecord {
        ReviewRecord {
            author: "Гость".to_string(),
            date: "1 мая".to_string(),
            stars: 4.0,
            text: text.to_string(),
            analysis: SentimentAnalysis {
                sentiment,
                raw_score: score,
                adjusted_score: score,
                positive_words: Vec::new(),
                negative_words: Vec::new(),
            },
        }
    }

    pub(crate) fn meta(name: &str) -> EntityMeta {
        EntityMeta {
            name: name.to_string(),
            source_url: format!("https://example.test/{}", name),
            extracted_at: NaiveDate::from_ymd_opt(2024, 3, 12)
                .and_then(|d| d.and_hms_opt(18, 30, 5))
                .unwrap(),
        }
    }

    fn summary(name: &str, positive: usize, negative: usize, neutral: usize) -> EntitySummary {
        let mut records = Vec::new();
        records.extend((0..positive).map(|_| record("хорошо", Sentiment::Positive, 4)));
        records.extend((0..negative).map(|_| record("плохо", Sentiment::Negative, -4)));
        records.extend((0..neutral).map(|_| record("обычно", Sentiment::Neutral, 0)));
        EntitySummary::from_records(meta(name), &records)
    }

    #[test]
    fn test_counts_and_percentages() {
        let s = summary("cafe", 2, 1, 0);

        assert_eq!(s.total_count, 3);
        assert_eq!(s.positive_percentage, 66.67);
        assert_eq!(s.negative_percentage, 33.33);
        assert_eq!(s.neutral_percentage, 0.0);
    }

    #[test]
    fn test_counts_sum_and_percentages_near_hundred() {
        for (p, n, u) in [(1, 1, 1), (7, 2, 5), (0, 3, 11), (13, 0, 0), (5, 9, 2)] {
            let s = summary("x", p, n, u);
            assert_eq!(s.positive_count + s.negative_count + s.neutral_count, s.total_count);

            let sum = s.positive_percentage + s.negative_percentage + s.neutral_percentage;
            assert!((sum - 100.0).abs() <= 0.02, "sum was {}", sum);
        }
    }

    #[test]
    fn test_empty_is_all_zero() {
        let s = EntitySummary::from_records(meta("empty"), &[]);

        assert_eq!(s.total_count, 0);
        assert_eq!(s.positive_percentage, 0.0);
        assert_eq!(s.negative_percentage, 0.0);
        assert_eq!(s.neutral_percentage, 0.0);
    }

    #[test]
    fn test_rank_is_descending_and_stable() {
        let ranked = rank(vec![
            summary("a", 1, 1, 0),
            summary("b", 3, 0, 0),
            summary("c", 2, 2, 0),
            summary("d", 0, 1, 0),
        ]);
        let names: Vec<_> = ranked.iter().map(|s| s.entity_name.as_str()).collect();

        assert_eq!(names, vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_run_totals() {
        let totals = RunTotals::from_summaries(&[summary("a", 3, 1, 0), summary("b", 0, 1, 3)]);

        assert_eq!(totals.entities, 2);
        assert_eq!(totals.total_reviews, 8);
        assert_eq!(totals.positive_count, 3);
        assert_eq!(totals.neutral_percentage, 37.5);
        assert_eq!(totals.negative_percentage, 25.0);

        assert_eq!(RunTotals::from_summaries(&[]), RunTotals::default());
    }
}
