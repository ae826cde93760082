use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fuser::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symmetric threshold classifier over adjusted scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    threshold: i32,
}

impl Classifier {
    pub fn new(threshold: i32) -> Result<Self, PolicyError> {
        if threshold < 1 {
            return Err(PolicyError::BelowOne { field: "threshold", value: threshold });
        }
        Ok(Self { threshold })
    }

    pub fn classify(&self, score: i32) -> Sentiment {
        if score >= self.threshold {
            Sentiment::Positive
        } else if score <= -self.threshold {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        let classifier = Classifier::new(3).unwrap();
        assert_eq!(classifier.classify(3), Sentiment::Positive);
        assert_eq!(classifier.classify(2), Sentiment::Neutral);
        assert_eq!(classifier.classify(-2), Sentiment::Neutral);
        assert_eq!(classifier.classify(-3), Sentiment::Negative);
        assert_eq!(classifier.classify(0), Sentiment::Neutral);
    }

    #[test]
    fn test_symmetry() {
        for threshold in 1..=5 {
            let classifier = Classifier::new(threshold).unwrap();
            for score in -50..=50 {
                let pos = classifier.classify(score) == Sentiment::Positive;
                let neg = classifier.classify(-score) == Sentiment::Negative;
                assert_eq!(pos, neg, "threshold {} score {}", threshold, score);
                if score.abs() < threshold {
                    assert_eq!(classifier.classify(score), Sentiment::Neutral);
                }
            }
        }
    }

    #[test]
    fn test_total_over_extremes() {
        let classifier = Classifier::new(1).unwrap();
        assert_eq!(classifier.classify(i32::MAX), Sentiment::Positive);
        assert_eq!(classifier.classify(i32::MIN), Sentiment::Negative);
    }

    #[test]
    fn test_rejects_zero_threshold() {
        assert!(Classifier::new(0).is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sentiment::Neutral).unwrap(), "\"neutral\"");
        assert_eq!(Sentiment::Positive.to_string(), "positive");
    }
}
