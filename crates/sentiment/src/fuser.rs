use serde::{Deserialize, Serialize};

use crate::scorer::LexiconHits;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("{field} must be at least 1, got {value}")]
    BelowOne { field: &'static str, value: i32 },

    #[error("{field} must be at most {max}, got {value}")]
    AboveLimit { field: &'static str, value: i32, max: i32 },

    #[error("star tier threshold {0} is outside [0, 5]")]
    TierOutOfRange(f64),

    #[error("star tiers at {lower} and {upper} are not monotonic")]
    NonMonotonicTiers { lower: f64, upper: f64 },
}

/// Upper bound for weights, threshold and tier bonus magnitude.
pub const MAX_POLICY_VALUE: i32 = 1000;

/// Bonus applied when the rating is at least `min_stars`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StarTier {
    pub min_stars: f64,
    pub bonus: i32,
}

impl StarTier {
    pub const fn new(min_stars: f64, bonus: i32) -> Self {
        Self { min_stars, bonus }
    }
}

/// Weights, star tiers and the classification threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub positive_weight: i32,
    pub negative_weight: i32,
    pub star_tiers: Vec<StarTier>,
    pub threshold: i32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

impl ScoringPolicy {
    /// Double word weights, fine-grained star tiers, threshold 3.
    pub fn strict() -> Self {
        Self {
            positive_weight: 2,
            negative_weight: 2,
            star_tiers: vec![
                StarTier::new(4.5, 4),
                StarTier::new(4.0, 3),
                StarTier::new(3.5, 2),
                StarTier::new(3.0, 1),
                StarTier::new(2.5, -1),
                StarTier::new(1.5, -2),
                StarTier::new(0.0, -3),
            ],
            threshold: 3,
        }
    }

    /// Unit word weights, coarse star tiers, threshold 2.
    pub fn lenient() -> Self {
        Self {
            positive_weight: 1,
            negative_weight: 1,
            star_tiers: vec![
                StarTier::new(4.0, 2),
                StarTier::new(3.0, 1),
                StarTier::new(2.5, 0),
                StarTier::new(1.5, -2),
                StarTier::new(0.0, -3),
            ],
            threshold: 2,
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for (field, value) in [
            ("positive_weight", self.positive_weight),
            ("negative_weight", self.negative_weight),
            ("threshold", self.threshold),
        ] {
            if value < 1 {
                return Err(PolicyError::BelowOne { field, value });
            }
            if value > MAX_POLICY_VALUE {
                return Err(PolicyError::AboveLimit {
                    field,
                    value,
                    max: MAX_POLICY_VALUE,
                });
            }
        }

        if let Some(tier) = self
            .star_tiers
            .iter()
            .find(|t| t.bonus.unsigned_abs() > MAX_POLICY_VALUE.unsigned_abs())
        {
            return Err(PolicyError::AboveLimit {
                field: "star_tiers.bonus",
                value: tier.bonus,
                max: MAX_POLICY_VALUE,
            });
        }

        if let Some(tier) = self
            .star_tiers
            .iter()
            .find(|t| !(0.0..=5.0).contains(&t.min_stars))
        {
            return Err(PolicyError::TierOutOfRange(tier.min_stars));
        }

        let mut tiers = self.star_tiers.clone();
        tiers.sort_by(|a, b| a.min_stars.total_cmp(&b.min_stars));

        // Ratings below the lowest tier get an implicit bonus of 0.
        if let Some(lowest) = tiers.first() {
            if lowest.min_stars > 0.0 && lowest.bonus < 0 {
                return Err(PolicyError::NonMonotonicTiers {
                    lower: 0.0,
                    upper: lowest.min_stars,
                });
            }
        }

        for pair in tiers.windows(2) {
            if pair[0].min_stars == pair[1].min_stars || pair[0].bonus > pair[1].bonus {
                return Err(PolicyError::NonMonotonicTiers {
                    lower: pair[0].min_stars,
                    upper: pair[1].min_stars,
                });
            }
        }

        Ok(())
    }

    /// Weighted lexicon score before the rating is considered.
    pub fn base_score(&self, hits: &LexiconHits) -> i32 {
        let weighted = |count: usize, weight: i32| {
            i32::try_from(count).unwrap_or(i32::MAX).saturating_mul(weight)
        };
        weighted(hits.positive.len(), self.positive_weight)
            .saturating_sub(weighted(hits.negative.len(), self.negative_weight))
    }

    /// Step function over the tiers. A missing rating (0) adds nothing.
    pub fn star_adjustment(&self, stars: f64) -> i32 {
        if !(stars > 0.0) {
            return 0;
        }

        self.star_tiers
            .iter()
            .filter(|tier| stars >= tier.min_stars)
            .max_by(|a, b| a.min_stars.total_cmp(&b.min_stars))
            .map(|tier| tier.bonus)
            .unwrap_or(0)
    }

    pub fn fuse(&self, hits: &LexiconHits, stars: f64) -> i32 {
        self.base_score(hits).saturating_add(self.star_adjustment(stars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(positive: usize, negative: usize) -> LexiconHits {
        LexiconHits {
            positive: (0..positive).map(|i| format!("p{}", i)).collect(),
            negative: (0..negative).map(|i| format!("n{}", i)).collect(),
        }
    }

    fn half_steps() -> impl Iterator<Item = f64> {
        (1..=10).map(|i| i as f64 * 0.5)
    }

    #[test]
    fn test_presets_are_valid() {
        assert_eq!(ScoringPolicy::strict().validate(), Ok(()));
        assert_eq!(ScoringPolicy::lenient().validate(), Ok(()));
    }

    #[test]
    fn test_base_score_uses_weights() {
        let policy = ScoringPolicy::strict();
        assert_eq!(policy.base_score(&hits(1, 1)), 0);
        assert_eq!(policy.base_score(&hits(3, 1)), 4);
        assert_eq!(policy.base_score(&hits(0, 2)), -4);
    }

    #[test]
    fn test_zero_stars_adds_nothing() {
        let policy = ScoringPolicy::strict();
        assert_eq!(policy.star_adjustment(0.0), 0);
        assert_eq!(policy.star_adjustment(f64::NAN), 0);
    }

    #[test]
    fn test_strict_tiers() {
        let policy = ScoringPolicy::strict();
        let expected = [-3, -3, -2, -2, -1, 1, 2, 3, 4, 4];
        let actual: Vec<i32> = half_steps().map(|s| policy.star_adjustment(s)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_adjustment_is_monotonic() {
        for policy in [ScoringPolicy::strict(), ScoringPolicy::lenient()] {
            for h in [hits(0, 0), hits(2, 1), hits(0, 3)] {
                let scores: Vec<i32> = half_steps().map(|s| policy.fuse(&h, s)).collect();
                assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{:?}", scores);
            }
        }
    }

    #[test]
    fn test_rejects_non_monotonic_tiers() {
        let policy = ScoringPolicy {
            star_tiers: vec![StarTier::new(4.0, 1), StarTier::new(2.0, 3)],
            ..ScoringPolicy::strict()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::NonMonotonicTiers { lower: 2.0, upper: 4.0 })
        );
    }

    #[test]
    fn test_rejects_bad_weights_and_ranges() {
        let policy = ScoringPolicy { threshold: 0, ..ScoringPolicy::strict() };
        assert!(matches!(policy.validate(), Err(PolicyError::BelowOne { field: "threshold", .. })));

        let policy = ScoringPolicy {
            star_tiers: vec![StarTier::new(6.0, 1)],
            ..ScoringPolicy::strict()
        };
        assert_eq!(policy.validate(), Err(PolicyError::TierOutOfRange(6.0)));
    }

    #[test]
    fn test_rejects_negative_lowest_tier_above_zero() {
        let policy = ScoringPolicy {
            star_tiers: vec![StarTier::new(2.0, -2), StarTier::new(4.0, 2)],
            ..ScoringPolicy::strict()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::NonMonotonicTiers { lower: 0.0, upper: 2.0 })
        );

        let policy = ScoringPolicy {
            star_tiers: vec![StarTier::new(2.0, 0), StarTier::new(4.0, 2)],
            ..ScoringPolicy::strict()
        };
        assert_eq!(policy.validate(), Ok(()));
        let scores: Vec<i32> = half_steps().map(|s| policy.star_adjustment(s)).collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{:?}", scores);
    }

    #[test]
    fn test_rejects_oversized_values() {
        let policy = ScoringPolicy {
            positive_weight: i32::MAX / 2,
            ..ScoringPolicy::strict()
        };
        assert_eq!(
            policy.validate(),
            Err(PolicyError::AboveLimit {
                field: "positive_weight",
                value: i32::MAX / 2,
                max: MAX_POLICY_VALUE,
            })
        );

        let policy = ScoringPolicy {
            star_tiers: vec![StarTier::new(0.0, i32::MIN)],
            ..ScoringPolicy::strict()
        };
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::AboveLimit { field: "star_tiers.bonus", .. })
        ));
    }

    #[test]
    fn test_large_weights_saturate() {
        let policy = ScoringPolicy {
            positive_weight: i32::MAX / 2,
            negative_weight: i32::MAX / 2,
            ..ScoringPolicy::strict()
        };
        assert_eq!(policy.base_score(&hits(3, 0)), i32::MAX);
        assert_eq!(policy.fuse(&hits(3, 0), 5.0), i32::MAX);
        assert_eq!(policy.base_score(&hits(0, 3)), -i32::MAX);
        assert_eq!(policy.fuse(&hits(0, 3), 1.0), i32::MIN);
    }

    #[test]
    fn test_partial_policy_deserializes_with_defaults() {
        let policy: ScoringPolicy = serde_json::from_str(r#"{"threshold": 5}"#).unwrap();
        assert_eq!(policy.threshold, 5);
        assert_eq!(policy.positive_weight, 2);
    }
}
