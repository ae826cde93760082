pub mod classifier;
pub mod fuser;
pub mod lexicon;
pub mod scorer;

pub use classifier::{Classifier, Sentiment};
pub use fuser::{PolicyError, ScoringPolicy, StarTier, MAX_POLICY_VALUE};
pub use lexicon::{Lexicon, LexiconError, LexiconWords};
pub use scorer::{score, LexiconHits};

use serde::{Deserialize, Serialize};

/// Everything the analyzer decided about one text, kept for auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    pub raw_score: i32,
    pub adjusted_score: i32,
    pub positive_words: Vec<String>,
    pub negative_words: Vec<String>,
}

/// Scorer, fuser and classifier wired to one lexicon and policy.
#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    lexicon: Lexicon,
    policy: ScoringPolicy,
    classifier: Classifier,
}

impl SentimentAnalyzer {
    pub fn new(lexicon: Lexicon, policy: ScoringPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        let classifier = Classifier::new(policy.threshold)?;

        Ok(Self {
            lexicon,
            policy,
            classifier,
        })
    }

    /// Score `text`, fold in the star rating and classify.
    pub fn analyze(&self, text: &str, stars: f64) -> SentimentAnalysis {
        let hits = score(text, &self.lexicon);
        let raw_score = self.policy.base_score(&hits);
        let adjusted_score = self.policy.fuse(&hits, stars);

        SentimentAnalysis {
            sentiment: self.classifier.classify(adjusted_score),
            raw_score,
            adjusted_score,
            positive_words: hits.positive,
            negative_words: hits.negative,
        }
    }
}
