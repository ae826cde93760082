use serde::{Deserialize, Serialize};

use crate::lexicon::Lexicon;

/// Lexicon words found in a text, in lexicon order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconHits {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl LexiconHits {
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }
}

/// Whole-word lexicon match. Every distinct entry counts at most once.
pub fn score(text: &str, lexicon: &Lexicon) -> LexiconHits {
    if text.trim().is_empty() {
        return LexiconHits::default();
    }

    let text = text.to_lowercase();

    let positive = lexicon
        .positive()
        .iter()
        .filter(|entry| entry.matches(&text))
        .map(|entry| entry.word().to_string())
        .collect();

    let negative = lexicon
        .negative()
        .iter()
        .filter(|entry| entry.matches(&text))
        .map(|entry| entry.word().to_string())
        .collect();

    LexiconHits { positive, negative }
}
