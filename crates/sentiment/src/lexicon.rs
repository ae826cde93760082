use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const POSITIVE_WORDS: &[&str] = &[
    "отлично", "прекрасно", "хорошо", "рекомендую", "супер",
    "отличный", "замечательно", "великолепно", "восхитительно",
    "удовлетворен", "понравилось", "люблю", "обожаю", "восторг",
    "прекрасный", "хороший", "отличное", "класс", "топ", "лучший",
    "вкусно", "вкусный", "уютно", "чисто", "быстро", "вежливо",
    "потрясающе", "шикарно", "безупречно", "идеально", "нравится",
    "доволен", "приятно", "восхищение", "наслаждение", "обалденно",
    "превосходно", "сказочно", "чудесно", "невероятно", "фантастически",
    "кайф", "удовольствие", "рад", "счастлив", "довольна",
];

const NEGATIVE_WORDS: &[&str] = &[
    "плохо", "ужасно", "отвратительно", "недоволен", "не рекомендую",
    "кошмар", "разочарован", "жутко", "гадость", "отвратительный",
    "плохой", "неприятно", "отвратительное", "ужасный", "не понравилось",
    "ненавижу", "отвращение", "ужас", "позор", "отвратно", "грубо",
    "грязно", "долго", "дорого", "пересолено", "недоварено", "пережарено",
    "несвежий", "неопрятно", "хамство", "бесит", "раздражает", "зря",
    "напутали", "перепутали", "обманули", "кинули", "обсчитали",
    "переплатил", "недовольна", "злюсь", "возмущена",
];

#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("lexicon entry {word:?} cannot be compiled")]
    InvalidEntry {
        word: String,
        #[source]
        source: regex::Error,
    },
}

/// Word lists as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconWords {
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
}

/// One trigger word (or phrase) with its whole-word matcher.
#[derive(Debug, Clone)]
pub struct LexiconEntry {
    word: String,
    pattern: Regex,
}

impl LexiconEntry {
    fn compile(word: String) -> Result<Self, LexiconError> {
        // Phrases tolerate any run of whitespace between their words
        let body = word
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");

        let pattern = Regex::new(&format!(r"\b{}\b", body))
            .map_err(|source| LexiconError::InvalidEntry { word: word.clone(), source })?;

        Ok(Self { word, pattern })
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// `text` must already be lowercased.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Immutable positive/negative trigger sets, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: Vec<LexiconEntry>,
    negative: Vec<LexiconEntry>,
}

impl Lexicon {
    pub fn new<P, N>(positive: P, negative: N) -> Result<Self, LexiconError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        N: IntoIterator,
        N::Item: AsRef<str>,
    {
        Ok(Self {
            positive: Self::compile_all(positive)?,
            negative: Self::compile_all(negative)?,
        })
    }

    /// The restaurant-review lexicon the scraper ships with.
    pub fn builtin() -> Result<Self, LexiconError> {
        Self::new(POSITIVE_WORDS.iter(), NEGATIVE_WORDS.iter())
    }

    pub fn from_words(words: LexiconWords) -> Result<Self, LexiconError> {
        Self::new(words.positive, words.negative)
    }

    /// Load a `{"positive": [...], "negative": [...]}` JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read lexicon file: {:?}", path))?;
        let words: LexiconWords = serde_json::from_str(&content)
            .context(format!("Failed to parse lexicon file: {:?}", path))?;
        Ok(Self::from_words(words)?)
    }

    pub fn positive(&self) -> &[LexiconEntry] {
        &self.positive
    }

    pub fn negative(&self) -> &[LexiconEntry] {
        &self.negative
    }

    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    fn compile_all<I>(words: I) -> Result<Vec<LexiconEntry>, LexiconError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for word in words {
            let normalized = normalize(word.as_ref());
            if normalized.is_empty() || !seen.insert(normalized.clone()) {
                continue;
            }
            entries.push(LexiconEntry::compile(normalized)?);
        }

        Ok(entries)
    }
}

/// Lowercase, trim and collapse inner whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_normalization_and_dedup() {
        let lexicon = Lexicon::new(["  Вкусно ", "вкусно", "", "Не  Рекомендую"], ["бесит", "бесит"]).unwrap();

        let positive: Vec<&str> = lexicon.positive().iter().map(|e| e.word()).collect();
        assert_eq!(positive, vec!["вкусно", "не рекомендую"]);
        assert_eq!(lexicon.negative().len(), 1);
        assert_eq!(lexicon.len(), 3);
    }

    #[test]
    fn test_builtin_has_no_duplicates() {
        let lexicon = Lexicon::builtin().unwrap();
        let unique: HashSet<&str> = lexicon.negative().iter().map(|e| e.word()).collect();
        assert_eq!(unique.len(), lexicon.negative().len());
        assert!(!lexicon.is_empty());
    }

    #[test]
    fn test_phrase_matches_across_whitespace() {
        let lexicon = Lexicon::new(Vec::<String>::new(), ["не рекомендую"]).unwrap();
        assert!(lexicon.negative()[0].matches("я  не\nрекомендую это место"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"positive": ["good"], "negative": ["bad", "awful"]}}"#).unwrap();

        let lexicon = Lexicon::from_file(file.path()).unwrap();
        assert_eq!(lexicon.positive().len(), 1);
        assert_eq!(lexicon.negative().len(), 2);
    }
}
