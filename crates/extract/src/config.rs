use serde::{Deserialize, Serialize};

use crate::locator::{RatingLocator, TextLocator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub author: Vec<TextLocator>,
    pub date: Vec<TextLocator>,
    pub text: Vec<TextLocator>,
    pub rating: Vec<RatingLocator>,
    /// Shorter texts (trimmed, in characters) are discarded.
    pub min_text_chars: usize,
    /// Control captions that text locators sometimes pick up.
    pub ui_artifacts: Vec<String>,
    pub anonymous_author: String,
}

fn css(selector: &str) -> TextLocator {
    TextLocator::Css { selector: selector.to_string() }
}

fn attr(selector: &str, attr: &str) -> TextLocator {
    TextLocator::Attr {
        selector: selector.to_string(),
        attr: attr.to_string(),
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            author: vec![
                css(".business-review-view__author a"),
                css(".business-review-view__author"),
                attr(r#"[itemprop="author"] meta[itemprop="name"]"#, "content"),
            ],
            date: vec![
                css(".business-review-view__date"),
                attr(r#"meta[itemprop="datePublished"]"#, "content"),
            ],
            text: vec![
                css(".business-review-view__body-text"),
                css(r#"[class*="body"]"#),
                TextLocator::Rendered { max_chars: 500 },
            ],
            rating: vec![
                RatingLocator::StarWidget {
                    container: ".business-rating-badge-view__stars".to_string(),
                    star: "span".to_string(),
                    empty_marker: "_empty".to_string(),
                    half_marker: "_half".to_string(),
                },
                RatingLocator::Numeric {
                    selector: ".business-rating-badge-view__rating-text".to_string(),
                },
                RatingLocator::NumericAttr {
                    selector: r#"meta[itemprop="ratingValue"]"#.to_string(),
                    attr: "content".to_string(),
                },
            ],
            min_text_chars: 10,
            ui_artifacts: vec!["Подписаться".to_string()],
            anonymous_author: "anonymous".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locators_round_trip_through_json() {
        let json = r#"{
            "text": [
                {"kind": "css", "selector": ".review-text"},
                {"kind": "rendered", "max_chars": 200}
            ],
            "min_text_chars": 5
        }"#;
        let config: ExtractionConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.text.len(), 2);
        assert_eq!(config.text[1], TextLocator::Rendered { max_chars: 200 });
        assert_eq!(config.min_text_chars, 5);
        assert_eq!(config.author, ExtractionConfig::default().author);
    }
}
