//! Ordered per-field locator chains.
//!
//! Each field of a review is resolved by trying its locators in order until
//! one yields a usable value. Locators are plain data in [`ExtractionConfig`]
//! and are compiled once when the extractor is built.
//!
//! [`ExtractionConfig`]: crate::config::ExtractionConfig

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::RawElement;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector {selector:?}: {reason}")]
pub struct InvalidSelector {
    pub selector: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextLocator {
    /// Text of the first non-empty element matching a CSS selector.
    Css { selector: String },
    /// Attribute value of the first element matching a CSS selector.
    Attr { selector: String, attr: String },
    /// Rendered text of the whole review element, truncated.
    Rendered { max_chars: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatingLocator {
    /// Graphical widget: one `star` element per star, flagged by class markers.
    StarWidget {
        container: String,
        star: String,
        empty_marker: String,
        half_marker: String,
    },
    /// Printed rating such as "4" or "4,5".
    Numeric { selector: String },
    NumericAttr { selector: String, attr: String },
}

fn parse_selector(selector: &str) -> Result<Selector, InvalidSelector> {
    Selector::parse(selector).map_err(|e| InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

#[derive(Debug, Clone)]
enum TextSource {
    Css(Selector),
    Attr { selector: Selector, attr: String },
    Rendered { max_chars: usize },
}

impl TextSource {
    fn compile(locator: &TextLocator) -> Result<Self, InvalidSelector> {
        Ok(match locator {
            TextLocator::Css { selector } => TextSource::Css(parse_selector(selector)?),
            TextLocator::Attr { selector, attr } => TextSource::Attr {
                selector: parse_selector(selector)?,
                attr: attr.clone(),
            },
            TextLocator::Rendered { max_chars } => TextSource::Rendered { max_chars: *max_chars },
        })
    }

    fn resolve(&self, doc: &Html, raw: &RawElement) -> Option<String> {
        let value = match self {
            TextSource::Css(selector) => doc
                .select(selector)
                .map(element_text)
                .find(|text| !text.is_empty())?,
            TextSource::Attr { selector, attr } => doc
                .select(selector)
                .find_map(|el| el.value().attr(attr))
                .map(collapse_whitespace)?,
            TextSource::Rendered { max_chars } => {
                let truncated: String = raw.rendered_text.chars().take(*max_chars).collect();
                collapse_whitespace(&truncated)
            }
        };

        (!value.is_empty()).then_some(value)
    }
}

/// Ordered text locators for one field.
#[derive(Debug, Clone)]
pub struct TextChain {
    field: &'static str,
    sources: Vec<TextSource>,
}

impl TextChain {
    pub fn compile(field: &'static str, locators: &[TextLocator]) -> Result<Self, InvalidSelector> {
        let sources = locators.iter().map(TextSource::compile).collect::<Result<_, _>>()?;
        Ok(Self { field, sources })
    }

    /// First non-empty candidate that `accept` agrees to.
    pub fn resolve(
        &self,
        doc: &Html,
        raw: &RawElement,
        mut accept: impl FnMut(&str) -> bool,
    ) -> Option<String> {
        for (index, source) in self.sources.iter().enumerate() {
            let Some(value) = source.resolve(doc, raw) else {
                continue;
            };
            if !accept(&value) {
                continue;
            }
            if index > 0 {
                debug!(field = self.field, locator = index, "Resolved via fallback locator");
            }
            return Some(value);
        }
        None
    }
}

#[derive(Debug, Clone)]
enum RatingSource {
    StarWidget {
        container: Selector,
        star: Selector,
        empty_marker: String,
        half_marker: String,
    },
    Numeric(Selector),
    NumericAttr { selector: Selector, attr: String },
}

impl RatingSource {
    fn compile(locator: &RatingLocator) -> Result<Self, InvalidSelector> {
        Ok(match locator {
            RatingLocator::StarWidget { container, star, empty_marker, half_marker } => {
                RatingSource::StarWidget {
                    container: parse_selector(container)?,
                    star: parse_selector(star)?,
                    empty_marker: empty_marker.clone(),
                    half_marker: half_marker.clone(),
                }
            }
            RatingLocator::Numeric { selector } => RatingSource::Numeric(parse_selector(selector)?),
            RatingLocator::NumericAttr { selector, attr } => RatingSource::NumericAttr {
                selector: parse_selector(selector)?,
                attr: attr.clone(),
            },
        })
    }

    fn resolve(&self, doc: &Html) -> Option<f64> {
        match self {
            RatingSource::StarWidget { container, star, empty_marker, half_marker } => {
                let container = doc.select(container).next()?;
                let count = container
                    .select(star)
                    .map(|el| {
                        let class = el.value().attr("class").unwrap_or("");
                        if class.contains(empty_marker.as_str()) {
                            0.0
                        } else if class.contains(half_marker.as_str()) {
                            0.5
                        } else {
                            1.0
                        }
                    })
                    .sum::<f64>();
                Some(count)
            }
            RatingSource::Numeric(selector) => {
                doc.select(selector).find_map(|el| parse_rating(&element_text(el)))
            }
            RatingSource::NumericAttr { selector, attr } => doc
                .select(selector)
                .find_map(|el| el.value().attr(attr).and_then(parse_rating)),
        }
    }
}

/// Ordered rating locators. Zero counts as "not found".
#[derive(Debug, Clone)]
pub struct RatingChain {
    sources: Vec<RatingSource>,
}

impl RatingChain {
    pub fn compile(locators: &[RatingLocator]) -> Result<Self, InvalidSelector> {
        let sources = locators.iter().map(RatingSource::compile).collect::<Result<_, _>>()?;
        Ok(Self { sources })
    }

    pub fn resolve(&self, doc: &Html) -> Option<f64> {
        self.sources
            .iter()
            .filter_map(|source| source.resolve(doc))
            .map(snap_to_half)
            .find(|stars| *stars > 0.0)
    }
}

fn parse_rating(text: &str) -> Option<f64> {
    let value: f64 = text.trim().replace(',', ".").parse().ok()?;
    (value.is_finite() && (0.0..=5.0).contains(&value)).then_some(value)
}

/// Round to the nearest half star and clamp to [0, 5].
pub fn snap_to_half(stars: f64) -> f64 {
    ((stars * 2.0).round() / 2.0).clamp(0.0, 5.0)
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
