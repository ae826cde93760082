use anyhow::{Context, Result};
use extract::{RawElement, ReviewExtractor, ReviewRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{Browser, ElementHandle, Locator};
use crate::clock::Sleeper;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    pub initial_settle_ms: u64,
    pub scroll_wait_ms: u64,
    pub post_scroll_settle_ms: u64,
    pub element_pause_ms: u64,
    pub max_scroll_attempts: usize,
    pub scroll_container: String,
    pub load_more_xpath: String,
    pub review_selector: String,
    pub fallback_review_selector: String,
    /// Below this many primary matches the loose selector is tried too.
    pub min_primary_elements: usize,
    pub title_selector: String,
    pub unknown_entity_name: String,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            initial_settle_ms: 5000,
            scroll_wait_ms: 3000,
            post_scroll_settle_ms: 3000,
            element_pause_ms: 300,
            max_scroll_attempts: 8,
            scroll_container: ".business-reviews-card-view__reviews".to_string(),
            load_more_xpath:
                "//button[contains(text(), 'Показать ещё') or contains(text(), 'Ещё отзывы')]"
                    .to_string(),
            review_selector: ".business-review-view".to_string(),
            fallback_review_selector: r#"[class*="review"]"#.to_string(),
            min_primary_elements: 10,
            title_selector: "h1.orgpage-header-view__header".to_string(),
            unknown_entity_name: "unknown entity".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalState {
    Loading,
    ScrollingForMore,
    Stable,
    ExhaustedAttempts,
    Extracting,
    Done,
}

/// How the scroll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Convergence {
    /// Height stopped changing and no "load more" control could be used.
    Stable { attempts: usize },
    /// The attempt cap was hit first.
    ExhaustedAttempts { attempts: usize },
}

impl Convergence {
    pub fn attempts(&self) -> usize {
        match self {
            Convergence::Stable { attempts } | Convergence::ExhaustedAttempts { attempts } => *attempts,
        }
    }

    fn state(&self) -> TraversalState {
        match self {
            Convergence::Stable { .. } => TraversalState::Stable,
            Convergence::ExhaustedAttempts { .. } => TraversalState::ExhaustedAttempts,
        }
    }
}

/// Records of one page plus the tallies of what was left out.
#[derive(Debug, Clone, Default)]
pub struct ExtractionTally {
    pub records: Vec<ReviewRecord>,
    pub elements_found: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    pub records: Vec<ReviewRecord>,
    pub elements_found: usize,
    pub skipped: usize,
    pub failed: usize,
    pub convergence: Convergence,
    pub states: Vec<TraversalState>,
}

/// Drives one review page from navigation to extracted records.
pub struct PageTraversal {
    config: TraversalConfig,
    extractor: ReviewExtractor,
    sleeper: Arc<dyn Sleeper>,
}

impl PageTraversal {
    pub fn new(config: TraversalConfig, extractor: ReviewExtractor, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            config,
            extractor,
            sleeper,
        }
    }

    pub async fn pause(&self, millis: u64) {
        if millis > 0 {
            self.sleeper.sleep(Duration::from_millis(millis)).await;
        }
    }

    /// Navigate and wait for the initial content to settle.
    pub async fn open<B: Browser + ?Sized>(&self, browser: &mut B, url: &str) -> Result<()> {
        browser.navigate(url).await?;
        self.pause(self.config.initial_settle_ms).await;
        Ok(())
    }

    /// Entity name from the page header, for targets configured without one.
    pub async fn read_entity_name<B: Browser + ?Sized>(&self, browser: &mut B) -> String {
        let locator = Locator::css(&self.config.title_selector);
        let title = match browser.find_elements(&locator).await {
            Ok(elements) => match elements.first() {
                Some(element) => browser.element_text(element).await.ok(),
                None => None,
            },
            Err(e) => {
                debug!(error = %e, "Page title lookup failed");
                None
            }
        };

        title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.config.unknown_entity_name.clone())
    }

    /// Scroll until the page stops growing or the attempt cap is reached.
    pub async fn load_all<B: Browser + ?Sized>(&self, browser: &mut B) -> Result<Convergence> {
        let max_attempts = self.config.max_scroll_attempts;
        let mut last_height = browser
            .page_height()
            .await
            .context("Failed to read page height")?;
        let mut attempts = 0;

        while attempts < max_attempts {
            browser
                .scroll_to_bottom(&self.config.scroll_container)
                .await
                .context("Failed to scroll review list")?;
            self.pause(self.config.scroll_wait_ms).await;

            let new_height = browser
                .page_height()
                .await
                .context("Failed to read page height")?;

            if new_height == last_height {
                if !self.click_load_more(browser).await {
                    info!(attempts, height = new_height, "Review list is stable");
                    return Ok(Convergence::Stable { attempts });
                }
                self.pause(self.config.scroll_wait_ms).await;
            }

            last_height = new_height;
            attempts += 1;
            debug!(attempt = attempts, max_attempts, height = new_height, "Scroll step finished");
        }

        info!(attempts, "Scroll attempt cap reached");
        Ok(Convergence::ExhaustedAttempts { attempts })
    }

    async fn click_load_more<B: Browser + ?Sized>(&self, browser: &mut B) -> bool {
        let locator = Locator::xpath(&self.config.load_more_xpath);
        let button = match browser.find_elements(&locator).await {
            Ok(elements) => elements.into_iter().next(),
            Err(e) => {
                debug!(error = %e, "Load-more lookup failed");
                None
            }
        };

        let Some(button) = button else {
            return false;
        };

        match browser.click(&button).await {
            Ok(()) => {
                info!("Clicked load-more control");
                true
            }
            Err(e) => {
                debug!(error = %e, "Load-more click failed");
                false
            }
        }
    }

    /// Review elements currently on the page, widening to the loose selector
    /// when the primary one finds suspiciously few.
    pub async fn locate_reviews<B: Browser + ?Sized>(&self, browser: &mut B) -> Result<Vec<ElementHandle>> {
        let primary = browser
            .find_elements(&Locator::css(&self.config.review_selector))
            .await
            .context("Failed to locate review elements")?;
        info!(count = primary.len(), "Found review elements");

        if primary.len() >= self.config.min_primary_elements {
            return Ok(primary);
        }

        match browser
            .find_elements(&Locator::css(&self.config.fallback_review_selector))
            .await
        {
            Ok(loose) if loose.len() > primary.len() => {
                info!(count = loose.len(), "Using loose review selector");
                Ok(loose)
            }
            Ok(_) => Ok(primary),
            Err(e) => {
                warn!(error = %e, "Loose review selector failed");
                Ok(primary)
            }
        }
    }

    async fn read_element<B: Browser + ?Sized>(
        &self,
        browser: &mut B,
        element: &ElementHandle,
    ) -> Result<RawElement> {
        browser.scroll_into_view(element).await?;
        self.pause(self.config.element_pause_ms).await;

        let outer_html = browser.element_html(element).await?;
        let rendered_text = match browser.element_text(element).await {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "Rendered text unavailable");
                String::new()
            }
        };

        Ok(RawElement {
            outer_html,
            rendered_text,
        })
    }

    /// Run the extractor over every located element in page order.
    pub async fn extract_all<B: Browser + ?Sized>(&self, browser: &mut B) -> Result<ExtractionTally> {
        let elements = self.locate_reviews(browser).await?;
        let mut tally = ExtractionTally {
            elements_found: elements.len(),
            ..Default::default()
        };

        for (index, element) in elements.iter().enumerate() {
            let raw = match self.read_element(browser, element).await {
                Ok(raw) => raw,
                Err(e) => {
                    tally.failed += 1;
                    warn!(index, error = %e, "Failed to read review element");
                    continue;
                }
            };

            match self.extractor.extract(&raw) {
                Ok(record) => {
                    tally.records.push(record);
                    if tally.records.len() % 10 == 0 {
                        debug!(processed = tally.records.len(), total = elements.len(), "Extraction progress");
                    }
                }
                Err(reason) => {
                    tally.skipped += 1;
                    debug!(index, %reason, "Skipped review element");
                }
            }
        }

        Ok(tally)
    }

    /// Loading → ScrollingForMore → Stable | ExhaustedAttempts → Extracting → Done.
    pub async fn traverse<B: Browser + ?Sized>(&self, browser: &mut B, url: &str) -> Result<TraversalOutcome> {
        self.open(browser, url).await?;
        let mut outcome = self.collect(browser).await?;
        outcome.states.insert(0, TraversalState::Loading);
        Ok(outcome)
    }

    /// Everything after navigation: scroll until converged, settle, extract.
    pub async fn collect<B: Browser + ?Sized>(&self, browser: &mut B) -> Result<TraversalOutcome> {
        let mut states = vec![TraversalState::ScrollingForMore];
        let convergence = self.load_all(browser).await?;
        states.push(convergence.state());

        self.pause(self.config.post_scroll_settle_ms).await;

        states.push(TraversalState::Extracting);
        let tally = self.extract_all(browser).await?;
        states.push(TraversalState::Done);

        info!(
            elements = tally.elements_found,
            records = tally.records.len(),
            skipped = tally.skipped,
            failed = tally.failed,
            "Traversal finished"
        );

        Ok(TraversalOutcome {
            records: tally.records,
            elements_found: tally.elements_found,
            skipped: tally.skipped,
            failed: tally.failed,
            convergence,
            states,
        })
    }
}
