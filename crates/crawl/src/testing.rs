//! In-memory [`Browser`] for driving traversals without a real browser.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use extract::RawElement;
use std::collections::{HashMap, HashSet};

use crate::browser::{Browser, ElementHandle, Locator};

/// Scripted page: fixed elements per CSS selector, a height sequence, and an
/// optional "load more" button that works a limited number of times.
///
/// Handles are formatted as `"{selector}#{index}"`.
#[derive(Debug, Default)]
pub struct ScriptedBrowser {
    elements: HashMap<String, Vec<RawElement>>,
    heights: Vec<u64>,
    height_cursor: usize,
    growth: Option<(u64, u64)>,
    load_more_budget: usize,
    fail_clicks: bool,
    fail_navigation: bool,
    panic_navigation: bool,
    failing: HashSet<String>,
    visited: Vec<String>,
    scrolls: usize,
    clicks: usize,
    quit_calls: usize,
}

const LOAD_MORE_HANDLE: &str = "load-more";

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements(mut self, selector: &str, elements: Vec<RawElement>) -> Self {
        self.elements.insert(selector.to_string(), elements);
        self
    }

    /// Heights returned by successive `page_height` calls; the last one repeats.
    pub fn with_heights(mut self, heights: Vec<u64>) -> Self {
        self.heights = heights;
        self
    }

    /// A page that grows by `step` on every height read.
    pub fn growing_height(mut self, start: u64, step: u64) -> Self {
        self.growth = Some((start, step));
        self
    }

    pub fn with_load_more(mut self, clicks: usize) -> Self {
        self.load_more_budget = clicks;
        self
    }

    /// Navigation panics instead of returning an error.
    pub fn panicking_navigation(mut self) -> Self {
        self.panic_navigation = true;
        self
    }

    pub fn failing_clicks(mut self) -> Self {
        self.fail_clicks = true;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn failing_element(mut self, selector: &str, index: usize) -> Self {
        self.failing.insert(format!("{}#{}", selector, index));
        self
    }

    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls
    }

    pub fn clicks(&self) -> usize {
        self.clicks
    }

    pub fn quit_calls(&self) -> usize {
        self.quit_calls
    }

    fn lookup(&self, element: &ElementHandle) -> Result<&RawElement> {
        if self.failing.contains(element.id()) {
            return Err(anyhow!("stale element reference: {}", element.id()));
        }

        let (selector, index) = element
            .id()
            .rsplit_once('#')
            .ok_or_else(|| anyhow!("unknown element {}", element.id()))?;
        let index: usize = index.parse()?;

        self.elements
            .get(selector)
            .and_then(|list| list.get(index))
            .ok_or_else(|| anyhow!("unknown element {}", element.id()))
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        if self.panic_navigation {
            panic!("renderer crashed while loading {}", url);
        }
        if self.fail_navigation {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED at {}", url));
        }
        self.visited.push(url.to_string());
        Ok(())
    }

    async fn page_height(&mut self) -> Result<u64> {
        let cursor = self.height_cursor;
        self.height_cursor += 1;

        if let Some((start, step)) = self.growth {
            return Ok(start + step * cursor as u64);
        }

        let index = cursor.min(self.heights.len().saturating_sub(1));
        Ok(self.heights.get(index).copied().unwrap_or(0))
    }

    async fn scroll_to_bottom(&mut self, _container: &str) -> Result<()> {
        self.scrolls += 1;
        Ok(())
    }

    async fn find_elements(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        match locator {
            Locator::XPath(_) if self.load_more_budget > 0 => Ok(vec![ElementHandle::new(LOAD_MORE_HANDLE)]),
            Locator::XPath(_) => Ok(Vec::new()),
            Locator::Css(selector) => Ok(self
                .elements
                .get(selector)
                .map(|list| {
                    (0..list.len())
                        .map(|i| ElementHandle::new(format!("{}#{}", selector, i)))
                        .collect()
                })
                .unwrap_or_default()),
        }
    }

    async fn element_text(&mut self, element: &ElementHandle) -> Result<String> {
        Ok(self.lookup(element)?.rendered_text.clone())
    }

    async fn element_html(&mut self, element: &ElementHandle) -> Result<String> {
        Ok(self.lookup(element)?.outer_html.clone())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<()> {
        if element.id() != LOAD_MORE_HANDLE || self.fail_clicks {
            return Err(anyhow!("element click intercepted"));
        }
        self.load_more_budget = self.load_more_budget.saturating_sub(1);
        self.clicks += 1;
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: &ElementHandle) -> Result<()> {
        self.lookup(element).map(|_| ())
    }

    async fn quit(&mut self) -> Result<()> {
        self.quit_calls += 1;
        Ok(())
    }
}
