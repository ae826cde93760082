use anyhow::Result;
use async_trait::async_trait;

/// Opaque reference to an element located on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }
}

/// The rendering/automation handle the traversal drives.
#[async_trait]
pub trait Browser: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Current `document.body.scrollHeight`.
    async fn page_height(&mut self) -> Result<u64>;

    /// Scroll `container` to its bottom, or the viewport when it is absent.
    async fn scroll_to_bottom(&mut self, container: &str) -> Result<()>;

    async fn find_elements(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    async fn element_text(&mut self, element: &ElementHandle) -> Result<String>;

    async fn element_html(&mut self, element: &ElementHandle) -> Result<String>;

    async fn click(&mut self, element: &ElementHandle) -> Result<()>;

    async fn scroll_into_view(&mut self, element: &ElementHandle) -> Result<()>;

    /// Release the underlying session. Must be safe to call more than once.
    async fn quit(&mut self) -> Result<()>;
}
