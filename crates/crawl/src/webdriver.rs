use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{Browser, ElementHandle, Locator};

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const PAGE_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight";

const SCROLL_TO_BOTTOM_SCRIPT: &str = r#"
    var element = document.querySelector(arguments[0]);
    if (element) {
        element.scrollTop = element.scrollHeight;
    } else {
        window.scrollTo(0, document.body.scrollHeight);
    }
"#;

const SCROLL_INTO_VIEW_SCRIPT: &str =
    "arguments[0].scrollIntoView({behavior: 'smooth', block: 'center'});";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    pub url: String,
    pub browser_name: String,
    pub args: Vec<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub request_timeout_secs: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            browser_name: "chrome".to_string(),
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--headless".to_string(),
                "--disable-gpu".to_string(),
                "--window-size=1920,1080".to_string(),
            ],
            window_width: 1920,
            window_height: 1080,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Deserialize)]
struct WireResponse<T> {
    value: T,
}

#[derive(Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// One WebDriver session, acquired by [`WebDriverSession::connect`] and
/// released by [`Browser::quit`].
pub struct WebDriverSession {
    base_url: String,
    session_id: String,
    client: reqwest::Client,
    closed: bool,
}

impl WebDriverSession {
    pub async fn connect(config: &WebDriverConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build WebDriver HTTP client")?;

        let base_url = config.url.trim_end_matches('/').to_string();
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": config.browser_name,
                    "goog:chromeOptions": { "args": config.args },
                }
            }
        });

        let response = client
            .post(format!("{}/session", base_url))
            .json(&capabilities)
            .send()
            .await
            .context(format!("Failed to reach WebDriver at {}", base_url))?;

        let session: NewSession = decode(response)
            .await
            .context("Failed to create WebDriver session")?;

        info!(session = %session.session_id, "WebDriver session started");

        let mut driver = Self {
            base_url,
            session_id: session.session_id,
            client,
            closed: false,
        };

        let rect = json!({ "width": config.window_width, "height": config.window_height });
        if let Err(e) = driver.command::<Value>(Method::POST, "/window/rect", Some(rect)).await {
            warn!(error = %e, "Failed to set window size");
        }

        Ok(driver)
    }

    async fn command<T: DeserializeOwned>(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        if self.closed {
            anyhow::bail!("WebDriver session already closed");
        }

        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .context(format!("Failed to send WebDriver command {}", path))?;

        decode(response).await
    }

    async fn execute(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        let body = json!({ "script": script, "args": args });
        self.command(Method::POST, "/execute/sync", Some(body)).await
    }

    fn element_ref(element: &ElementHandle) -> Value {
        json!({ ELEMENT_KEY: element.id() })
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .context("Failed to parse WebDriver response")?;

    if !status.is_success() {
        let error = body["value"]["error"].as_str().unwrap_or("unknown error");
        let message = body["value"]["message"].as_str().unwrap_or("");
        anyhow::bail!("WebDriver command failed ({}): {} {}", status, error, message);
    }

    let wire: WireResponse<T> =
        serde_json::from_value(body).context("Unexpected WebDriver response shape")?;
    Ok(wire.value)
}

#[async_trait]
impl Browser for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.command::<Value>(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .context(format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn page_height(&mut self) -> Result<u64> {
        let value = self.execute(PAGE_HEIGHT_SCRIPT, Vec::new()).await?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|h| h.max(0.0) as u64))
            .context(format!("Page height is not a number: {}", value))
    }

    async fn scroll_to_bottom(&mut self, container: &str) -> Result<()> {
        self.execute(SCROLL_TO_BOTTOM_SCRIPT, vec![json!(container)]).await?;
        Ok(())
    }

    async fn find_elements(&mut self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let (using, value) = match locator {
            Locator::Css(selector) => ("css selector", selector),
            Locator::XPath(expression) => ("xpath", expression),
        };

        let refs: Vec<HashMap<String, String>> = self
            .command(Method::POST, "/elements", Some(json!({ "using": using, "value": value })))
            .await?;

        Ok(refs
            .into_iter()
            .filter_map(|mut r| r.remove(ELEMENT_KEY))
            .map(ElementHandle::new)
            .collect())
    }

    async fn element_text(&mut self, element: &ElementHandle) -> Result<String> {
        let path = format!("/element/{}/text", element.id());
        self.command(Method::GET, &path, None).await
    }

    async fn element_html(&mut self, element: &ElementHandle) -> Result<String> {
        let path = format!("/element/{}/property/outerHTML", element.id());
        let value: Value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<()> {
        let path = format!("/element/{}/click", element.id());
        self.command::<Value>(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn scroll_into_view(&mut self, element: &ElementHandle) -> Result<()> {
        self.execute(SCROLL_INTO_VIEW_SCRIPT, vec![Self::element_ref(element)])
            .await?;
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let url = format!("{}/session/{}", self.base_url, self.session_id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .context("Failed to send WebDriver session delete")?;
        self.closed = true;

        decode::<Value>(response).await?;
        debug!(session = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}
