//! Minimal W3C WebDriver client.
//!
//! Speaks just enough of the WebDriver HTTP protocol for the compose-modal
//! channel: session lifecycle, navigation, XPath element lookup with bounded
//! polling, click/clear/type, and text extraction. Talks to a locally
//! running chromedriver (or any W3C endpoint).

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tokio::time::{Instant, sleep};

use super::ChannelError;

/// W3C element identifier key in responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver Enter key code point.
pub const KEY_ENTER: char = '\u{e007}';

/// Poll interval for bounded element waits.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Connection settings for the driver endpoint.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Driver endpoint, e.g. chromedriver's default
    pub server_url: String,

    /// Run the browser without a visible window
    pub headless: bool,

    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9515".to_string(),
            headless: false,
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle to one element within the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element(String);

/// A WebDriver session over HTTP.
pub struct WebDriver {
    client: Client,
    base: String,
    session: Option<String>,
    config: WebDriverConfig,
}

impl WebDriver {
    pub fn new(config: WebDriverConfig) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ChannelError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base: config.server_url.trim_end_matches('/').to_string(),
            session: None,
            config,
        })
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Start a browser session. No-op if one is already live.
    pub async fn start_session(&mut self) -> Result<(), ChannelError> {
        if self.session.is_some() {
            return Ok(());
        }

        let mut args = vec![
            "--lang=ko-KR".to_string(),
            "--start-maximized".to_string(),
            "--disable-notifications".to_string(),
            "--disable-popup-blocking".to_string(),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-automation", "enable-logging"],
                        "prefs": {
                            "credentials_enable_service": false,
                            "profile.password_manager_enabled": false,
                            "profile.default_content_setting_values.notifications": 2
                        }
                    }
                }
            }
        });

        let value = self.post("/session", body).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ChannelError::Session("driver returned no session id".to_string()))?;

        log::debug!("webdriver session started: {}", session_id);
        self.session = Some(session_id.to_string());
        Ok(())
    }

    /// End the session. Safe to call without one.
    pub async fn quit(&mut self) {
        if let Some(session) = self.session.take() {
            let url = format!("{}/session/{}", self.base, session);
            if let Err(e) = self.client.delete(&url).send().await {
                log::warn!("failed to end webdriver session: {}", e);
            }
        }
    }

    pub async fn goto(&self, url: &str) -> Result<(), ChannelError> {
        self.session_post("/url", json!({ "url": url })).await?;
        Ok(())
    }

    /// Single lookup probe; `Ok(None)` when the element is absent.
    pub async fn try_find(&self, xpath: &str) -> Result<Option<Element>, ChannelError> {
        let body = json!({ "using": "xpath", "value": xpath });
        match self.session_post("/element", body).await {
            Ok(value) => Ok(element_ref(&value).map(Element)),
            Err(ChannelError::SurfaceNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All elements currently matching the XPath.
    pub async fn find_all(&self, xpath: &str) -> Result<Vec<Element>, ChannelError> {
        let body = json!({ "using": "xpath", "value": xpath });
        let value = self.session_post("/elements", body).await?;
        let elements = value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(element_ref)
                    .map(Element)
                    .collect()
            })
            .unwrap_or_default();
        Ok(elements)
    }

    /// Poll for an element until it appears or `timeout` elapses.
    pub async fn wait_for(&self, xpath: &str, timeout: Duration) -> Result<Element, ChannelError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.try_find(xpath).await? {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(ChannelError::Timeout(format!("element {xpath}")));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Poll for an element and click it; false if it never became clickable
    /// within the window.
    pub async fn wait_click(&self, xpath: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(Some(element)) = self.try_find(xpath).await
                && self.click(&element).await.is_ok()
            {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn click(&self, element: &Element) -> Result<(), ChannelError> {
        self.session_post(&format!("/element/{}/click", element.0), json!({}))
            .await
            .map_err(|e| match e {
                ChannelError::Transport(_) | ChannelError::Session(_) => e,
                _ => ChannelError::NotInteractable(e.to_string()),
            })?;
        Ok(())
    }

    pub async fn clear(&self, element: &Element) -> Result<(), ChannelError> {
        self.session_post(&format!("/element/{}/clear", element.0), json!({}))
            .await?;
        Ok(())
    }

    pub async fn send_keys(&self, element: &Element, text: &str) -> Result<(), ChannelError> {
        self.session_post(
            &format!("/element/{}/value", element.0),
            json!({ "text": text }),
        )
        .await?;
        Ok(())
    }

    pub async fn text(&self, element: &Element) -> Result<String, ChannelError> {
        let url = format!(
            "{}/session/{}/element/{}/text",
            self.base,
            self.session_id()?,
            element.0
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        let value = unwrap_value(body)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn session_id(&self) -> Result<&str, ChannelError> {
        self.session
            .as_deref()
            .ok_or_else(|| ChannelError::Session("no live webdriver session".to_string()))
    }

    async fn session_post(&self, path: &str, body: Value) -> Result<Value, ChannelError> {
        let path = format!("/session/{}{}", self.session_id()?, path);
        self.post(&path, body).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ChannelError> {
        let url = format!("{}{}", self.base, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        unwrap_value(body)
    }
}

/// Unwrap the `{"value": ...}` envelope, mapping driver error payloads onto
/// channel errors.
fn unwrap_value(body: Value) -> Result<Value, ChannelError> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(error)
            .to_string();
        return Err(match error {
            "no such element" | "stale element reference" => {
                ChannelError::SurfaceNotFound(message)
            }
            "element not interactable" | "element click intercepted" => {
                ChannelError::NotInteractable(message)
            }
            "timeout" | "script timeout" => ChannelError::Timeout(message),
            "invalid session id" | "session not created" => ChannelError::Session(message),
            _ => ChannelError::Transport(format!("{error}: {message}")),
        });
    }

    Ok(value)
}

/// Extract the element reference from a lookup response value.
fn element_ref(value: &Value) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = WebDriverConfig::default();
        assert_eq!(config.server_url, "http://localhost:9515");
        assert!(!config.headless);
    }

    #[test]
    fn test_element_ref_extraction() {
        let value = json!({ ELEMENT_KEY: "abc-123" });
        assert_eq!(element_ref(&value), Some("abc-123".to_string()));
        assert_eq!(element_ref(&json!({})), None);
    }

    #[test]
    fn test_unwrap_value_success_envelope() {
        let body = json!({ "value": { "sessionId": "s1" } });
        let value = unwrap_value(body).unwrap();
        assert_eq!(value["sessionId"], "s1");
    }

    #[test]
    fn test_unwrap_value_no_such_element() {
        let body = json!({ "value": { "error": "no such element", "message": "nope" } });
        let err = unwrap_value(body).unwrap_err();
        assert!(matches!(err, ChannelError::SurfaceNotFound(_)));
    }

    #[test]
    fn test_unwrap_value_not_interactable() {
        let body = json!({ "value": { "error": "element not interactable", "message": "m" } });
        let err = unwrap_value(body).unwrap_err();
        assert!(matches!(err, ChannelError::NotInteractable(_)));
    }

    #[test]
    fn test_unwrap_value_invalid_session() {
        let body = json!({ "value": { "error": "invalid session id", "message": "gone" } });
        let err = unwrap_value(body).unwrap_err();
        assert!(matches!(err, ChannelError::Session(_)));
    }

    #[test]
    fn test_unwrap_value_unknown_error_is_transport() {
        let body = json!({ "value": { "error": "unknown command", "message": "m" } });
        let err = unwrap_value(body).unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
    }

    #[test]
    fn test_new_driver_has_no_session() {
        let driver = WebDriver::new(WebDriverConfig::default()).unwrap();
        assert!(!driver.has_session());
    }

    #[tokio::test]
    async fn test_session_calls_require_session() {
        let driver = WebDriver::new(WebDriverConfig::default()).unwrap();
        let err = driver.goto("https://example.com").await.unwrap_err();
        assert!(matches!(err, ChannelError::Session(_)));
    }
}
