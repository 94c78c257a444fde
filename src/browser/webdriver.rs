//! Minimal W3C WebDriver client
//!
//! Only the handful of commands evidence capture needs: new session, window
//! maximize, navigate, screenshot and delete session. The driver executable
//! (chromedriver) is spawned on a local port and killed when the session ends.

use crate::browser::{Browser, BrowserLauncher};
use crate::config::BrowserOptions;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Method;
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::Instant;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A WebDriver session, optionally owning the driver process behind it.
pub struct WebDriver {
    http: reqwest::Client,
    endpoint: String,
    session_id: Option<String>,
    driver: Option<Child>,
}

impl WebDriver {
    /// Spawn the configured driver executable and open a session on it.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let path = options.driver_path.as_ref().ok_or_else(|| {
            Error::MissingConfig("problem in finding Driver Path (CHROME_DRIVER_PATH)".into())
        })?;

        tracing::info!(driver = %path.display(), port = options.port, "Starting WebDriver");
        let child = Command::new(path)
            .arg(format!("--port={}", options.port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Browser(format!("Failed to start driver {}: {e}", path.display()))
            })?;

        let http = reqwest::Client::new();
        let endpoint = options.endpoint();
        wait_until_ready(
            &http,
            &endpoint,
            Duration::from_secs(options.startup_timeout_secs),
        )
        .await?;

        let mut driver = Self {
            http,
            endpoint,
            session_id: None,
            driver: Some(child),
        };
        driver.open_session(options).await?;
        Ok(driver)
    }

    /// Open a session on a driver that is already listening at `endpoint`.
    pub async fn connect(endpoint: &str, options: &BrowserOptions) -> Result<Self> {
        let mut driver = Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session_id: None,
            driver: None,
        };
        driver.open_session(options).await?;
        Ok(driver)
    }

    /// Identifier of the live session, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    async fn open_session(&mut self, options: &BrowserOptions) -> Result<()> {
        let mut args = Vec::new();
        if options.headless {
            args.push("--headless=new");
            args.push("--window-size=1920,1080");
        }

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args },
                }
            }
        });

        let value = self
            .command(Method::POST, "/session", Some(capabilities))
            .await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Browser("New session response lacks a sessionId".into()))?
            .to_string();
        tracing::debug!(%session_id, "WebDriver session created");
        self.session_id = Some(session_id);

        if options.maximize && !options.headless {
            let path = self.session_path("/window/maximize")?;
            if let Err(err) = self.command(Method::POST, &path, Some(json!({}))).await {
                tracing::warn!("Could not maximize browser window: {err}");
            }
        }

        Ok(())
    }

    fn session_path(&self, suffix: &str) -> Result<String> {
        let id = self
            .session_id
            .as_deref()
            .ok_or_else(|| Error::Browser("No active WebDriver session".into()))?;
        Ok(format!("/session/{id}{suffix}"))
    }

    /// Send one command and unwrap the `value` member of the reply.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.endpoint, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Browser(format!("WebDriver request {path} failed: {e}")))?;
        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| {
            Error::Browser(format!("WebDriver returned unreadable reply for {path}: {e}"))
        })?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);

        if !status.is_success() {
            let kind = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            let message = value.get("message").and_then(Value::as_str).unwrap_or("");
            return Err(Error::Browser(format!(
                "WebDriver {path} failed with HTTP {status}: {kind}: {message}"
            )));
        }

        Ok(value)
    }
}

async fn wait_until_ready(http: &reqwest::Client, endpoint: &str, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let url = format!("{endpoint}/status");

    loop {
        if let Ok(response) = http.get(&url).send().await {
            if let Ok(body) = response.json::<Value>().await {
                if body["value"]["ready"].as_bool() == Some(true) {
                    return Ok(());
                }
            }
        }

        if Instant::now() >= deadline {
            return Err(Error::Browser(format!(
                "Driver at {endpoint} not ready after {}s",
                timeout.as_secs()
            )));
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}

#[async_trait]
impl Browser for WebDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let path = self.session_path("/url")?;
        self.command(Method::POST, &path, Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let path = self.session_path("/screenshot")?;
        let value = self.command(Method::GET, &path, None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| Error::Browser("Screenshot reply is not a string".into()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| Error::Browser(format!("Screenshot is not valid base64: {e}")))
    }

    async fn quit(&mut self) -> Result<()> {
        let mut result = Ok(());

        if self.session_id.is_some() {
            let path = self.session_path("")?;
            result = self.command(Method::DELETE, &path, None).await.map(|_| ());
            self.session_id = None;
        }

        if let Some(mut child) = self.driver.take() {
            if let Err(err) = child.kill().await {
                tracing::debug!("Driver process already gone: {err}");
            }
        }

        result
    }
}

/// Launches sessions by spawning the configured driver executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebDriverLauncher;

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self, options: &BrowserOptions) -> Result<Box<dyn Browser>> {
        Ok(Box::new(WebDriver::launch(options).await?))
    }
}
