use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::driver::{BrowserDriver, Cookie, DriverLauncher};
use crate::config::BrowserConfig;
use crate::errors::ScanError;
use crate::poller::{poll_until_done, PollOutcome, PollPolicy};

/// Launches Chrome through a local `chromedriver` process.
pub struct ChromeDriverLauncher {
    config: BrowserConfig,
    proxy: Option<String>,
    http: reqwest::Client,
}

impl ChromeDriverLauncher {
    pub fn new(config: BrowserConfig, proxy: Option<String>) -> Self {
        Self {
            config,
            proxy,
            http: reqwest::Client::new(),
        }
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.config.port)
    }

    /// Capabilities requested for every session. Browser traffic goes through
    /// the scan engine's proxy when one is configured.
    pub fn capabilities(&self) -> Map<String, Value> {
        let mut args = vec![
            "--ignore-certificate-errors".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = Map::new();
        caps.insert("browserName".into(), json!("chrome"));
        caps.insert("acceptInsecureCerts".into(), json!(true));

        if let Some(proxy) = &self.proxy {
            caps.insert(
                "proxy".into(),
                json!({
                    "proxyType": "manual",
                    "httpProxy": proxy,
                    "sslProxy": proxy,
                }),
            );
            // Keep the scan engine's own API calls off the proxy.
            args.push("--proxy-bypass-list=<-loopback>".to_string());
        }

        caps.insert("goog:chromeOptions".into(), json!({ "args": args }));
        caps
    }

    async fn wait_for_driver(&self) -> Result<(), ScanError> {
        let url = format!("{}/status", self.base_url());
        let policy = PollPolicy::new(Duration::from_millis(200), Some(Duration::from_secs(10)))
            .with_max_errors(u32::MAX);

        let report = poll_until_done(
            || {
                let request = self.http.get(&url);
                async move {
                    let body: Value = request.send().await?.json().await?;
                    Ok::<bool, ScanError>(body["value"]["ready"].as_bool().unwrap_or(false))
                }
            },
            |ready: &bool| *ready,
            |_| None,
            &policy,
        )
        .await;

        match report.outcome {
            PollOutcome::Completed => Ok(()),
            other => Err(ScanError::ResourceUnavailable(format!(
                "chromedriver on port {} not ready: {}",
                self.config.port, other
            ))),
        }
    }
}

#[async_trait]
impl DriverLauncher for ChromeDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, ScanError> {
        info!(
            driver = %self.config.chromedriver_path,
            port = self.config.port,
            headless = self.config.headless,
            proxy = self.proxy.as_deref().unwrap_or("none"),
            "Launching browser"
        );

        // kill_on_drop reaps chromedriver if any later step fails.
        let child = Command::new(&self.config.chromedriver_path)
            .arg(format!("--port={}", self.config.port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ScanError::ResourceUnavailable(format!(
                    "Failed to start {}: {}",
                    self.config.chromedriver_path, e
                ))
            })?;

        self.wait_for_driver().await?;

        let mut builder = ClientBuilder::rustls()
            .map_err(|e| ScanError::ResourceUnavailable(format!("TLS setup failed: {}", e)))?;
        builder.capabilities(self.capabilities());
        let client = builder.connect(&self.base_url()).await.map_err(|e| {
            ScanError::ResourceUnavailable(format!("Browser session not created: {}", e))
        })?;

        info!(port = self.config.port, "Browser session created");
        Ok(Box::new(ChromeSession {
            client,
            child: Some(child),
        }))
    }
}

/// One WebDriver session plus the chromedriver process serving it.
pub struct ChromeSession {
    client: Client,
    child: Option<Child>,
}

fn browser_error(action: &str, e: CmdError) -> ScanError {
    ScanError::Browser(format!("{}: {}", action, e))
}

impl ChromeSession {
    async fn find(&self, selector: &str) -> Result<fantoccini::elements::Element, ScanError> {
        debug!(selector, "Locating element");
        self.client
            .find(Locator::Css(selector))
            .await
            .map_err(|e| browser_error(&format!("find '{}'", selector), e))
    }
}

#[async_trait]
impl BrowserDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), ScanError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| browser_error(&format!("navigate to {}", url), e))
    }

    async fn ready_state(&self) -> Result<String, ScanError> {
        let value = self
            .client
            .execute("return document.readyState", vec![])
            .await
            .map_err(|e| browser_error("read ready state", e))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn current_url(&self) -> Result<String, ScanError> {
        let url = self
            .client
            .current_url()
            .await
            .map_err(|e| browser_error("read current URL", e))?;
        Ok(url.to_string())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), ScanError> {
        let element = self.find(selector).await?;
        element
            .clear()
            .await
            .map_err(|e| browser_error(&format!("clear '{}'", selector), e))?;
        element
            .send_keys(text)
            .await
            .map_err(|e| browser_error(&format!("type into '{}'", selector), e))
    }

    async fn click(&self, selector: &str) -> Result<(), ScanError> {
        self.find(selector)
            .await?
            .click()
            .await
            .map_err(|e| browser_error(&format!("click '{}'", selector), e))
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, ScanError> {
        let cookies = self
            .client
            .get_all_cookies()
            .await
            .map_err(|e| browser_error("read cookies", e))?;
        Ok(cookies
            .iter()
            .map(|c| Cookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
                domain: c.domain().map(String::from),
                path: c.path().map(String::from),
            })
            .collect())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScanError> {
        self.client
            .screenshot()
            .await
            .map_err(|e| browser_error("capture screenshot", e))
    }

    async fn quit(&mut self) -> Result<(), ScanError> {
        let closed = self
            .client
            .clone()
            .close()
            .await
            .map_err(|e| browser_error("close session", e));
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to stop chromedriver");
            }
        }
        closed
    }
}
