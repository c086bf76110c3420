use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ScanError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

pub type CookieJar = HashMap<String, String>;

pub fn cookie_jar(cookies: &[Cookie]) -> CookieJar {
    cookies
        .iter()
        .map(|c| (c.name.clone(), c.value.clone()))
        .collect()
}

/// True when the name→value view of the two cookie lists differs.
pub fn cookies_changed(before: &[Cookie], after: &[Cookie]) -> bool {
    cookie_jar(before) != cookie_jar(after)
}

/// Primitive operations of a browser automation backend. One value drives one
/// live browser; callers serialize access through `BrowserSessionManager`.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ScanError>;

    /// `document.readyState` of the current page.
    async fn ready_state(&self) -> Result<String, ScanError>;

    async fn current_url(&self) -> Result<String, ScanError>;

    /// Replace the value of the element matching a CSS selector.
    async fn fill(&self, selector: &str, text: &str) -> Result<(), ScanError>;

    async fn click(&self, selector: &str) -> Result<(), ScanError>;

    async fn cookies(&self) -> Result<Vec<Cookie>, ScanError>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, ScanError>;

    /// Close the browser and free the backing process.
    async fn quit(&mut self) -> Result<(), ScanError>;
}

/// Starts browser instances. A failed launch must leave nothing running.
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, ScanError>;
}
