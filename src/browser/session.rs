use std::time::Duration;

use tracing::{debug, info};

use super::driver::{cookie_jar, cookies_changed, BrowserDriver, CookieJar};
use crate::errors::ScanError;
use crate::poller::{poll_until_done, PollOutcome, PollPolicy};

const WAIT_INTERVAL: Duration = Duration::from_millis(250);

/// The single live browser instance, with the state observers care about.
pub struct BrowserSession {
    driver: Box<dyn BrowserDriver>,
    current_url: Option<String>,
    cookies: CookieJar,
    ready_timeout: Duration,
    redirect_timeout: Duration,
}

impl BrowserSession {
    pub fn new(driver: Box<dyn BrowserDriver>, ready_timeout: Duration, redirect_timeout: Duration) -> Self {
        Self {
            driver,
            current_url: None,
            cookies: CookieJar::new(),
            ready_timeout,
            redirect_timeout,
        }
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Navigate and wait until the document reports `complete`. Returns the
    /// URL the browser settled on.
    pub async fn navigate(&mut self, url: &str) -> Result<String, ScanError> {
        self.driver.navigate(url).await?;
        self.wait_until_ready().await?;
        let landed = self.driver.current_url().await?;
        info!(requested = %url, landed = %landed, "Navigated");
        self.current_url = Some(landed.clone());
        Ok(landed)
    }

    pub async fn input_text(&mut self, selector: &str, text: &str) -> Result<(), ScanError> {
        self.driver.fill(selector, text).await?;
        debug!(selector, "Typed into element");
        Ok(())
    }

    pub async fn click(&mut self, selector: &str) -> Result<(), ScanError> {
        self.driver.click(selector).await?;
        self.current_url = Some(self.driver.current_url().await?);
        debug!(selector, "Clicked element");
        Ok(())
    }

    /// Click a login button and report whether the cookie set changed once the
    /// page moved away from the current URL.
    pub async fn login_click(&mut self, selector: &str) -> Result<bool, ScanError> {
        let before = self.driver.cookies().await?;
        let url_before = self.driver.current_url().await?;

        self.driver.click(selector).await?;
        self.wait_for_url_change(&url_before).await?;

        let after = self.driver.cookies().await?;
        let changed = cookies_changed(&before, &after);
        self.cookies = cookie_jar(&after);
        self.current_url = Some(self.driver.current_url().await?);
        info!(selector, logged_in = changed, "Login click finished");
        Ok(changed)
    }

    pub async fn refresh_cookies(&mut self) -> Result<CookieJar, ScanError> {
        let cookies = self.driver.cookies().await?;
        self.cookies = cookie_jar(&cookies);
        Ok(self.cookies.clone())
    }

    pub async fn screenshot(&mut self) -> Result<Vec<u8>, ScanError> {
        self.driver.screenshot().await
    }

    pub(crate) async fn quit(mut self) -> Result<(), ScanError> {
        self.driver.quit().await
    }

    async fn wait_until_ready(&self) -> Result<(), ScanError> {
        let driver = &*self.driver;
        let policy = PollPolicy::new(WAIT_INTERVAL, Some(self.ready_timeout));
        let report = poll_until_done(
            || driver.ready_state(),
            |state: &String| state == "complete",
            |_| None,
            &policy,
        )
        .await;
        match report.outcome {
            PollOutcome::Completed => Ok(()),
            PollOutcome::TimedOut => Err(ScanError::Timeout(format!(
                "page not ready after {:?} (last state {:?})",
                self.ready_timeout, report.last_status
            ))),
            PollOutcome::Failed(failure) => Err(ScanError::Browser(failure.to_string())),
        }
    }

    async fn wait_for_url_change(&self, from: &str) -> Result<(), ScanError> {
        let driver = &*self.driver;
        let policy = PollPolicy::new(WAIT_INTERVAL, Some(self.redirect_timeout));
        let report = poll_until_done(
            || driver.current_url(),
            |url: &String| url != from,
            |_| None,
            &policy,
        )
        .await;
        match report.outcome {
            PollOutcome::Completed => Ok(()),
            PollOutcome::TimedOut => Err(ScanError::Timeout(format!(
                "URL stayed at {} for {:?} after login click",
                from, self.redirect_timeout
            ))),
            PollOutcome::Failed(failure) => Err(ScanError::Browser(failure.to_string())),
        }
    }
}
