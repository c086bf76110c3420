use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{info, warn};

use super::actions::{execute_browser_action, ActionOutput, BrowserAction};
use super::driver::DriverLauncher;
use super::session::BrowserSession;
use crate::config::BrowserConfig;
use crate::errors::ScanError;

/// Exclusive handle to the live browser. Holding it is holding the lock.
pub type BrowserLease<'a> = MappedMutexGuard<'a, BrowserSession>;

/// Owns the one browser instance of the process.
///
/// A lease returned by [`acquire`](Self::acquire) serializes every interaction
/// sequence against the browser; keep it only for the duration of one
/// sequence. `is_active` reads an atomic flag so status checks never queue
/// behind an interaction.
pub struct BrowserSessionManager {
    launcher: Arc<dyn DriverLauncher>,
    slot: Mutex<Option<BrowserSession>>,
    live: AtomicBool,
    launches: AtomicU32,
    ready_timeout: Duration,
    redirect_timeout: Duration,
}

impl BrowserSessionManager {
    pub fn new(launcher: Arc<dyn DriverLauncher>, config: &BrowserConfig) -> Self {
        Self {
            launcher,
            slot: Mutex::new(None),
            live: AtomicBool::new(false),
            launches: AtomicU32::new(0),
            ready_timeout: config.ready_timeout(),
            redirect_timeout: config.login_redirect_timeout(),
        }
    }

    /// Lock the live session, launching the browser first if none exists.
    /// A failed launch leaves the manager without a session.
    pub async fn acquire(&self) -> Result<BrowserLease<'_>, ScanError> {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            let driver = self.launcher.launch().await?;
            *slot = Some(BrowserSession::new(driver, self.ready_timeout, self.redirect_timeout));
            self.live.store(true, Ordering::SeqCst);
            let n = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
            info!(launches = n, "Browser session started");
        }
        MutexGuard::try_map(slot, |s| s.as_mut())
            .map_err(|_| ScanError::Internal("Browser slot empty after launch".into()))
    }

    /// Run a compound interaction sequence while holding the session lock.
    pub async fn with_session<T, F>(&self, f: F) -> Result<T, ScanError>
    where
        F: for<'s> FnOnce(&'s mut BrowserSession) -> BoxFuture<'s, Result<T, ScanError>>,
    {
        let mut lease = self.acquire().await?;
        f(&mut *lease).await
    }

    pub async fn perform(&self, action: BrowserAction) -> Result<ActionOutput, ScanError> {
        self.with_session(move |session| Box::pin(async move { execute_browser_action(session, &action).await }))
            .await
    }

    /// Lock the live session if there is one; never launches.
    pub async fn current(&self) -> Option<BrowserLease<'_>> {
        let slot = self.slot.lock().await;
        MutexGuard::try_map(slot, |s| s.as_mut()).ok()
    }

    /// Tear down the live session. Calling it with no session is a no-op.
    pub async fn release(&self) -> Result<(), ScanError> {
        let session = {
            let mut slot = self.slot.lock().await;
            self.live.store(false, Ordering::SeqCst);
            slot.take()
        };
        match session {
            Some(session) => {
                info!("Closing browser session");
                if let Err(e) = session.quit().await {
                    warn!(error = %e, "Browser did not shut down cleanly");
                    return Err(e);
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Number of browsers launched over the manager's lifetime.
    pub fn launch_count(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }
}
