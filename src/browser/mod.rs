pub mod actions;
pub mod driver;
pub mod manager;
pub mod session;
pub mod webdriver;

pub use actions::{execute_browser_action, ActionOutput, BrowserAction};
pub use driver::{BrowserDriver, Cookie, CookieJar, DriverLauncher};
pub use manager::{BrowserLease, BrowserSessionManager};
pub use session::BrowserSession;
pub use webdriver::ChromeDriverLauncher;
