use serde::{Deserialize, Serialize};

use super::driver::CookieJar;
use super::session::BrowserSession;
use crate::errors::ScanError;

/// One direct interaction with the shared browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserAction {
    Navigate {
        url: String,
    },
    Input {
        selector: String,
        text: String,
    },
    Click {
        selector: String,
        /// Treat the click as a login submit and report whether cookies changed.
        #[serde(default)]
        login: bool,
    },
    Cookies,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutput {
    Navigated {
        url: String,
    },
    Typed {
        selector: String,
    },
    Clicked {
        selector: String,
        current_url: Option<String>,
    },
    LoginClicked {
        selector: String,
        cookies_changed: bool,
    },
    Cookies {
        cookies: CookieJar,
    },
}

pub async fn execute_browser_action(
    session: &mut BrowserSession,
    action: &BrowserAction,
) -> Result<ActionOutput, ScanError> {
    match action {
        BrowserAction::Navigate { url } => {
            let landed = session.navigate(url).await?;
            Ok(ActionOutput::Navigated { url: landed })
        }
        BrowserAction::Input { selector, text } => {
            session.input_text(selector, text).await?;
            Ok(ActionOutput::Typed {
                selector: selector.clone(),
            })
        }
        BrowserAction::Click { selector, login: true } => {
            let changed = session.login_click(selector).await?;
            Ok(ActionOutput::LoginClicked {
                selector: selector.clone(),
                cookies_changed: changed,
            })
        }
        BrowserAction::Click { selector, login: false } => {
            session.click(selector).await?;
            Ok(ActionOutput::Clicked {
                selector: selector.clone(),
                current_url: session.current_url().map(String::from),
            })
        }
        BrowserAction::Cookies => {
            let cookies = session.refresh_cookies().await?;
            Ok(ActionOutput::Cookies { cookies })
        }
    }
}
