//! Page fetching through a controllable browser session.
//!
//! A fetcher is split in two roles:
//!
//! 1. [`Launch`]: starts a browser session (one per batch, or one per restart
//!    after the session dies)
//! 2. [`Fetch`]: navigates the session to a URL, waits for the page to be
//!    ready, and hands back the rendered page
//!
//! The production implementation in [`chrome`] drives Chromium over CDP.
//! The batch runner is written against the traits only, so it can be run
//! against an in-memory session in tests.

pub mod chrome;

use crate::extractors::page::PageDocument;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a rendered page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Navigation exceeded its time bound.
    #[error("navigation timed out")]
    Timeout,

    /// The URL cannot be navigated to at all.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The page failed to load (`net::ERR_*`): unknown host, refused
    /// connection. The session itself is fine.
    #[error("{0}")]
    Navigation(String),

    /// The session failed: crashed browser, lost DevTools connection.
    #[error("{0}")]
    Session(String),

    /// A browser session could not be started.
    #[error("browser launch failed: {0}")]
    Launch(String),
}

impl FetchError {
    /// Whether the error points at the browser session rather than the page.
    pub fn is_session_fault(&self) -> bool {
        matches!(self, FetchError::Session(_) | FetchError::Launch(_))
    }
}

/// A page as rendered by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// The URL that was requested.
    pub url: String,
    /// Text of the first `h1`, read from the live DOM.
    pub heading: Option<String>,
    /// Serialization of the rendered document.
    pub markup: String,
}

impl FetchedPage {
    /// Parse the rendered markup for selector queries.
    pub fn document(&self) -> PageDocument {
        PageDocument::parse(&self.markup)
    }
}

/// An open browser session that can load pages one at a time.
pub trait Fetch {
    /// Load `url` and return the rendered page.
    async fn open(&mut self, url: &str) -> Result<FetchedPage, FetchError>;

    /// Shut the session down, releasing the browser.
    async fn release(self) -> Result<(), FetchError>;
}

/// Something that can start a [`Fetch`] session.
pub trait Launch {
    type Session: Fetch;

    async fn launch(&self) -> Result<Self::Session, FetchError>;
}

/// Browser and page-load settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Run without a visible window.
    pub headless: bool,
    /// Browser executable; detected on the system when `None`.
    pub executable: Option<PathBuf>,
    /// Hard cap on navigation.
    pub navigation_timeout: Duration,
    /// Cap on waiting for `document.readyState == "complete"`.
    pub ready_timeout: Duration,
    /// Pause after readiness for late scripts.
    pub settle_delay: Duration,
    /// Pause after scrolling to mid page, for lazy-loaded content.
    pub scroll_pause: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            navigation_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(2),
            scroll_pause: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_messages() {
        assert_eq!(FetchError::Timeout.to_string(), "navigation timed out");
        assert_eq!(
            FetchError::Session("net::ERR_CONNECTION_REFUSED".to_string()).to_string(),
            "net::ERR_CONNECTION_REFUSED"
        );
        assert!(
            FetchError::Launch("no chrome".to_string())
                .to_string()
                .starts_with("browser launch failed")
        );
    }

    #[test]
    fn test_session_faults() {
        assert!(FetchError::Session("browser has disconnected".to_string()).is_session_fault());
        assert!(FetchError::Launch("no chrome".to_string()).is_session_fault());
        assert!(!FetchError::Timeout.is_session_fault());
        assert!(!FetchError::InvalidUrl("empty host".to_string()).is_session_fault());
        assert!(
            !FetchError::Navigation("net::ERR_NAME_NOT_RESOLVED".to_string()).is_session_fault()
        );
    }

    #[test]
    fn test_fetched_page_document() {
        let page = FetchedPage {
            url: "https://example.org".to_string(),
            heading: None,
            markup: "<html><body><h1>Alerte</h1></body></html>".to_string(),
        };
        let doc = page.document();
        assert_eq!(crate::extractors::page::extract_title(None, &doc), "Alerte");
    }

    #[test]
    fn test_default_timeouts() {
        let config = FetchConfig::default();
        assert!(config.headless);
        assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        assert_eq!(config.ready_timeout, Duration::from_secs(10));
        assert_eq!(config.scroll_pause, Duration::from_secs(1));
    }
}
