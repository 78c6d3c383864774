//! Chromium session driven over the DevTools protocol.
//!
//! One browser process and one tab per session. The tab is reused for every
//! URL; navigation, readiness and lazy-content handling follow the same
//! sequence for each page:
//!
//! 1. Navigate, bounded by the navigation timeout
//! 2. Poll `document.readyState` until `"complete"` or the readiness timeout
//!    (a readiness timeout is logged and the page is read anyway)
//! 3. Once ready, pause for late scripts; then scroll to mid page and pause
//!    again
//! 4. Read the live `h1` text and the rendered markup

use super::{Fetch, FetchConfig, FetchError, FetchedPage, Launch};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};
use url::Url;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

const CHROME_ARGS: [&str; 5] = [
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-notifications",
    "--disable-blink-features=AutomationControlled",
    "--user-agent=Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

fn session_error(e: CdpError) -> FetchError {
    match e {
        CdpError::Timeout => FetchError::Timeout,
        other => FetchError::Session(other.to_string()),
    }
}

/// Navigation errors carrying a Chromium `net::ERR_*` code belong to the page.
fn navigation_error(e: CdpError) -> FetchError {
    let message = e.to_string();
    if message.contains("net::ERR_") {
        FetchError::Navigation(message)
    } else {
        session_error(e)
    }
}

/// Wait for `ready` up to `limit`, then let late scripts settle.
///
/// Returns `false` without settling when the page never became ready.
async fn await_ready(ready: impl Future<Output = ()>, limit: Duration, settle: Duration) -> bool {
    if timeout(limit, ready).await.is_err() {
        warn!(timeout = ?limit, "Page not ready before timeout; reading what is available");
        return false;
    }
    sleep(settle).await;
    true
}

/// Starts [`ChromeSession`]s with a fixed [`FetchConfig`].
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: FetchConfig,
}

impl ChromeLauncher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, FetchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(1920, 1080)
            .request_timeout(self.config.navigation_timeout)
            .args(CHROME_ARGS);
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(FetchError::Launch)
    }
}

impl Launch for ChromeLauncher {
    type Session = ChromeSession;

    #[instrument(level = "info", skip_all, fields(headless = self.config.headless))]
    async fn launch(&self) -> Result<ChromeSession, FetchError> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
            debug!("CDP handler finished");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(FetchError::Launch(e.to_string()));
            }
        };

        info!("Browser session started");
        Ok(ChromeSession {
            browser,
            page,
            handler,
            config: self.config.clone(),
        })
    }
}

/// A running browser with a single reusable tab.
///
/// Must be shut down with [`Fetch::release`]; the batch runner does so on
/// every exit path.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    config: FetchConfig,
}

impl ChromeSession {
    async fn wait_until_ready(&self) -> bool {
        let poll = async {
            loop {
                match self.page.evaluate("document.readyState").await {
                    Ok(result) => {
                        if result.into_value::<String>().is_ok_and(|state| state == "complete") {
                            return;
                        }
                    }
                    Err(e) => debug!(error = %e, "readyState poll failed"),
                }
                sleep(READY_POLL_INTERVAL).await;
            }
        };
        await_ready(poll, self.config.ready_timeout, self.config.settle_delay).await
    }

    async fn scroll_to_middle(&self) {
        if let Err(e) = self
            .page
            .evaluate("window.scrollTo(0, document.body.scrollHeight / 2)")
            .await
        {
            debug!(error = %e, "Scroll failed");
        }
        sleep(self.config.scroll_pause).await;
    }

    async fn heading(&self) -> Option<String> {
        let element = self.page.find_element("h1").await.ok()?;
        element.inner_text().await.ok().flatten()
    }
}

impl Fetch for ChromeSession {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn open(&mut self, url: &str) -> Result<FetchedPage, FetchError> {
        Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        match timeout(self.config.navigation_timeout, self.page.goto(url)).await {
            Err(_) => return Err(FetchError::Timeout),
            Ok(Err(e)) => return Err(navigation_error(e)),
            Ok(Ok(_)) => {}
        }

        let ready = self.wait_until_ready().await;
        self.scroll_to_middle().await;

        let heading = self.heading().await;
        let markup = self.page.content().await.map_err(session_error)?;
        debug!(bytes = markup.len(), has_heading = heading.is_some(), ready, "Read rendered page");

        Ok(FetchedPage {
            url: url.to_string(),
            heading,
            markup,
        })
    }

    #[instrument(level = "info", skip_all)]
    async fn release(mut self) -> Result<(), FetchError> {
        if let Err(e) = self.page.close().await {
            debug!(error = %e, "Closing tab failed");
        }
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Waiting for browser exit failed");
        }
        self.handler.abort();
        closed.map_err(|e| FetchError::Session(e.to_string()))?;
        info!("Browser session released");
        Ok(())
    }
}
