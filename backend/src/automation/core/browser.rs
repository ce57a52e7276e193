use chromiumoxide::browser::HeadlessMode;
use chromiumoxide::handler::Handler;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::BrowserSettings;
use crate::error::{RelayError, RelayResult};

/// A Chrome instance plus the task pumping its CDP handler.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Attaches to a Chrome already listening on the configured DevTools port,
    /// or launches a fresh one with the configured profile.
    pub async fn start(settings: &BrowserSettings, http: &Client) -> RelayResult<Self> {
        if let Some(port) = settings.debug_port {
            if let Some(ws_url) = discover_ws_url(http, port).await {
                info!(port, "attaching to running Chrome");
                let (browser, handler) = Browser::connect(ws_url).await?;
                return Ok(Self::spawn(browser, handler));
            }
        }

        info!(profile = %settings.user_data_dir.display(), "launching Chrome");
        let config = build_config(settings)?;
        let (browser, handler) = Browser::launch(config).await?;
        Ok(Self::spawn(browser, handler))
    }

    fn spawn(browser: Browser, mut handler: Handler) -> Self {
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!(error = %e, "browser handler error");
                    break;
                }
            }
            info!("browser handler ended");
        });
        Self { browser, handler }
    }

    /// Reuses a tab already on the host page, otherwise opens one.
    pub async fn open_page(&self, url: &str) -> RelayResult<Page> {
        let host = host_of(url);
        for page in self.browser.pages().await? {
            if let Ok(Some(current)) = page.url().await {
                if host.map_or(false, |h| current.contains(h)) {
                    info!(url = %current, "attaching to existing tab");
                    page.activate().await?;
                    return Ok(page);
                }
            }
        }
        info!(url, "opening new tab");
        Ok(self.browser.new_page(url).await?)
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        self.handler.abort();
    }
}

fn build_config(settings: &BrowserSettings) -> RelayResult<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .user_data_dir(settings.user_data_dir.clone())
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-blink-features=AutomationControlled");
    builder = if settings.headless {
        builder.headless_mode(HeadlessMode::New)
    } else {
        builder.headless_mode(HeadlessMode::False)
    };
    if let Some(port) = settings.debug_port {
        builder = builder.arg(format!("--remote-debugging-port={}", port));
    }
    builder.build().map_err(RelayError::Launch)
}

async fn discover_ws_url(http: &Client, port: u16) -> Option<String> {
    let url = format!("http://127.0.0.1:{}/json/version", port);
    let body: serde_json::Value = http.get(url).send().await.ok()?.json().await.ok()?;
    body.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().filter(|h| !h.is_empty())
}
