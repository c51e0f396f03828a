//! Chromium-based sessions using chromiumoxide.
//!
//! Every session launches its own headless browser with a throwaway profile
//! directory, so no browser state is shared between workers.

use super::{BrowserSession, ElementHandle, Renderer};
use crate::config::HarvestConfig;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Environment variable that pins the Chromium executable.
pub const CHROMIUM_PATH_ENV: &str = "REVIEW_HARVESTER_CHROMIUM_PATH";

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launch settings shared by every session of one renderer.
#[derive(Debug, Clone)]
struct LaunchOptions {
    chrome_path: PathBuf,
    user_agent: String,
    headless: bool,
    page_load_timeout: Duration,
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    options: LaunchOptions,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Locate Chromium and remember the launch settings from `config`.
    ///
    /// No browser is started until [`Renderer::new_session`] is called.
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let chrome_path = find_chromium()
            .with_context(|| format!("Chromium not found. Set {CHROMIUM_PATH_ENV}."))?;
        Ok(Self {
            options: LaunchOptions {
                chrome_path,
                user_agent: config.user_agent.clone(),
                headless: config.headless,
                page_load_timeout: config.timings.page_load_timeout,
            },
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>> {
        let opts = &self.options;
        let profile_dir =
            std::env::temp_dir().join(format!("review-harvester-{}", uuid::Uuid::new_v4()));
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&opts.chrome_path)
            .user_data_dir(&profile_dir)
            .arg(format!("--user-agent={}", opts.user_agent))
            .arg("--start-maximized")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .window_size(1920, 1080)
            .request_timeout(opts.page_load_timeout);
        builder = if opts.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                let _ = tokio::fs::remove_dir_all(&profile_dir).await;
                return Err(e).context("failed to create new page");
            }
        };

        self.active_count.fetch_add(1, Ordering::Relaxed);
        debug!("chromium session opened");

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            profile_dir,
            page_load_timeout: opts.page_load_timeout,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    fn active_sessions(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A browser process with its single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    /// Per-session Chromium profile, removed on close.
    profile_dir: PathBuf,
    page_load_timeout: Duration,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumSession {
    async fn eval_f64(&self, script: &str) -> Result<f64> {
        self.page
            .evaluate(script)
            .await
            .with_context(|| format!("JS execution failed: {script}"))?
            .into_value::<f64>()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let timeout_ms = self.page_load_timeout.as_millis();
        match tokio::time::timeout(self.page_load_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Err(_) => bail!("navigation to {url} timed out after {timeout_ms}ms"),
        }
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("no elements for {selector}"))?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn scroll_by(&self, pixels: f64) -> Result<()> {
        self.page
            .evaluate(format!("window.scrollBy(0, {pixels})"))
            .await
            .context("scroll failed")?;
        Ok(())
    }

    async fn viewport_height(&self) -> Result<f64> {
        self.eval_f64("window.innerHeight").await
    }

    async fn scroll_offset(&self) -> Result<f64> {
        self.eval_f64("window.pageYOffset").await
    }

    async fn html(&self) -> Result<String> {
        let result = self
            .page
            .evaluate("document.documentElement.outerHTML")
            .await
            .context("failed to get HTML")?;

        result
            .into_value::<String>()
            .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let mut this = *self;
        this.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = this.page.close().await;
        let closed = this.browser.close().await;
        let _ = this.browser.wait().await;
        this.handler_task.abort();
        let _ = tokio::fs::remove_dir_all(&this.profile_dir).await;
        closed.context("failed to close Chromium")?;
        debug!("chromium session closed");
        Ok(())
    }
}

/// An element on a Chromium page.
pub struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn text(&self) -> Result<String> {
        Ok(self
            .element
            .inner_text()
            .await
            .context("failed to read element text")?
            .unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.element
            .attribute(name)
            .await
            .with_context(|| format!("failed to read attribute {name}"))
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.element
            .scroll_into_view()
            .await
            .context("failed to scroll element into view")?;
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        self.element.click().await.context("click failed")?;
        Ok(())
    }
}
