//! Frontier collector: walk the paginated listing and gather review URLs.
//!
//! Per listing page: make sure the full-listing view is active, scroll until
//! the scroll offset stops moving, collect every review anchor, then click
//! "Next". Control failures are logged and the walk carries on with whatever
//! the page currently shows.

use crate::config::Timings;
use crate::extract::normalize_space;
use crate::progress::{Progress, ProgressEventKind};
use crate::renderer::{wait_for_selector, BrowserSession};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Navigation control that switches the listing to the full view.
pub const FULL_LISTING_SELECTOR: &str = r#"[id="6"]"#;
/// One entry of the listing, present once the listing has rendered.
pub const LISTING_ITEM_SELECTOR: &str = ".movie";
/// Anchors that point at review pages.
pub const REVIEW_LINK_SELECTOR: &str = "a[href*='/review/']";
const REVIEW_PATH_MARKER: &str = "/review/";
const NEXT_SELECTOR: &str = "button";
const NEXT_LABEL: &str = "Next";

/// Drives one listing session.
pub struct FrontierCollector {
    timings: Timings,
    progress: Progress,
    listing_active: bool,
    /// Set once a full wait for the control came up empty.
    control_missing: bool,
}

impl FrontierCollector {
    pub fn new(timings: Timings, progress: Progress) -> Self {
        Self {
            timings,
            progress,
            listing_active: false,
            control_missing: false,
        }
    }

    /// Load the listing entry point. This is the only fatal step.
    pub async fn open(
        &mut self,
        session: &mut dyn BrowserSession,
        start_url: &str,
    ) -> Result<()> {
        session
            .navigate(start_url)
            .await
            .with_context(|| format!("failed to open listing {start_url}"))?;
        self.listing_active = false;
        self.control_missing = false;
        Ok(())
    }

    /// Walk at most `max_pages` listing pages, returning every review URL in
    /// collection order. Repeated URLs are kept.
    pub async fn collect(
        &mut self,
        session: &mut dyn BrowserSession,
        max_pages: u32,
    ) -> Vec<String> {
        let mut urls = Vec::new();
        for page in 1..=max_pages {
            self.ensure_full_listing(session).await;

            if let Err(e) = wait_for_selector(
                &*session,
                LISTING_ITEM_SELECTOR,
                self.timings.ready_timeout,
                self.timings.poll_interval,
            )
            .await
            {
                warn!("listing page {page} shows no entries yet: {e}");
            }

            let scrolls = self.stabilize_scroll(session).await;
            let links = self.collect_links(session).await;
            info!(
                "listing page {page}: {} review links ({scrolls} scrolls)",
                links.len()
            );
            urls.extend(links.iter().cloned());
            self.progress.emit(ProgressEventKind::PageCollected {
                page,
                links: links.len(),
                total_links: urls.len(),
            });

            if page == max_pages {
                tokio::time::sleep(self.timings.final_page_pause).await;
                break;
            }
            self.click_next(session).await;
        }
        urls
    }

    /// Click the full-listing control unless a previous click already took.
    ///
    /// Re-clicking an active listing would send it back to page one. Only the
    /// first attempt waits the full ready timeout; once the control has been
    /// missed, later pages look it up once without waiting.
    async fn ensure_full_listing(&mut self, session: &mut dyn BrowserSession) {
        if self.listing_active {
            return;
        }
        let wait = if self.control_missing {
            Duration::ZERO
        } else {
            self.timings.ready_timeout
        };
        match self.click_full_listing(session, wait).await {
            Ok(()) => {
                info!("entered full listing view");
                self.listing_active = true;
            }
            Err(e) if self.control_missing => {
                debug!("full listing control still unavailable: {e:#}");
            }
            Err(e) => {
                warn!("could not open the full listing view: {e:#}");
                self.control_missing = true;
                self.progress.emit(ProgressEventKind::Warning {
                    message: format!("full listing control unavailable: {e}"),
                });
            }
        }
    }

    async fn click_full_listing(
        &self,
        session: &mut dyn BrowserSession,
        wait: Duration,
    ) -> Result<()> {
        let found = wait_for_selector(
            &*session,
            FULL_LISTING_SELECTOR,
            wait,
            self.timings.poll_interval,
        )
        .await?;
        let control = found.first().context("full listing control vanished")?;
        control.scroll_into_view().await?;
        tokio::time::sleep(self.timings.control_pause).await;
        control.click().await?;
        tokio::time::sleep(self.timings.control_pause).await;
        Ok(())
    }

    /// Scroll one viewport at a time until two consecutive offset samples
    /// agree. Returns the number of scrolls issued.
    pub async fn stabilize_scroll(&self, session: &mut dyn BrowserSession) -> usize {
        let mut scrolls = 0;
        let mut last = match session.scroll_offset().await {
            Ok(offset) => offset,
            Err(e) => {
                warn!("cannot read scroll offset: {e:#}");
                return scrolls;
            }
        };
        loop {
            let step = match session.viewport_height().await {
                Ok(h) => h,
                Err(e) => {
                    warn!("cannot read viewport height: {e:#}");
                    break;
                }
            };
            if let Err(e) = session.scroll_by(step).await {
                warn!("scroll failed: {e:#}");
                break;
            }
            scrolls += 1;
            tokio::time::sleep(self.timings.scroll_pause).await;
            let offset = match session.scroll_offset().await {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("cannot read scroll offset: {e:#}");
                    break;
                }
            };
            if offset == last {
                break;
            }
            last = offset;
        }
        tokio::time::sleep(self.timings.scroll_settle).await;
        scrolls
    }

    /// Every review anchor on the page, in document order, as absolute URLs.
    /// Anchors whose href cannot be read are skipped.
    pub async fn collect_links(&self, session: &mut dyn BrowserSession) -> Vec<String> {
        let anchors = match session.find_all(REVIEW_LINK_SELECTOR).await {
            Ok(anchors) => anchors,
            Err(e) => {
                warn!("review link lookup failed: {e:#}");
                return Vec::new();
            }
        };
        let base = session
            .current_url()
            .await
            .ok()
            .and_then(|u| Url::parse(&u).ok());

        let mut links = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            let href = match anchor.attribute("href").await {
                Ok(Some(href)) => href,
                Ok(None) => continue,
                Err(e) => {
                    debug!("skipping anchor: {e:#}");
                    continue;
                }
            };
            let absolute = match &base {
                Some(base) => base
                    .join(&href)
                    .map(|u| u.to_string())
                    .unwrap_or(href),
                None => href,
            };
            if absolute.contains(REVIEW_PATH_MARKER) {
                links.push(absolute);
            }
        }
        links
    }

    /// Click the button labelled "Next". A missing button is logged only.
    async fn click_next(&self, session: &mut dyn BrowserSession) {
        match self.find_and_click_next(session).await {
            Ok(()) => tokio::time::sleep(self.timings.next_pause).await,
            Err(e) => warn!("could not click Next: {e:#}"),
        }
    }

    async fn find_and_click_next(&self, session: &mut dyn BrowserSession) -> Result<()> {
        for button in session.find_all(NEXT_SELECTOR).await? {
            let Ok(text) = button.text().await else {
                continue;
            };
            if normalize_space(&text) == NEXT_LABEL {
                return button.click().await;
            }
        }
        anyhow::bail!("no {NEXT_LABEL:?} button on the page")
    }
}

/// Drop repeated URLs, keeping each first occurrence in place.
pub fn dedupe_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter()
        .filter(|u| seen.insert(u.clone()))
        .collect()
}
