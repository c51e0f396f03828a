//! In-memory review site served through the browser session traits.
//!
//! The listing lives at [`listing_url`]. It only shows entries after the
//! full-listing control (`id="6"`) is clicked, and every click on that
//! control sends the listing back to its first page. A "Next" button is
//! rendered on every page but the last. A site built with
//! [`FakeSite::without_full_listing_control`] has no such control and shows
//! its first page straight away. Each entry is 150px tall, so the
//! scroll offset stops moving once the last entry is in view.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use review_harvester::renderer::{BrowserSession, ElementHandle, Renderer};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE: &str = "https://reviews.test";
pub const VIEWPORT: f64 = 400.0;
const ENTRY_HEIGHT: f64 = 150.0;

pub fn listing_url() -> String {
    format!("{BASE}/")
}

pub fn review_url(slug: &str) -> String {
    format!("{BASE}/review/{slug}")
}

/// A review page carrying the usual markers: an `h1`, a titled `h2`, three
/// score rows, a facts table and a director paragraph.
pub fn review_page(title: &str, score: &str, facts: &[(&str, &str)]) -> String {
    let rows: String = facts
        .iter()
        .map(|(label, value)| format!("<tr><td>{label}:</td><td>{value}</td></tr>"))
        .collect();
    format!(
        r#"<html><body>
<h1>Movie Rankings</h1>
<h2 id="reviewPage-title">{title}</h2>
<div class="score-row"><h1>Story</h1><h1>5.0</h1></div>
<div class="score-row"><h1>Acting</h1><h1>5.0</h1></div>
<div class="score-row"><h1>Average</h1><h1>{score}</h1></div>
<table>{rows}</table>
<h3>Director</h3>
<p>Jane Doe</p>
</body></html>"#
    )
}

#[derive(Default)]
pub struct FakeSite {
    listing: Vec<Vec<String>>,
    reviews: HashMap<String, String>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    no_control: bool,
    pub full_listing_clicks: AtomicUsize,
    pub next_clicks: AtomicUsize,
    navigations: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listing page linking to the given review slugs.
    pub fn listing_page(mut self, slugs: &[&str]) -> Self {
        self.listing
            .push(slugs.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn review(mut self, slug: &str, html: String) -> Self {
        self.reviews.insert(review_url(slug), html);
        self
    }

    /// Navigating to `url` fails with an error.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Navigating to `url` panics.
    pub fn panicking(mut self, url: &str) -> Self {
        self.panicking.insert(url.to_string());
        self
    }

    /// Drop the full-listing control; the listing is visible on load.
    pub fn without_full_listing_control(mut self) -> Self {
        self.no_control = true;
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    fn entries(&self, page: usize) -> &[String] {
        self.listing.get(page).map(Vec::as_slice).unwrap_or(&[])
    }

    fn render(&self, state: &SessionState) -> String {
        if state.current == listing_url() {
            return self.render_listing(self.visible_page(state));
        }
        self.reviews
            .get(&state.current)
            .cloned()
            .unwrap_or_else(|| "<html><body><p>Not found</p></body></html>".to_string())
    }

    fn visible_page(&self, state: &SessionState) -> Option<usize> {
        if self.no_control {
            Some(state.listing_page.unwrap_or(0))
        } else {
            state.listing_page
        }
    }

    fn render_listing(&self, page: Option<usize>) -> String {
        let mut html = String::from("<html><body>");
        if !self.no_control {
            html.push_str(r#"<nav><button id="6">Full Rankings</button></nav>"#);
        }
        if let Some(page) = page {
            html.push_str(r#"<div class="listing">"#);
            for slug in self.entries(page) {
                html.push_str(&format!(
                    r#"<div class="movie"><a href="/review/{slug}">{slug}</a></div>"#
                ));
            }
            html.push_str(r#"</div><a href="/about">About</a>"#);
            if page + 1 < self.listing.len() {
                html.push_str("<button> Next </button>");
            }
        }
        html.push_str("</body></html>");
        html
    }

    fn max_offset(&self, state: &SessionState) -> f64 {
        match self.visible_page(state) {
            Some(page) if state.current == listing_url() => {
                self.entries(page).len() as f64 * ENTRY_HEIGHT
            }
            _ => 0.0,
        }
    }
}

/// Hands out sessions on a [`FakeSite`], optionally refusing after `limit`.
pub struct FakeRenderer {
    site: Arc<FakeSite>,
    limit: Option<usize>,
    opened: AtomicUsize,
    active: Arc<AtomicUsize>,
}

impl FakeRenderer {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            limit: None,
            opened: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_session_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>> {
        let n = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        if self.limit.is_some_and(|limit| n > limit) {
            bail!("browser failed to launch");
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            site: Arc::clone(&self.site),
            state: Arc::new(Mutex::new(SessionState::default())),
            active: Arc::clone(&self.active),
        }))
    }

    fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct SessionState {
    current: String,
    listing_page: Option<usize>,
    offset: f64,
}

pub struct FakeSession {
    site: Arc<FakeSite>,
    state: Arc<Mutex<SessionState>>,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.site.navigations.lock().unwrap().push(url.to_string());
        if self.site.panicking.contains(url) {
            panic!("renderer crashed on {url}");
        }
        if self.site.failing.contains(url) {
            bail!("net::ERR_CONNECTION_RESET at {url}");
        }
        let mut state = self.state.lock().unwrap();
        state.current = url.to_string();
        state.listing_page = None;
        state.offset = 0.0;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        let css =
            Selector::parse(selector).map_err(|e| anyhow!("bad selector {selector}: {e:?}"))?;
        let html = {
            let state = self.state.lock().unwrap();
            self.site.render(&state)
        };
        let doc = Html::parse_document(&html);
        let mut found: Vec<Box<dyn ElementHandle>> = Vec::new();
        for el in doc.select(&css) {
            let text: String = el.text().collect();
            let action = if el.value().id() == Some("6") {
                Action::FullListing
            } else if el.value().name() == "button" && text.trim() == "Next" {
                Action::Next
            } else {
                Action::None
            };
            found.push(Box::new(FakeElement {
                site: Arc::clone(&self.site),
                state: Arc::clone(&self.state),
                text,
                attrs: el
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                action,
            }));
        }
        Ok(found)
    }

    async fn scroll_by(&self, pixels: f64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let max = self.site.max_offset(&state);
        state.offset = (state.offset + pixels).min(max);
        Ok(())
    }

    async fn viewport_height(&self) -> Result<f64> {
        Ok(VIEWPORT)
    }

    async fn scroll_offset(&self) -> Result<f64> {
        Ok(self.state.lock().unwrap().offset)
    }

    async fn html(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        Ok(self.site.render(&state))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Action {
    FullListing,
    Next,
    None,
}

struct FakeElement {
    site: Arc<FakeSite>,
    state: Arc<Mutex<SessionState>>,
    text: String,
    attrs: HashMap<String, String>,
    action: Action,
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn text(&self) -> Result<String> {
        Ok(self.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn scroll_into_view(&self) -> Result<()> {
        Ok(())
    }

    async fn click(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match self.action {
            Action::FullListing => {
                self.site.full_listing_clicks.fetch_add(1, Ordering::SeqCst);
                state.listing_page = Some(0);
                state.offset = 0.0;
            }
            Action::Next => {
                self.site.next_clicks.fetch_add(1, Ordering::SeqCst);
                state.listing_page = Some(state.listing_page.unwrap_or(0) + 1);
                state.offset = 0.0;
            }
            Action::None => {}
        }
        Ok(())
    }
}
