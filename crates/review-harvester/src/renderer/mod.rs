//! Browser session abstraction.
//!
//! Defines the `Renderer`, `BrowserSession` and `ElementHandle` traits that
//! abstract over the browser engine (currently Chromium via chromiumoxide).
//! Collectors and parsers only ever see these traits.

pub mod chromium;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// A browser engine that hands out dedicated sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a new session. The caller owns it exclusively and must close it.
    async fn new_session(&self) -> Result<Box<dyn BrowserSession>>;
    /// Number of sessions opened and not yet closed.
    fn active_sessions(&self) -> usize;
}

/// A single live page, owned by exactly one task.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Load `url` and wait for the navigation to finish.
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// URL of the currently loaded document.
    async fn current_url(&self) -> Result<String>;
    /// Every element matching a CSS selector, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>>;
    /// Scroll the window vertically.
    async fn scroll_by(&self, pixels: f64) -> Result<()>;
    /// Height of the visible viewport in CSS pixels.
    async fn viewport_height(&self) -> Result<f64>;
    /// Current vertical scroll offset in CSS pixels.
    async fn scroll_offset(&self) -> Result<f64>;
    /// Serialized DOM of the current document.
    async fn html(&self) -> Result<String>;
    /// Release the session and everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A located element on a live page.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Rendered text content.
    async fn text(&self) -> Result<String>;
    /// Attribute value, `None` when the attribute is missing.
    async fn attribute(&self, name: &str) -> Result<Option<String>>;
    async fn scroll_into_view(&self) -> Result<()>;
    async fn click(&self) -> Result<()>;
}

/// Poll `find_all(selector)` until it matches or `timeout` elapses.
///
/// Lookup errors while polling count as "not yet"; only the timeout fails.
pub async fn wait_for_selector(
    session: &dyn BrowserSession,
    selector: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Vec<Box<dyn ElementHandle>>> {
    let start = Instant::now();
    loop {
        if let Ok(found) = session.find_all(selector).await {
            if !found.is_empty() {
                return Ok(found);
            }
        }
        if start.elapsed() >= timeout {
            bail!(
                "timed out after {}ms waiting for {selector}",
                timeout.as_millis()
            );
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Matches the selector only after `appear_after` lookups.
    struct SlowSession {
        calls: Arc<AtomicUsize>,
        appear_after: usize,
    }

    struct Dummy;

    #[async_trait]
    impl ElementHandle for Dummy {
        async fn text(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn attribute(&self, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn scroll_into_view(&self) -> Result<()> {
            Ok(())
        }
        async fn click(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl BrowserSession for SlowSession {
        async fn navigate(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }
        async fn current_url(&self) -> Result<String> {
            Ok("about:blank".into())
        }
        async fn find_all(&self, _selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n > self.appear_after {
                Ok(vec![Box::new(Dummy) as Box<dyn ElementHandle>])
            } else if n % 2 == 0 {
                bail!("stale document")
            } else {
                Ok(Vec::new())
            }
        }
        async fn scroll_by(&self, _pixels: f64) -> Result<()> {
            Ok(())
        }
        async fn viewport_height(&self) -> Result<f64> {
            Ok(800.0)
        }
        async fn scroll_offset(&self) -> Result<f64> {
            Ok(0.0)
        }
        async fn html(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_wait_for_selector_tolerates_errors_until_match() {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = SlowSession {
            calls: Arc::clone(&calls),
            appear_after: 3,
        };
        let found = wait_for_selector(
            &session,
            "h1",
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_wait_for_selector_times_out() {
        let session = SlowSession {
            calls: Arc::new(AtomicUsize::new(0)),
            appear_after: usize::MAX,
        };
        let err = wait_for_selector(
            &session,
            ".movie",
            Duration::from_millis(20),
            Duration::from_millis(2),
        )
        .await
        .err()
        .expect("wait should time out");
        assert!(err.to_string().contains(".movie"));
    }
}
