//! Document parser: one review URL in, one complete [`Record`] out.

use crate::config::Timings;
use crate::extract::{self, fail_soft, Document, SECTION_HEADINGS, TABLE_LABELS};
use crate::record::Record;
use crate::renderer::{wait_for_selector, BrowserSession};
use anyhow::{Context, Result};
use tracing::debug;

/// Element whose presence marks a review page as rendered.
const READY_SELECTOR: &str = "h1";

/// Load `url` in `session` and extract every field.
///
/// Only navigation and snapshot failures are errors. A page that never
/// signals readiness is read anyway after a fixed delay, and any field that
/// cannot be located comes back empty.
pub async fn parse(
    session: &mut dyn BrowserSession,
    url: &str,
    timings: &Timings,
) -> Result<Record> {
    session
        .navigate(url)
        .await
        .with_context(|| format!("failed to load {url}"))?;

    if let Err(e) = wait_for_selector(
        &*session,
        READY_SELECTOR,
        timings.ready_timeout,
        timings.poll_interval,
    )
    .await
    {
        debug!("{url} not ready ({e}), reading after fallback delay");
        tokio::time::sleep(timings.ready_fallback_delay).await;
    }

    let html = session
        .html()
        .await
        .with_context(|| format!("failed to snapshot {url}"))?;
    Ok(extract_record(&Document::parse(&html), url))
}

/// Run every lookup against `doc`. Lookups are independent of each other.
pub fn extract_record(doc: &Document, url: &str) -> Record {
    let [year, decade, runtime_minutes, box_office, genre, subgenre, studio, country] =
        TABLE_LABELS.map(|label| fail_soft(label, extract::label_value(doc, label)));
    let [director, starring, awards] =
        SECTION_HEADINGS.map(|heading| fail_soft(heading, extract::section_text(doc, heading)));

    Record {
        url: url.to_string(),
        title: fail_soft("title", extract::title(doc)),
        score: fail_soft("score", extract::score(doc)),
        year,
        decade,
        runtime_minutes,
        box_office,
        genre,
        subgenre,
        studio,
        country,
        director,
        starring,
        awards,
    }
}
