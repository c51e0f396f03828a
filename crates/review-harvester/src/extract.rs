//! Field extraction over a rendered-page snapshot.
//!
//! Each strategy returns a [`Lookup`]: the located text, or a
//! [`LookupError`] describing what was missing. [`fail_soft`] is the only
//! place a miss turns into an empty string, so nothing in this module can
//! make a caller fail.
//!
//! Lookups run against a `scraper::Html` parse of the page as the browser
//! rendered it, which keeps them synchronous and testable without a browser.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Labels read from the info table, in record order.
pub const TABLE_LABELS: [&str; 8] = [
    "Year Released",
    "Decade Released",
    "Runtime",
    "Box Office",
    "Genre",
    "Sub-Genre",
    "Studio/Company",
    "Country",
];

/// Labels whose value cell holds a set of tag buttons instead of text.
pub const MULTI_VALUED_LABELS: [&str; 3] = ["Genre", "Sub-Genre", "Studio/Company"];

/// Headings of the free-text sections, in record order.
pub const SECTION_HEADINGS: [&str; 3] = ["Director", "Starring", "Awards"];

const TITLE_ID_SELECTOR: &str = "#reviewPage-title";
const TITLE_FALLBACK_SELECTOR: &str = "h2";
const SCORE_ROW_SELECTOR: &str = ".score-row";
const SCORE_ROW_INDEX: usize = 2;
const SCORE_HEADING_INDEX: usize = 1;
const TAG_SELECTOR: &str = "button";

/// Why a lookup produced nothing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid selector {0:?}")]
    Selector(String),
}

/// Outcome of one extraction strategy.
pub type Lookup = Result<String, LookupError>;

/// XPath `normalize-space`: trim, and collapse whitespace runs to one space.
pub fn normalize_space(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map a lookup to its text, or to `""` on any miss.
pub fn fail_soft(field: &str, lookup: Lookup) -> String {
    match lookup {
        Ok(text) => text,
        Err(e) => {
            debug!(field, "lookup miss: {e}");
            String::new()
        }
    }
}

/// A parsed snapshot of one rendered page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    fn select(&self, css: &str) -> Result<Vec<ElementRef<'_>>, LookupError> {
        let sel = parse_selector(css)?;
        Ok(self.html.select(&sel).collect())
    }
}

fn parse_selector(css: &str) -> Result<Selector, LookupError> {
    Selector::parse(css).map_err(|_| LookupError::Selector(css.to_string()))
}

fn select_within<'a>(
    scope: ElementRef<'a>,
    css: &str,
) -> Result<Vec<ElementRef<'a>>, LookupError> {
    let sel = parse_selector(css)?;
    Ok(scope.select(&sel).collect())
}

fn text_of(el: ElementRef<'_>) -> String {
    normalize_space(&el.text().collect::<String>())
}

/// First following sibling element named `tag`.
fn following_sibling<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sib| sib.value().name() == tag)
}

/// Following sibling elements up to, not including, the next one named `stop`.
fn siblings_until<'a>(el: ElementRef<'a>, stop: &str) -> Vec<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|sib| sib.value().name() != stop)
        .collect()
}

/// Value cell next to the cell reading `"<label>:"`.
///
/// For [`MULTI_VALUED_LABELS`] the tag buttons inside the value cell are
/// joined with `", "`; a cell without buttons yields `""`.
pub fn label_value(doc: &Document, label: &str) -> Lookup {
    let wanted = format!("{label}:");
    let cell = doc
        .select("td")?
        .into_iter()
        .find(|td| text_of(*td) == wanted)
        .ok_or_else(|| LookupError::NotFound(format!("label cell {wanted:?}")))?;
    let value = following_sibling(cell, "td")
        .ok_or_else(|| LookupError::NotFound(format!("value cell for {wanted:?}")))?;

    if MULTI_VALUED_LABELS.contains(&label) {
        let tags: Vec<String> = select_within(value, TAG_SELECTOR)?
            .into_iter()
            .map(text_of)
            .collect();
        return Ok(tags.join(", "));
    }
    Ok(text_of(value))
}

/// Free text following the `h3` reading `heading`.
///
/// The section body is everything between the heading and the next `h3`.
/// A paragraph directly after the heading wins outright. Otherwise the first
/// container in the body has its paragraphs paired with the items of the
/// list that follows each one (before the next paragraph), as
/// `"<paragraph> - <item>"`, all joined with `", "`.
pub fn section_text(doc: &Document, heading: &str) -> Lookup {
    let h3 = doc
        .select("h3")?
        .into_iter()
        .find(|h| text_of(*h) == heading)
        .ok_or_else(|| LookupError::NotFound(format!("section heading {heading:?}")))?;
    let body = siblings_until(h3, "h3");

    if let Some(p) = body.first().filter(|el| el.value().name() == "p") {
        return Ok(text_of(*p));
    }

    let container = body
        .iter()
        .find(|el| el.value().name() == "div")
        .ok_or_else(|| LookupError::NotFound(format!("section body for {heading:?}")))?;
    let mut pairs = Vec::new();
    for p in select_within(*container, "p")? {
        let Some(list) = siblings_until(p, "p")
            .into_iter()
            .find(|sib| sib.value().name() == "ul")
        else {
            continue;
        };
        let lead = text_of(p);
        for item in select_within(list, "li")? {
            pairs.push(format!("{lead} - {}", text_of(item)));
        }
    }
    Ok(pairs.join(", "))
}

/// Average score: second heading of the third score row.
pub fn score(doc: &Document) -> Lookup {
    let rows = doc.select(SCORE_ROW_SELECTOR)?;
    let row = rows
        .get(SCORE_ROW_INDEX)
        .ok_or_else(|| LookupError::NotFound(format!("score row {SCORE_ROW_INDEX}")))?;
    let headings = select_within(*row, "h1")?;
    headings
        .get(SCORE_HEADING_INDEX)
        .map(|h| text_of(*h))
        .ok_or_else(|| LookupError::NotFound("score heading".to_string()))
}

/// Review title by id, else the first secondary heading.
pub fn title(doc: &Document) -> Lookup {
    for css in [TITLE_ID_SELECTOR, TITLE_FALLBACK_SELECTOR] {
        if let Some(el) = doc.select(css)?.first() {
            return Ok(text_of(*el));
        }
    }
    Err(LookupError::NotFound("title".to_string()))
}
