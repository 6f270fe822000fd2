//! Page classification and page-to-record extraction.
//!
//! Every field is derived by an ordered chain of independent strategies;
//! the first one that yields a value wins, and a field nobody can find is
//! left empty instead of failing the record.

mod dates;
mod keywords;
mod listing;
mod movie;
mod person;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ExtractError;

pub use dates::parse_partial_date;
pub use keywords::extract_keywords;
pub use listing::extract_listing;
pub use movie::extract_movie;
pub use person::extract_person;

static TITLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/title/(tt\d+)").expect("static regex"));
static NAME_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/name/(nm\d+)").expect("static regex"));

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageKind {
    Listing,
    MovieDetail,
    PersonDetail,
    Unknown,
}

/// Classifies a URL by its path alone.
pub fn classify(url: &str) -> PageKind {
    let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.to_string());

    if path.starts_with("/chart/") {
        PageKind::Listing
    } else if path.starts_with("/title/") && TITLE_ID.is_match(&path) {
        PageKind::MovieDetail
    } else if path.starts_with("/name/") && NAME_ID.is_match(&path) {
        PageKind::PersonDetail
    } else {
        PageKind::Unknown
    }
}

pub fn movie_id_from_path(path: &str) -> Option<String> {
    TITLE_ID.captures(path).map(|c| c[1].to_string())
}

pub fn person_id_from_path(path: &str) -> Option<String> {
    NAME_ID.captures(path).map(|c| c[1].to_string())
}

pub fn movie_url(base_url: &str, imdb_id: &str) -> String {
    format!("{}/title/{}/", base_url.trim_end_matches('/'), imdb_id)
}

pub fn person_url(base_url: &str, imdb_id: &str) -> String {
    format!("{}/name/{}/", base_url.trim_end_matches('/'), imdb_id)
}

/// One way of deriving a field from a parsed document.
pub(crate) type Strategy<T> = fn(&Html) -> Result<Option<T>, ExtractError>;

/// Applies `strategies` in order and returns the first value found.
pub(crate) fn first_match<T>(
    doc: &Html,
    strategies: &[Strategy<T>],
) -> Result<Option<T>, ExtractError> {
    for strategy in strategies {
        if let Some(value) = strategy(doc)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

pub(crate) fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css)
        .map_err(|e| ExtractError::InvalidSelector { selector: css, reason: e.to_string() })
}

/// Whitespace-collapsed text of an element, `None` when blank.
pub(crate) fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

pub(crate) fn first_text(doc: &Html, css: &'static str) -> Result<Option<String>, ExtractError> {
    let sel = selector(css)?;
    Ok(doc.select(&sel).find_map(element_text))
}

pub(crate) fn first_attr(
    doc: &Html,
    css: &'static str,
    attr: &str,
) -> Result<Option<String>, ExtractError> {
    let sel = selector(css)?;
    Ok(doc
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string))
}

/// Text of the hero heading's primary span (movie title, person name).
pub(crate) fn hero_primary_text(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(doc, "h1[data-testid=\"hero__pageTitle\"] span.hero__primary-text")
}

pub(crate) fn hero_heading(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(doc, "h1[data-testid=\"hero__pageTitle\"]")
}
