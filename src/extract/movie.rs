use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use super::{
    Strategy, element_text, extract_keywords, first_attr, first_match, first_text, hero_heading,
    hero_primary_text, movie_id_from_path, parse_partial_date, person_id_from_path, selector,
};
use crate::{
    error::ExtractError,
    models::{Credit, Movie, Role},
};

static YEAR_IN_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)").expect("static regex"));
static DURATION_AND_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+h\s*\d+m|\d+h|\d+m)\s*\|\s*([A-Za-z0-9-]+)").expect("static regex")
});
static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+h\s*\d+m|\d+h|\d+m)").expect("static regex"));
static TRAILING_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9-]+)\s*$").expect("static regex"));
static HOURS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)h").expect("static regex"));
static MINUTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)m").expect("static regex"));
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"));
static STAR_SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"⭐\s*(\d+(?:\.\d+)?)").expect("static regex"));

/// Codes accepted when the rating has to be picked off the end of the
/// descriptor on its own.
const RATING_CODES: [&str; 20] = [
    "G", "PG", "PG-13", "R", "NC-17", "TV-Y", "TV-Y7", "TV-G", "TV-PG", "TV-14", "TV-MA", "18A",
    "APPROVED", "Approved", "UNRATED", "Unrated", "NOT-RATED", "Not-Rated", "PASSED", "Passed",
];

/// Tried in order; the first section present scopes the credit search.
const CREDIT_SECTIONS: [&str; 2] =
    ["[data-testid=\"title-pc-wide-screen\"]", "section[data-testid=\"title-cast\"]"];

const TITLE: [Strategy<String>; 3] = [hero_primary_text, hero_heading, og_title];
const TITLE_META: [Strategy<String>; 3] = [twitter_title, twitter_title_by_name, og_title_raw];
const DESCRIPTOR: [Strategy<String>; 2] = [twitter_description, twitter_description_by_name];
const RATING: [Strategy<f64>; 2] = [aggregate_score, star_score];
const PLOT: [Strategy<String>; 3] = [plot_xl, plot_l, plot_small];
const POSTER: [Strategy<String>; 3] = [hero_poster, any_ipc_image, og_image];
const RELEASE_DATE: [Strategy<String>; 2] = [release_date_by_label, release_date_by_testid];
const GENRES: [Strategy<Vec<String>>; 2] = [genre_chips, interest_chips];

/// Builds a movie record from a title page. Only the catalog identifier
/// (taken from `source_url`) is mandatory; every other field is
/// best-effort.
pub fn extract_movie(html: &str, source_url: &str) -> Result<Movie, ExtractError> {
    let imdb_id = movie_id_from_path(source_url)
        .ok_or_else(|| ExtractError::MissingIdentifier { url: source_url.to_string() })?;
    let doc = Html::parse_document(html);

    let title = first_match(&doc, &TITLE)?;
    let year = first_match(&doc, &TITLE_META)?.as_deref().and_then(year_from_title_meta);
    let (runtime_minutes, content_rating) = match first_match(&doc, &DESCRIPTOR)? {
        Some(descriptor) => parse_descriptor(&descriptor),
        None => (None, None),
    };
    let rating = first_match(&doc, &RATING)?;
    let plot_summary = first_match(&doc, &PLOT)?;
    let poster_url = first_match(&doc, &POSTER)?;

    let release_date = match first_match(&doc, &RELEASE_DATE)? {
        Some(text) => match parse_partial_date(&text) {
            Ok(date) => Some(date),
            Err(err) => {
                warn!(imdb_id = %imdb_id, text = %text, error = %err, "unparseable release date");
                None
            },
        },
        None => None,
    };

    let genres = first_match(&doc, &GENRES)?.unwrap_or_default();
    let credits = extract_credits(&doc)?;
    let keywords = plot_summary.as_deref().map(extract_keywords).unwrap_or_default();

    debug!(
        imdb_id = %imdb_id,
        title = ?title,
        year = ?year,
        release_precision = ?release_date.map(|d| d.precision),
        genres = genres.len(),
        credits = credits.len(),
        keywords = keywords.len(),
        "extracted movie"
    );

    Ok(Movie {
        imdb_id,
        title,
        year,
        runtime_minutes,
        rating,
        content_rating,
        plot_summary,
        poster_url,
        release_date,
        genres,
        credits,
        keywords,
    })
}

fn og_title_raw(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_attr(doc, "meta[property=\"og:title\"]", "content")
}

/// `og:title` with the "(1994) ⭐ 9.3 | Drama" tail and " - IMDb" removed.
fn og_title(doc: &Html) -> Result<Option<String>, ExtractError> {
    Ok(og_title_raw(doc)?.and_then(|raw| {
        let head = raw.split(['(', '⭐', '|']).next().unwrap_or("");
        let head = head.trim().trim_end_matches("- IMDb").trim();
        (!head.is_empty()).then(|| head.to_string())
    }))
}

fn twitter_title(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_attr(doc, "meta[property=\"twitter:title\"]", "content")
}

fn twitter_title_by_name(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_attr(doc, "meta[name=\"twitter:title\"]", "content")
}

fn twitter_description(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_attr(doc, "meta[property=\"twitter:description\"]", "content")
}

fn twitter_description_by_name(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_attr(doc, "meta[name=\"twitter:description\"]", "content")
}

fn year_from_title_meta(content: &str) -> Option<i32> {
    YEAR_IN_PARENS.captures(content).and_then(|c| c[1].parse().ok())
}

/// Splits "2h 22m | R" into runtime minutes and content rating. Falls back
/// to a bare duration and a bare trailing rating code when the combined
/// shape is absent.
pub(crate) fn parse_descriptor(descriptor: &str) -> (Option<i32>, Option<String>) {
    if let Some(caps) = DURATION_AND_CODE.captures(descriptor) {
        return (runtime_minutes(&caps[1]), Some(caps[2].to_string()));
    }

    let runtime = DURATION.captures(descriptor).and_then(|c| runtime_minutes(&c[1]));
    let code = TRAILING_CODE
        .captures(descriptor)
        .map(|c| c[1].to_string())
        .filter(|code| RATING_CODES.contains(&code.as_str()));
    (runtime, code)
}

/// "2h 22m" -> 142, "45m" -> 45, "3h" -> 180.
pub(crate) fn runtime_minutes(duration: &str) -> Option<i32> {
    let hours = HOURS.captures(duration).and_then(|c| c[1].parse::<i32>().ok());
    let minutes = MINUTES.captures(duration).and_then(|c| c[1].parse::<i32>().ok());
    if hours.is_none() && minutes.is_none() {
        return None;
    }
    hours.unwrap_or(0).checked_mul(60)?.checked_add(minutes.unwrap_or(0))
}

fn aggregate_score(doc: &Html) -> Result<Option<f64>, ExtractError> {
    let text =
        first_text(doc, "div[data-testid=\"hero-rating-bar__aggregate-rating__score\"] span")?;
    Ok(text.and_then(|t| DECIMAL.find(&t).and_then(|m| m.as_str().parse().ok())))
}

fn star_score(doc: &Html) -> Result<Option<f64>, ExtractError> {
    Ok(first_match(doc, &TITLE_META)?
        .and_then(|meta| STAR_SCORE.captures(&meta).and_then(|c| c[1].parse().ok())))
}

fn plot_xl(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(doc, "span[data-testid=\"plot-xl\"]")
}

fn plot_l(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(doc, "span[data-testid=\"plot-l\"]")
}

fn plot_small(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(doc, "span[data-testid=\"plot-xs_to_m\"]")
}

fn hero_poster(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_attr(doc, "div[data-testid=\"hero-media__poster\"] img.ipc-image", "src")
}

fn any_ipc_image(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_attr(doc, "img.ipc-image", "src")
}

fn og_image(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_attr(doc, "meta[property=\"og:image\"]", "content")
}

/// Finds the "Release date" label, climbs to its list item and reads the
/// first link of the value container next to it.
fn release_date_by_label(doc: &Html) -> Result<Option<String>, ExtractError> {
    let label_sel = selector("a, span")?;
    let value_sel = selector("[class*=\"ipc-metadata-list-item__content-container\"] a")?;

    for label in doc.select(&label_sel) {
        if element_text(label).as_deref() != Some("Release date") {
            continue;
        }
        let item = label
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "li");
        if let Some(value) = item.and_then(|li| li.select(&value_sel).find_map(element_text)) {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn release_date_by_testid(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(
        doc,
        "li[data-testid=\"title-details-releasedate\"] \
         [class*=\"ipc-metadata-list-item__content-container\"] a",
    )
}

fn chips(doc: &Html, css: &'static str) -> Result<Option<Vec<String>>, ExtractError> {
    let sel = selector(css)?;
    let mut out: Vec<String> = Vec::new();
    for name in doc.select(&sel).filter_map(element_text) {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    Ok((!out.is_empty()).then_some(out))
}

fn genre_chips(doc: &Html) -> Result<Option<Vec<String>>, ExtractError> {
    chips(doc, "div[data-testid=\"genres\"] a.ipc-chip")
}

fn interest_chips(doc: &Html) -> Result<Option<Vec<String>>, ExtractError> {
    chips(doc, "div[data-testid=\"interests\"] a.ipc-chip")
}

/// Directors, writers and stars from the principal-credit list, each
/// (person, role) pair at most once.
fn extract_credits(doc: &Html) -> Result<Vec<Credit>, ExtractError> {
    let mut scope = doc.root_element();
    for css in CREDIT_SECTIONS {
        let sel = selector(css)?;
        if let Some(section) = doc.select(&sel).next() {
            scope = section;
            break;
        }
    }

    let principal_sel = selector("li[data-testid=\"title-pc-principal-credit\"]")?;
    let any_item_sel = selector("li")?;
    let label_sel = selector("[class*=\"ipc-metadata-list-item__label\"]")?;
    let container_link_sel = selector(
        "[class*=\"ipc-metadata-list-item__content-container\"] a[href*=\"/name/nm\"]",
    )?;
    let link_sel = selector("a[href*=\"/name/nm\"]")?;

    let mut items: Vec<ElementRef<'_>> = scope.select(&principal_sel).collect();
    if items.is_empty() {
        items = scope
            .select(&any_item_sel)
            .filter(|li| li.select(&label_sel).next().is_some())
            .collect();
    }

    let mut credits = Vec::new();
    let mut seen: HashSet<(String, Role)> = HashSet::new();

    for item in items {
        let Some(label) = item.select(&label_sel).next().and_then(element_text) else {
            continue;
        };
        let Some(role) = Role::from_credit_label(&label) else {
            continue;
        };

        let mut links: Vec<ElementRef<'_>> = item.select(&container_link_sel).collect();
        if links.is_empty() {
            links = item.select(&link_sel).collect();
        }

        for link in links {
            let Some(person_id) = link.value().attr("href").and_then(person_id_from_path) else {
                continue;
            };
            let Some(name) = element_text(link) else {
                continue;
            };
            if seen.insert((person_id.clone(), role.clone())) {
                credits.push(Credit { person_id, name, role: role.clone() });
            }
        }
    }

    Ok(credits)
}
