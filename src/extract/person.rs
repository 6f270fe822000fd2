use std::collections::BTreeSet;

use scraper::Html;
use tracing::{debug, warn};

use super::{
    Strategy, element_text, first_match, first_text, hero_heading, hero_primary_text,
    movie_id_from_path, parse_partial_date, person_id_from_path, selector,
};
use crate::{error::ExtractError, models::Person};

const NAME: [Strategy<String>; 2] = [hero_primary_text, hero_heading];
const BIRTH_DATE: [Strategy<String>; 2] = [birth_date_second_span, birth_date_link];
const BIO: [Strategy<String>; 2] = [bio_section, any_html_content];

const FILMOGRAPHY_CONTAINERS: [&str; 2] =
    ["[data-testid=\"Filmography\"]", "[id^=\"filmography\"]"];

pub fn extract_person(html: &str, source_url: &str) -> Result<Person, ExtractError> {
    let imdb_id = person_id_from_path(source_url)
        .ok_or_else(|| ExtractError::MissingIdentifier { url: source_url.to_string() })?;
    let doc = Html::parse_document(html);

    let name = first_match(&doc, &NAME)?;

    let birth_date = match first_match(&doc, &BIRTH_DATE)? {
        Some(text) => match parse_partial_date(&text) {
            Ok(date) => Some(date),
            Err(err) => {
                warn!(imdb_id = %imdb_id, text = %text, error = %err, "unparseable birth date");
                None
            },
        },
        None => None,
    };

    let bio = first_match(&doc, &BIO)?;
    let filmography = filmography(&doc)?;

    debug!(
        imdb_id = %imdb_id,
        name = ?name,
        birth_precision = ?birth_date.map(|d| d.precision),
        filmography = filmography.len(),
        "extracted person"
    );

    Ok(Person { imdb_id, name, birth_date, bio, filmography })
}

/// The birthdate block reads "Born" then the date; the date is the second
/// non-empty span.
fn birth_date_second_span(doc: &Html) -> Result<Option<String>, ExtractError> {
    let container_sel = selector("div[data-testid=\"birth-and-death-birthdate\"]")?;
    let span_sel = selector("span")?;
    Ok(doc
        .select(&container_sel)
        .next()
        .and_then(|container| container.select(&span_sel).filter_map(element_text).nth(1)))
}

fn birth_date_link(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(doc, "li[data-testid=\"person-birthdate\"] a")
}

fn bio_section(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(doc, "div[data-testid=\"bio\"] div.ipc-html-content-inner-div")
}

fn any_html_content(doc: &Html) -> Result<Option<String>, ExtractError> {
    first_text(doc, "div.ipc-html-content-inner-div")
}

/// Movie identifiers linked from the filmography block. Collapsed or
/// paginated credits are not expanded, so this can be incomplete.
fn filmography(doc: &Html) -> Result<BTreeSet<String>, ExtractError> {
    let link_sel = selector("a[href*=\"/title/tt\"]")?;
    let mut ids = BTreeSet::new();

    for css in FILMOGRAPHY_CONTAINERS {
        let container_sel = selector(css)?;
        for container in doc.select(&container_sel) {
            ids.extend(
                container
                    .select(&link_sel)
                    .filter_map(|a| a.value().attr("href"))
                    .filter_map(movie_id_from_path),
            );
        }
        if !ids.is_empty() {
            break;
        }
    }

    Ok(ids)
}
