use scraper::{ElementRef, Html};
use tracing::debug;

use super::{element_text, movie_id_from_path, selector};
use crate::{error::ExtractError, models::ListingEntry};

const CONTAINERS: [&str; 3] =
    ["ul.compact-list-view", "ul.ipc-metadata-list", "[data-testid=\"chart-layout-main-column\"]"];

/// Ranked entries of a chart page, in page order. Entries without a
/// detail link are skipped.
pub fn extract_listing(html: &str) -> Result<Vec<ListingEntry>, ExtractError> {
    let doc = Html::parse_document(html);
    let item_sel = selector("li.ipc-metadata-list-summary-item")?;

    let mut container = None;
    for css in CONTAINERS {
        let sel = selector(css)?;
        if let Some(el) = doc.select(&sel).find(|el| el.select(&item_sel).next().is_some()) {
            container = Some(el);
            break;
        }
    }

    let items: Vec<ElementRef<'_>> = match container {
        Some(el) => el.select(&item_sel).collect(),
        None => {
            debug!("no ranked list container, scanning whole document");
            doc.select(&item_sel).collect()
        },
    };

    let link_sel = selector("a.ipc-title-link-wrapper")?;
    let fallback_link_sel = selector("a[href*=\"/title/tt\"]")?;
    let heading_sel = selector("h3.ipc-title__text")?;

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let link = item.select(&link_sel).next().or_else(|| item.select(&fallback_link_sel).next());
        let Some(href) = link.and_then(|a| a.value().attr("href")) else {
            continue;
        };
        let Some(imdb_id) = movie_id_from_path(href) else {
            continue;
        };
        let title = item.select(&heading_sel).next().and_then(element_text).map(strip_rank);
        out.push(ListingEntry { title, imdb_id });
    }

    Ok(out)
}

/// "1. The Shawshank Redemption" -> "The Shawshank Redemption"
fn strip_rank(heading: String) -> String {
    match heading.split_once(". ") {
        Some((rank, rest)) if !rank.is_empty() && rank.chars().all(|c| c.is_ascii_digit()) => {
            rest.to_string()
        },
        _ => heading,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/chart_top.html"));

    #[test]
    fn entries_come_out_in_rank_order() {
        let entries = extract_listing(CHART).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.imdb_id.as_str()).collect();
        assert_eq!(ids, ["tt0111161", "tt0068646", "tt0468569"]);
        assert_eq!(entries[0].title.as_deref(), Some("The Shawshank Redemption"));
        assert_eq!(entries[1].title.as_deref(), Some("The Godfather"));
    }

    #[test]
    fn entries_without_links_are_skipped() {
        let entries = extract_listing(CHART).unwrap();
        assert!(entries.iter().all(|e| e.imdb_id.starts_with("tt")));
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn missing_container_is_not_fatal() {
        let html = r#"<html><body><div>
            <li class="ipc-metadata-list-summary-item">
              <a href="/title/tt0000001/?ref_=x"><h3 class="ipc-title__text">Loose</h3></a>
            </li></div></body></html>"#;
        let entries = extract_listing(html).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].imdb_id, "tt0000001");
        assert_eq!(entries[0].title.as_deref(), Some("Loose"));
    }

    #[test]
    fn empty_page_gives_empty_listing() {
        assert!(extract_listing("<html></html>").unwrap().is_empty());
    }

    #[test]
    fn rank_prefix_is_removed() {
        assert_eq!(strip_rank("12. 12 Angry Men".to_string()), "12 Angry Men");
        assert_eq!(strip_rank("No rank".to_string()), "No rank");
    }
}
