use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::ExtractError,
    extract::{
        PageKind, classify, extract_listing, extract_movie, extract_person, movie_url, person_url,
    },
    fetch::{FetchMode, PageSource},
    models::{ListingEntry, Movie, Person},
    robots::RobotsPolicy,
    store::CatalogSink,
};

#[derive(Clone, Debug)]
pub struct CrawlSettings {
    pub base_url: String,
    pub start_url: String,
    pub delay: Duration,
    /// `None` crawls until the frontier is empty.
    pub max_pages: Option<usize>,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            start_url: config.start_url.clone(),
            delay: config.crawl_delay(),
            max_pages: config.max_pages,
        }
    }
}

/// Pending URLs in discovery order plus everything already taken off the
/// queue. A URL is handed out at most once.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    queued: HashSet<String>,
    visited: HashSet<String>,
}

impl Frontier {
    /// Appends `url` unless it is already queued or visited.
    pub fn push(&mut self, url: String) -> bool {
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Takes the next unvisited URL and marks it visited.
    pub fn pop(&mut self) -> Option<String> {
        while let Some(url) = self.queue.pop_front() {
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CrawlReport {
    /// URLs taken off the frontier, in order.
    pub visited: Vec<String>,
    pub processed: usize,
    pub fetch_failures: usize,
    pub extract_failures: usize,
    pub movies_saved: usize,
    pub people_saved: usize,
    pub store_failures: usize,
    /// URLs still queued when the crawl stopped.
    pub remaining: usize,
}

enum Page {
    Listing(Vec<ListingEntry>),
    Movie(Movie),
    Person(Person),
    Unknown,
}

pub struct Crawler<S, K> {
    source: S,
    sink: K,
    policy: Arc<RobotsPolicy>,
    settings: CrawlSettings,
}

impl<S: PageSource, K: CatalogSink> Crawler<S, K> {
    pub fn new(source: S, sink: K, policy: Arc<RobotsPolicy>, settings: CrawlSettings) -> Self {
        Self { source, sink, policy, settings }
    }

    /// Breadth-first crawl from the start URL. Individual page failures are
    /// logged and counted; nothing here aborts the run.
    pub async fn run(&self) -> CrawlReport {
        let mut frontier = Frontier::default();
        let mut report = CrawlReport::default();
        frontier.push(self.settings.start_url.clone());

        while !self.budget_spent(report.processed) {
            let Some(url) = frontier.pop() else {
                break;
            };
            report.visited.push(url.clone());

            let kind = classify(&url);
            let mode =
                if kind == PageKind::Listing { FetchMode::Rendered } else { FetchMode::Static };
            info!(
                url = %url,
                kind = ?kind,
                processed = report.processed,
                queued = frontier.len(),
                "crawling"
            );

            let html = match self.source.fetch(&url, mode).await {
                Ok(html) => html,
                Err(err) => {
                    warn!(url = %url, error = %err, "fetch failed, skipping");
                    report.fetch_failures += 1;
                    continue;
                },
            };

            match extract_page(&url, kind, &html) {
                Ok(page) => {
                    for link in self.persist(&url, page, &mut report).await {
                        self.enqueue(&mut frontier, link);
                    }
                },
                Err(err) => {
                    warn!(url = %url, error = %err, "extraction failed, skipping");
                    report.extract_failures += 1;
                },
            }

            report.processed += 1;

            if !self.budget_spent(report.processed) && !frontier.is_empty() {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        report.remaining = frontier.len();
        info!(
            processed = report.processed,
            fetch_failures = report.fetch_failures,
            extract_failures = report.extract_failures,
            movies_saved = report.movies_saved,
            people_saved = report.people_saved,
            store_failures = report.store_failures,
            remaining = report.remaining,
            "crawl finished"
        );
        report
    }

    fn budget_spent(&self, processed: usize) -> bool {
        self.settings.max_pages.is_some_and(|max| processed >= max)
    }

    /// Stores whatever the page yielded and returns the URLs it points at.
    /// Links are followed even when storing fails.
    async fn persist(&self, url: &str, page: Page, report: &mut CrawlReport) -> Vec<String> {
        let base = &self.settings.base_url;
        match page {
            Page::Listing(entries) => {
                info!(url = %url, entries = entries.len(), "listing parsed");
                entries
                    .iter()
                    .map(|e| {
                        debug!(imdb_id = %e.imdb_id, title = ?e.title, "listed");
                        movie_url(base, &e.imdb_id)
                    })
                    .collect()
            },
            Page::Movie(movie) => {
                match self.sink.save_movie(&movie).await {
                    Ok(id) => {
                        debug!(imdb_id = %movie.imdb_id, id, "movie saved");
                        report.movies_saved += 1;
                    },
                    Err(err) => {
                        warn!(imdb_id = %movie.imdb_id, error = %err, "failed to save movie");
                        report.store_failures += 1;
                    },
                }
                movie.credits.iter().map(|c| person_url(base, &c.person_id)).collect()
            },
            Page::Person(person) => {
                match self.sink.save_person(&person).await {
                    Ok(id) => {
                        debug!(imdb_id = %person.imdb_id, id, "person saved");
                        report.people_saved += 1;
                    },
                    Err(err) => {
                        warn!(imdb_id = %person.imdb_id, error = %err, "failed to save person");
                        report.store_failures += 1;
                    },
                }
                person.filmography.iter().map(|id| movie_url(base, id)).collect()
            },
            Page::Unknown => {
                debug!(url = %url, "no extractor for page");
                Vec::new()
            },
        }
    }

    fn enqueue(&self, frontier: &mut Frontier, url: String) {
        if !self.policy.allowed(&url) {
            debug!(url = %url, "disallowed by robots policy, not queued");
            return;
        }
        if frontier.push(url.clone()) {
            debug!(url = %url, "queued");
        }
    }
}

fn extract_page(url: &str, kind: PageKind, html: &str) -> Result<Page, ExtractError> {
    Ok(match kind {
        PageKind::Listing => Page::Listing(extract_listing(html)?),
        PageKind::MovieDetail => Page::Movie(extract_movie(html, url)?),
        PageKind::PersonDetail => Page::Person(extract_person(html, url)?),
        PageKind::Unknown => Page::Unknown,
    })
}
