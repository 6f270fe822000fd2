use std::collections::BTreeSet;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// One entry of a ranked listing page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: Option<String>,
    pub imdb_id: String,
}

/// Credit role. Seeded with the four well-known roles; anything else the
/// site labels a credit with is carried by name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Role {
    Actor,
    Director,
    Writer,
    Producer,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Actor => "Actor",
            Role::Director => "Director",
            Role::Writer => "Writer",
            Role::Producer => "Producer",
            Role::Other(name) => name,
        }
    }

    /// Maps a principal-credit label ("Directors", "Writer", "Stars") to a
    /// role. Labels outside the director/writer/star families are ignored.
    pub fn from_credit_label(label: &str) -> Option<Self> {
        if label.contains("Director") {
            Some(Role::Director)
        } else if label.contains("Writer") {
            Some(Role::Writer)
        } else if label.contains("Star") {
            Some(Role::Actor)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credit {
    pub person_id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DatePrecision {
    Day,
    Month,
    Year,
}

/// A date known to day, month or year precision. Coarser dates are pinned
/// to the first day of the unknown period, so `date` is a lower bound.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PartialDate {
    pub date: Date,
    pub precision: DatePrecision,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Movie {
    pub imdb_id: String,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime_minutes: Option<i32>,
    pub rating: Option<f64>,
    pub content_rating: Option<String>,
    pub plot_summary: Option<String>,
    pub poster_url: Option<String>,
    pub release_date: Option<PartialDate>,
    pub genres: Vec<String>,
    pub credits: Vec<Credit>,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Person {
    pub imdb_id: String,
    pub name: Option<String>,
    pub birth_date: Option<PartialDate>,
    pub bio: Option<String>,
    pub filmography: BTreeSet<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovieFilter {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub keyword: Option<String>,
    pub actor: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieSummary {
    pub imdb_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub poster_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieCredit {
    pub name: String,
    pub imdb_id: String,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MovieDetails {
    pub imdb_id: String,
    pub title: String,
    pub year: Option<i32>,
    pub runtime_minutes: Option<i32>,
    pub rating: Option<f64>,
    pub content_rating: Option<String>,
    pub plot_summary: Option<String>,
    pub poster_url: Option<String>,
    pub release_date: Option<Date>,
    pub genres: Vec<String>,
    pub people: Vec<MovieCredit>,
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonCredit {
    pub imdb_id: String,
    pub title: String,
    pub role: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonDetails {
    pub imdb_id: String,
    pub name: String,
    pub birth_date: Option<Date>,
    pub bio: Option<String>,
    pub credits: Vec<PersonCredit>,
    pub filmography: Vec<String>,
}
