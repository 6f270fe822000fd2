use std::collections::HashMap;

use jiff::civil::Date;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
    sea_query::{Expr, LikeExpr, Query, SelectStatement},
};

use crate::{
    entities::{
        filmography, genre, keyword, movie, movie_genre, movie_keyword, movie_person, person, role,
    },
    models::{
        MovieCredit, MovieDetails, MovieFilter, MovieSummary, PersonCredit, PersonDetails, Role,
    },
};

pub const DEFAULT_LIMIT: u64 = 250;
pub const MAX_LIMIT: u64 = 1000;
pub const RECOMMENDATION_COUNT: u64 = 20;

pub async fn list_movies(
    db: &DatabaseConnection,
    filter: &MovieFilter,
) -> Result<Vec<MovieSummary>, DbErr> {
    let mut query = movie::Entity::find();

    if let Some(search) = non_blank(&filter.search) {
        query = query.filter(
            Condition::any()
                .add(Expr::col(movie::Column::Title).like(like_pattern(search)))
                .add(Expr::col(movie::Column::PlotSummary).like(like_pattern(search))),
        );
    }
    if let Some(name) = non_blank(&filter.genre) {
        query = query.filter(movie::Column::Id.in_subquery(movies_with_genre(name)));
    }
    if let Some(fragment) = non_blank(&filter.keyword) {
        query = query.filter(movie::Column::Id.in_subquery(movies_with_keyword(fragment)));
    }
    if let Some(fragment) = non_blank(&filter.actor) {
        query = query.filter(movie::Column::Id.in_subquery(movies_with_actor(fragment)));
    }

    let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = filter.offset.unwrap_or(0);

    let rows = query
        .order_by_desc(movie::Column::Rating)
        .order_by_desc(movie::Column::Year)
        .order_by_asc(movie::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(summary).collect())
}

/// Top-rated movies of one genre.
pub async fn recommend(db: &DatabaseConnection, genre: &str) -> Result<Vec<MovieSummary>, DbErr> {
    let filter = MovieFilter {
        genre: Some(genre.to_string()),
        limit: Some(RECOMMENDATION_COUNT),
        ..Default::default()
    };
    list_movies(db, &filter).await
}

pub async fn list_genres(db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
    let rows = genre::Entity::find().order_by_asc(genre::Column::Name).all(db).await?;
    Ok(rows.into_iter().map(|g| g.name).collect())
}

pub async fn get_movie(
    db: &DatabaseConnection,
    imdb_id: &str,
) -> Result<Option<MovieDetails>, DbErr> {
    let Some(row) =
        movie::Entity::find().filter(movie::Column::ImdbId.eq(imdb_id)).one(db).await?
    else {
        return Ok(None);
    };

    let genres = genre::Entity::find()
        .filter(
            genre::Column::Id.in_subquery(
                Query::select()
                    .column(movie_genre::Column::GenreId)
                    .from(movie_genre::Entity)
                    .and_where(Expr::col(movie_genre::Column::MovieId).eq(row.id))
                    .to_owned(),
            ),
        )
        .order_by_asc(genre::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|g| g.name)
        .collect();

    let keywords = keyword::Entity::find()
        .filter(
            keyword::Column::Id.in_subquery(
                Query::select()
                    .column(movie_keyword::Column::KeywordId)
                    .from(movie_keyword::Entity)
                    .and_where(Expr::col(movie_keyword::Column::MovieId).eq(row.id))
                    .to_owned(),
            ),
        )
        .order_by_asc(keyword::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|k| k.name)
        .collect();

    let credits = movie_person::Entity::find()
        .filter(movie_person::Column::MovieId.eq(row.id))
        .order_by_asc(movie_person::Column::RoleId)
        .order_by_asc(movie_person::Column::PersonId)
        .all(db)
        .await?;

    let person_ids: Vec<i32> = credits.iter().map(|c| c.person_id).collect();
    let people: HashMap<i32, person::Model> = person::Entity::find()
        .filter(person::Column::Id.is_in(person_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let roles = role_names(db).await?;

    let people = credits
        .iter()
        .filter_map(|c| {
            let p = people.get(&c.person_id)?;
            Some(MovieCredit {
                name: p.name.clone(),
                imdb_id: p.imdb_id.clone(),
                role: roles.get(&c.role_id).cloned().unwrap_or_default(),
            })
        })
        .collect();

    Ok(Some(MovieDetails {
        imdb_id: row.imdb_id,
        title: row.title,
        year: row.year,
        runtime_minutes: row.runtime_minutes,
        rating: row.rating,
        content_rating: row.content_rating,
        plot_summary: row.plot_summary,
        poster_url: row.poster_url,
        release_date: parse_stored_date(row.release_date.as_deref()),
        genres,
        people,
        keywords,
    }))
}

/// When several names share one identifier, the most recently written
/// row is returned.
pub async fn get_person(
    db: &DatabaseConnection,
    imdb_id: &str,
) -> Result<Option<PersonDetails>, DbErr> {
    let Some(row) = person::Entity::find()
        .filter(person::Column::ImdbId.eq(imdb_id))
        .order_by_desc(person::Column::UpdatedAt)
        .order_by_desc(person::Column::Id)
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let credit_rows = movie_person::Entity::find()
        .filter(movie_person::Column::PersonId.eq(row.id))
        .order_by_asc(movie_person::Column::MovieId)
        .order_by_asc(movie_person::Column::RoleId)
        .all(db)
        .await?;

    let movie_ids: Vec<i32> = credit_rows.iter().map(|c| c.movie_id).collect();
    let movies: HashMap<i32, movie::Model> = movie::Entity::find()
        .filter(movie::Column::Id.is_in(movie_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();
    let roles = role_names(db).await?;

    let credits = credit_rows
        .iter()
        .filter_map(|c| {
            let m = movies.get(&c.movie_id)?;
            Some(PersonCredit {
                imdb_id: m.imdb_id.clone(),
                title: m.title.clone(),
                role: roles.get(&c.role_id).cloned().unwrap_or_default(),
            })
        })
        .collect();

    let filmography = filmography::Entity::find()
        .filter(filmography::Column::PersonId.eq(row.id))
        .order_by_asc(filmography::Column::MovieImdbId)
        .all(db)
        .await?
        .into_iter()
        .map(|f| f.movie_imdb_id)
        .collect();

    Ok(Some(PersonDetails {
        imdb_id: row.imdb_id,
        name: row.name,
        birth_date: parse_stored_date(row.birth_date.as_deref()),
        bio: row.bio,
        credits,
        filmography,
    }))
}

fn movies_with_genre(name: &str) -> SelectStatement {
    Query::select()
        .column((movie_genre::Entity, movie_genre::Column::MovieId))
        .from(movie_genre::Entity)
        .inner_join(
            genre::Entity,
            Expr::col((genre::Entity, genre::Column::Id))
                .equals((movie_genre::Entity, movie_genre::Column::GenreId)),
        )
        .and_where(Expr::col((genre::Entity, genre::Column::Name)).eq(name))
        .to_owned()
}

fn movies_with_keyword(fragment: &str) -> SelectStatement {
    Query::select()
        .column((movie_keyword::Entity, movie_keyword::Column::MovieId))
        .from(movie_keyword::Entity)
        .inner_join(
            keyword::Entity,
            Expr::col((keyword::Entity, keyword::Column::Id))
                .equals((movie_keyword::Entity, movie_keyword::Column::KeywordId)),
        )
        .and_where(Expr::col((keyword::Entity, keyword::Column::Name)).like(like_pattern(fragment)))
        .to_owned()
}

fn movies_with_actor(fragment: &str) -> SelectStatement {
    Query::select()
        .column((movie_person::Entity, movie_person::Column::MovieId))
        .from(movie_person::Entity)
        .inner_join(
            person::Entity,
            Expr::col((person::Entity, person::Column::Id))
                .equals((movie_person::Entity, movie_person::Column::PersonId)),
        )
        .inner_join(
            role::Entity,
            Expr::col((role::Entity, role::Column::Id))
                .equals((movie_person::Entity, movie_person::Column::RoleId)),
        )
        .and_where(Expr::col((role::Entity, role::Column::Name)).eq(Role::Actor.as_str()))
        .and_where(Expr::col((person::Entity, person::Column::Name)).like(like_pattern(fragment)))
        .to_owned()
}

async fn role_names(db: &DatabaseConnection) -> Result<HashMap<i32, String>, DbErr> {
    Ok(role::Entity::find().all(db).await?.into_iter().map(|r| (r.id, r.name)).collect())
}

fn summary(row: movie::Model) -> MovieSummary {
    MovieSummary {
        imdb_id: row.imdb_id,
        title: row.title,
        year: row.year,
        rating: row.rating,
        poster_url: row.poster_url,
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Substring match with `%`, `_` and `\` in `fragment` taken literally.
fn like_pattern(fragment: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

fn parse_stored_date(value: Option<&str>) -> Option<Date> {
    value.and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;
    use crate::{
        db::test_db,
        extract::extract_movie,
        models::{Credit, DatePrecision, Movie, PartialDate, Person},
        store::Store,
    };

    const SHAWSHANK: &str =
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/title_tt0111161.html"));

    fn film(imdb_id: &str, title: &str, year: i32, rating: f64, genres: &[&str]) -> Movie {
        Movie {
            imdb_id: imdb_id.into(),
            title: Some(title.into()),
            year: Some(year),
            rating: Some(rating),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    async fn seeded() -> (tempfile::TempDir, DatabaseConnection) {
        let (dir, db) = test_db().await;
        let store = Store::new(db.clone());

        let mut shawshank = film("tt0111161", "The Shawshank Redemption", 1994, 9.3, &["Drama"]);
        shawshank.plot_summary = Some("Two imprisoned men bond over a number of years.".into());
        shawshank.keywords = vec!["imprisoned".into(), "bond".into()];
        shawshank.release_date =
            Some(PartialDate { date: date(1994, 10, 14), precision: DatePrecision::Day });
        shawshank.credits = vec![
            Credit {
                person_id: "nm0000209".into(),
                name: "Tim Robbins".into(),
                role: Role::Actor,
            },
            Credit {
                person_id: "nm0001104".into(),
                name: "Frank Darabont".into(),
                role: Role::Director,
            },
        ];
        store.upsert_movie(&shawshank).await.unwrap();

        let mut godfather = film("tt0068646", "The Godfather", 1972, 9.2, &["Crime", "Drama"]);
        godfather.keywords = vec!["family".into()];
        store.upsert_movie(&godfather).await.unwrap();

        store
            .upsert_movie(&film("tt0468569", "The Dark Knight", 2008, 9.0, &["Action"]))
            .await
            .unwrap();
        store
            .upsert_movie(&film("tt0050083", "12 Angry Men", 1957, 9.0, &["Crime", "Drama"]))
            .await
            .unwrap();

        store
            .upsert_person(&Person {
                imdb_id: "nm0001104".into(),
                name: Some("Frank Darabont".into()),
                birth_date: Some(PartialDate {
                    date: date(1959, 1, 1),
                    precision: DatePrecision::Month,
                }),
                bio: Some("Director and writer.".into()),
                filmography: ["tt0120689".to_string(), "tt0111161".to_string()].into(),
            })
            .await
            .unwrap();

        (dir, db)
    }

    fn ids(movies: &[MovieSummary]) -> Vec<&str> {
        movies.iter().map(|m| m.imdb_id.as_str()).collect()
    }

    #[tokio::test]
    async fn ordered_by_rating_then_year() {
        let (_dir, db) = seeded().await;
        let movies = list_movies(&db, &MovieFilter::default()).await.unwrap();
        assert_eq!(ids(&movies), ["tt0111161", "tt0068646", "tt0468569", "tt0050083"]);
    }

    #[tokio::test]
    async fn filters_narrow_the_listing() {
        let (_dir, db) = seeded().await;

        let by_genre = MovieFilter { genre: Some("Crime".into()), ..Default::default() };
        assert_eq!(ids(&list_movies(&db, &by_genre).await.unwrap()), ["tt0068646", "tt0050083"]);

        let by_search = MovieFilter { search: Some("imprisoned".into()), ..Default::default() };
        assert_eq!(ids(&list_movies(&db, &by_search).await.unwrap()), ["tt0111161"]);

        let by_keyword = MovieFilter { keyword: Some("fam".into()), ..Default::default() };
        assert_eq!(ids(&list_movies(&db, &by_keyword).await.unwrap()), ["tt0068646"]);

        let by_actor = MovieFilter { actor: Some("robbins".into()), ..Default::default() };
        assert_eq!(ids(&list_movies(&db, &by_actor).await.unwrap()), ["tt0111161"]);

        let directors_are_not_actors =
            MovieFilter { actor: Some("Darabont".into()), ..Default::default() };
        assert!(list_movies(&db, &directors_are_not_actors).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn wildcards_in_filters_match_literally() {
        let (_dir, db) = seeded().await;

        for fragment in ["_", "%", "\\"] {
            let by_keyword = MovieFilter { keyword: Some(fragment.into()), ..Default::default() };
            assert!(list_movies(&db, &by_keyword).await.unwrap().is_empty(), "{fragment}");
            let by_search = MovieFilter { search: Some(fragment.into()), ..Default::default() };
            assert!(list_movies(&db, &by_search).await.unwrap().is_empty(), "{fragment}");
        }

        let store = Store::new(db.clone());
        store.upsert_movie(&film("tt0000100", "100% Wolf", 2020, 5.0, &[])).await.unwrap();
        let percent = MovieFilter { search: Some("100%".into()), ..Default::default() };
        assert_eq!(ids(&list_movies(&db, &percent).await.unwrap()), ["tt0000100"]);
    }

    #[tokio::test]
    async fn extracted_movie_survives_a_store_round_trip() {
        let (_dir, db) = test_db().await;
        let extracted = extract_movie(SHAWSHANK, "https://www.imdb.com/title/tt0111161/").unwrap();
        Store::new(db.clone()).upsert_movie(&extracted).await.unwrap();

        let stored = get_movie(&db, "tt0111161").await.unwrap().unwrap();
        assert_eq!(Some(stored.title.clone()), extracted.title);
        assert_eq!(stored.year, extracted.year);
        assert_eq!(stored.runtime_minutes, extracted.runtime_minutes);
        assert_eq!(stored.rating, extracted.rating);
        assert_eq!(stored.content_rating, extracted.content_rating);
        assert_eq!(stored.plot_summary, extracted.plot_summary);
        assert_eq!(stored.poster_url, extracted.poster_url);
        assert_eq!(stored.release_date, extracted.release_date.map(|d| d.date));

        assert!(extracted.genres.iter().all(|g| stored.genres.contains(g)));
        assert!(extracted.keywords.iter().all(|k| stored.keywords.contains(k)));
        assert!(!extracted.credits.is_empty());
        for credit in &extracted.credits {
            assert!(
                stored
                    .people
                    .iter()
                    .any(|p| p.imdb_id == credit.person_id && p.role == credit.role.as_str()),
                "missing {credit:?}"
            );
        }
    }

    #[tokio::test]
    async fn pagination_is_clamped() {
        let (_dir, db) = seeded().await;

        let page = MovieFilter { limit: Some(2), offset: Some(1), ..Default::default() };
        assert_eq!(ids(&list_movies(&db, &page).await.unwrap()), ["tt0068646", "tt0468569"]);

        let zero = MovieFilter { limit: Some(0), ..Default::default() };
        assert_eq!(list_movies(&db, &zero).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn movie_details_are_denormalized() {
        let (_dir, db) = seeded().await;
        let movie = get_movie(&db, "tt0111161").await.unwrap().unwrap();

        assert_eq!(movie.title, "The Shawshank Redemption");
        assert_eq!(movie.release_date, Some(date(1994, 10, 14)));
        assert_eq!(movie.genres, ["Drama"]);
        assert_eq!(movie.keywords, ["bond", "imprisoned"]);
        let people: Vec<(&str, &str)> =
            movie.people.iter().map(|p| (p.name.as_str(), p.role.as_str())).collect();
        assert_eq!(people, [("Tim Robbins", "Actor"), ("Frank Darabont", "Director")]);

        assert!(get_movie(&db, "tt9999999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn genres_and_recommendations() {
        let (_dir, db) = seeded().await;
        assert_eq!(list_genres(&db).await.unwrap(), ["Action", "Crime", "Drama"]);
        assert_eq!(
            ids(&recommend(&db, "Drama").await.unwrap()),
            ["tt0111161", "tt0068646", "tt0050083"]
        );
        assert!(recommend(&db, "Western").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn person_details_include_credits_and_filmography() {
        let (_dir, db) = seeded().await;
        let person = get_person(&db, "nm0001104").await.unwrap().unwrap();

        assert_eq!(person.name, "Frank Darabont");
        assert_eq!(person.birth_date, Some(date(1959, 1, 1)));
        assert_eq!(person.credits.len(), 1);
        assert_eq!(person.credits[0].imdb_id, "tt0111161");
        assert_eq!(person.credits[0].role, "Director");
        assert_eq!(person.filmography, ["tt0111161", "tt0120689"]);

        assert!(get_person(&db, "nm9999999").await.unwrap().is_none());
    }
}
