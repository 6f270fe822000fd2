use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait, sea_query::OnConflict,
};
use tracing::debug;

use crate::{
    entities::{
        filmography, genre, keyword, movie, movie_genre, movie_keyword, movie_person, person, role,
    },
    error::StoreError,
    models::{Movie, Person},
};

/// Where extracted records end up.
#[allow(async_fn_in_trait)]
pub trait CatalogSink {
    async fn save_movie(&self, movie: &Movie) -> Result<i32, StoreError>;
    async fn save_person(&self, person: &Person) -> Result<i32, StoreError>;
}

impl<T: CatalogSink + ?Sized> CatalogSink for &T {
    async fn save_movie(&self, movie: &Movie) -> Result<i32, StoreError> {
        (**self).save_movie(movie).await
    }

    async fn save_person(&self, person: &Person) -> Result<i32, StoreError> {
        (**self).save_person(person).await
    }
}

/// Insert-or-update by natural key. Each record and its associations are
/// written in one transaction; associations are only ever added.
#[derive(Clone)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn upsert_movie(&self, record: &Movie) -> Result<i32, StoreError> {
        let title = record.title.clone().ok_or(StoreError::MissingField("title"))?;
        let txn = self.db.begin().await?;

        let model = movie::ActiveModel {
            id: Default::default(),
            imdb_id: Set(record.imdb_id.clone()),
            title: Set(title),
            year: Set(record.year),
            runtime_minutes: Set(record.runtime_minutes),
            rating: Set(record.rating),
            content_rating: Set(record.content_rating.clone()),
            plot_summary: Set(record.plot_summary.clone()),
            poster_url: Set(record.poster_url.clone()),
            release_date: Set(record.release_date.map(|d| d.date.to_string())),
            updated_at: Set(now_sec()),
        };

        movie::Entity::insert(model)
            .on_conflict(
                OnConflict::column(movie::Column::ImdbId)
                    .update_columns([
                        movie::Column::Title,
                        movie::Column::Year,
                        movie::Column::RuntimeMinutes,
                        movie::Column::Rating,
                        movie::Column::ContentRating,
                        movie::Column::PlotSummary,
                        movie::Column::PosterUrl,
                        movie::Column::ReleaseDate,
                        movie::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let movie_id = movie::Entity::find()
            .filter(movie::Column::ImdbId.eq(record.imdb_id.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(record.imdb_id.clone()))?
            .id;

        for name in &record.genres {
            let genre_id = genre_id(&txn, name).await?;
            movie_genre::Entity::insert(movie_genre::ActiveModel {
                movie_id: Set(movie_id),
                genre_id: Set(genre_id),
            })
            .on_conflict(
                OnConflict::columns([movie_genre::Column::MovieId, movie_genre::Column::GenreId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        for name in &record.keywords {
            let keyword_id = keyword_id(&txn, name).await?;
            movie_keyword::Entity::insert(movie_keyword::ActiveModel {
                movie_id: Set(movie_id),
                keyword_id: Set(keyword_id),
            })
            .on_conflict(
                OnConflict::columns([
                    movie_keyword::Column::MovieId,
                    movie_keyword::Column::KeywordId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        for credit in &record.credits {
            let person_id = credited_person_id(&txn, &credit.person_id, &credit.name).await?;
            let role_id = role_id(&txn, credit.role.as_str()).await?;
            movie_person::Entity::insert(movie_person::ActiveModel {
                movie_id: Set(movie_id),
                person_id: Set(person_id),
                role_id: Set(role_id),
            })
            .on_conflict(
                OnConflict::columns([
                    movie_person::Column::MovieId,
                    movie_person::Column::PersonId,
                    movie_person::Column::RoleId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        txn.commit().await?;
        debug!(imdb_id = %record.imdb_id, movie_id, "stored movie");
        Ok(movie_id)
    }

    pub async fn upsert_person(&self, record: &Person) -> Result<i32, StoreError> {
        let name = record.name.clone().ok_or(StoreError::MissingField("name"))?;
        let txn = self.db.begin().await?;

        let model = person::ActiveModel {
            id: Default::default(),
            imdb_id: Set(record.imdb_id.clone()),
            name: Set(name.clone()),
            birth_date: Set(record.birth_date.map(|d| d.date.to_string())),
            bio: Set(record.bio.clone()),
            updated_at: Set(now_sec()),
        };

        person::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([person::Column::ImdbId, person::Column::Name])
                    .update_columns([
                        person::Column::BirthDate,
                        person::Column::Bio,
                        person::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let person_id = find_person_id(&txn, &record.imdb_id, &name)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(record.imdb_id.clone()))?;

        for movie_imdb_id in &record.filmography {
            filmography::Entity::insert(filmography::ActiveModel {
                person_id: Set(person_id),
                movie_imdb_id: Set(movie_imdb_id.clone()),
            })
            .on_conflict(
                OnConflict::columns([
                    filmography::Column::PersonId,
                    filmography::Column::MovieImdbId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        txn.commit().await?;
        debug!(imdb_id = %record.imdb_id, person_id, "stored person");
        Ok(person_id)
    }
}

impl CatalogSink for Store {
    async fn save_movie(&self, movie: &Movie) -> Result<i32, StoreError> {
        self.upsert_movie(movie).await
    }

    async fn save_person(&self, person: &Person) -> Result<i32, StoreError> {
        self.upsert_person(person).await
    }
}

async fn genre_id<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, DbErr> {
    genre::Entity::insert(genre::ActiveModel { id: Default::default(), name: Set(name.to_string()) })
        .on_conflict(OnConflict::column(genre::Column::Name).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;
    genre::Entity::find()
        .filter(genre::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|g| g.id)
        .ok_or_else(|| DbErr::RecordNotFound(format!("genre {name}")))
}

async fn keyword_id<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, DbErr> {
    keyword::Entity::insert(keyword::ActiveModel {
        id: Default::default(),
        name: Set(name.to_string()),
    })
    .on_conflict(OnConflict::column(keyword::Column::Name).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;
    keyword::Entity::find()
        .filter(keyword::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|k| k.id)
        .ok_or_else(|| DbErr::RecordNotFound(format!("keyword {name}")))
}

/// Roles outside the seeded set are added the first time they are seen.
async fn role_id<C: ConnectionTrait>(conn: &C, name: &str) -> Result<i32, DbErr> {
    role::Entity::insert(role::ActiveModel { id: Default::default(), name: Set(name.to_string()) })
        .on_conflict(OnConflict::column(role::Column::Name).do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;
    role::Entity::find()
        .filter(role::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|r| r.id)
        .ok_or_else(|| DbErr::RecordNotFound(format!("role {name}")))
}

/// A person seen only as a credit. An existing row keeps its birth date
/// and biography.
async fn credited_person_id<C: ConnectionTrait>(
    conn: &C,
    imdb_id: &str,
    name: &str,
) -> Result<i32, DbErr> {
    person::Entity::insert(person::ActiveModel {
        id: Default::default(),
        imdb_id: Set(imdb_id.to_string()),
        name: Set(name.to_string()),
        birth_date: Set(None),
        bio: Set(None),
        updated_at: Set(now_sec()),
    })
    .on_conflict(
        OnConflict::columns([person::Column::ImdbId, person::Column::Name])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    find_person_id(conn, imdb_id, name)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("person {imdb_id}")))
}

async fn find_person_id<C: ConnectionTrait>(
    conn: &C,
    imdb_id: &str,
    name: &str,
) -> Result<Option<i32>, DbErr> {
    Ok(person::Entity::find()
        .filter(person::Column::ImdbId.eq(imdb_id))
        .filter(person::Column::Name.eq(name))
        .one(conn)
        .await?
        .map(|p| p.id))
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::{
        db::test_db,
        models::{Credit, DatePrecision, PartialDate, Role},
    };

    fn shawshank() -> Movie {
        Movie {
            imdb_id: "tt0111161".into(),
            title: Some("The Shawshank Redemption".into()),
            year: Some(1994),
            runtime_minutes: Some(142),
            rating: Some(9.3),
            content_rating: Some("R".into()),
            plot_summary: Some("Two imprisoned men bond.".into()),
            poster_url: Some("https://m.media-amazon.com/images/shawshank.jpg".into()),
            release_date: Some(PartialDate {
                date: date(1994, 10, 14),
                precision: DatePrecision::Day,
            }),
            genres: vec!["Drama".into()],
            credits: vec![
                Credit {
                    person_id: "nm0001104".into(),
                    name: "Frank Darabont".into(),
                    role: Role::Director,
                },
                Credit {
                    person_id: "nm0001104".into(),
                    name: "Frank Darabont".into(),
                    role: Role::Writer,
                },
            ],
            keywords: vec!["imprisoned".into(), "bond".into()],
        }
    }

    #[tokio::test]
    async fn upserting_twice_updates_in_place_and_accumulates_tags() {
        let (_dir, db) = test_db().await;
        let store = Store::new(db.clone());

        let first = store.upsert_movie(&shawshank()).await.unwrap();

        let mut again = shawshank();
        again.rating = Some(9.2);
        again.plot_summary = None;
        again.genres = vec!["Crime".into()];
        again.keywords = vec!["prison".into()];
        let second = store.upsert_movie(&again).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 1);

        let row = movie::Entity::find_by_id(first).one(&db).await.unwrap().unwrap();
        assert_eq!(row.rating, Some(9.2));
        assert_eq!(row.plot_summary, None);
        assert_eq!(row.release_date.as_deref(), Some("1994-10-14"));

        let genres = movie_genre::Entity::find()
            .filter(movie_genre::Column::MovieId.eq(first))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(genres, 2);
        let keywords = movie_keyword::Entity::find()
            .filter(movie_keyword::Column::MovieId.eq(first))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(keywords, 3);
    }

    #[tokio::test]
    async fn one_person_can_hold_several_roles() {
        let (_dir, db) = test_db().await;
        let store = Store::new(db.clone());
        let movie_id = store.upsert_movie(&shawshank()).await.unwrap();

        assert_eq!(person::Entity::find().count(&db).await.unwrap(), 1);
        let credits = movie_person::Entity::find()
            .filter(movie_person::Column::MovieId.eq(movie_id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(credits, 2);
    }

    #[tokio::test]
    async fn unseen_roles_are_added_on_demand() {
        let (_dir, db) = test_db().await;
        let store = Store::new(db.clone());
        let mut record = shawshank();
        record.credits = vec![Credit {
            person_id: "nm0000001".into(),
            name: "Someone".into(),
            role: Role::Other("Composer".into()),
        }];
        store.upsert_movie(&record).await.unwrap();

        let composer =
            role::Entity::find().filter(role::Column::Name.eq("Composer")).one(&db).await.unwrap();
        assert!(composer.is_some());
        assert_eq!(role::Entity::find().count(&db).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn records_without_names_are_refused() {
        let (_dir, db) = test_db().await;
        let store = Store::new(db.clone());

        let untitled = Movie { imdb_id: "tt0000001".into(), ..Default::default() };
        let err = store.upsert_movie(&untitled).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingField("title")));

        let nameless = Person { imdb_id: "nm0000001".into(), ..Default::default() };
        let err = store.upsert_person(&nameless).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingField("name")));

        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn credit_rows_never_clobber_person_details() {
        let (_dir, db) = test_db().await;
        let store = Store::new(db.clone());

        let darabont = Person {
            imdb_id: "nm0001104".into(),
            name: Some("Frank Darabont".into()),
            birth_date: Some(PartialDate {
                date: date(1959, 1, 28),
                precision: DatePrecision::Day,
            }),
            bio: Some("Director and writer.".into()),
            filmography: ["tt0111161".to_string(), "tt0120689".to_string()].into(),
        };
        let person_id = store.upsert_person(&darabont).await.unwrap();
        store.upsert_movie(&shawshank()).await.unwrap();

        let row = person::Entity::find_by_id(person_id).one(&db).await.unwrap().unwrap();
        assert_eq!(row.birth_date.as_deref(), Some("1959-01-28"));
        assert_eq!(row.bio.as_deref(), Some("Director and writer."));
        assert_eq!(person::Entity::find().count(&db).await.unwrap(), 1);

        store.upsert_person(&darabont).await.unwrap();
        let films = filmography::Entity::find()
            .filter(filmography::Column::PersonId.eq(person_id))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(films, 2);
    }
}
