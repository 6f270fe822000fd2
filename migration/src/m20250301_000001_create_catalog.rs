use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

const SEED_ROLES: [&str; 4] = ["Actor", "Director", "Writer", "Producer"];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movie::Table)
                    .if_not_exists()
                    .col(pk_auto(Movie::Id))
                    .col(string_uniq(Movie::ImdbId))
                    .col(string(Movie::Title))
                    .col(integer_null(Movie::Year))
                    .col(integer_null(Movie::RuntimeMinutes))
                    .col(double_null(Movie::Rating))
                    .col(string_null(Movie::ContentRating))
                    .col(text_null(Movie::PlotSummary))
                    .col(string_null(Movie::PosterUrl))
                    .col(string_null(Movie::ReleaseDate))
                    .col(big_integer(Movie::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_rating_year")
                    .table(Movie::Table)
                    .col(Movie::Rating)
                    .col(Movie::Year)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .if_not_exists()
                    .col(pk_auto(Genre::Id))
                    .col(string_uniq(Genre::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenre::Table)
                    .if_not_exists()
                    .col(integer(MovieGenre::MovieId))
                    .col(integer(MovieGenre::GenreId))
                    .primary_key(Index::create().col(MovieGenre::MovieId).col(MovieGenre::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_movie")
                            .from(MovieGenre::Table, MovieGenre::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genre_genre")
                            .from(MovieGenre::Table, MovieGenre::GenreId)
                            .to(Genre::Table, Genre::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Keyword::Table)
                    .if_not_exists()
                    .col(pk_auto(Keyword::Id))
                    .col(string_uniq(Keyword::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieKeyword::Table)
                    .if_not_exists()
                    .col(integer(MovieKeyword::MovieId))
                    .col(integer(MovieKeyword::KeywordId))
                    .primary_key(
                        Index::create().col(MovieKeyword::MovieId).col(MovieKeyword::KeywordId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_keyword_movie")
                            .from(MovieKeyword::Table, MovieKeyword::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_keyword_keyword")
                            .from(MovieKeyword::Table, MovieKeyword::KeywordId)
                            .to(Keyword::Table, Keyword::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Person::Table)
                    .if_not_exists()
                    .col(pk_auto(Person::Id))
                    .col(string(Person::ImdbId))
                    .col(string(Person::Name))
                    .col(string_null(Person::BirthDate))
                    .col(text_null(Person::Bio))
                    .col(big_integer(Person::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_person_natural_key")
                    .table(Person::Table)
                    .col(Person::ImdbId)
                    .col(Person::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Role::Table)
                    .if_not_exists()
                    .col(pk_auto(Role::Id))
                    .col(string_uniq(Role::Name))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MoviePerson::Table)
                    .if_not_exists()
                    .col(integer(MoviePerson::MovieId))
                    .col(integer(MoviePerson::PersonId))
                    .col(integer(MoviePerson::RoleId))
                    .primary_key(
                        Index::create()
                            .col(MoviePerson::MovieId)
                            .col(MoviePerson::PersonId)
                            .col(MoviePerson::RoleId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_person_movie")
                            .from(MoviePerson::Table, MoviePerson::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_person_person")
                            .from(MoviePerson::Table, MoviePerson::PersonId)
                            .to(Person::Table, Person::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_person_role")
                            .from(MoviePerson::Table, MoviePerson::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        let mut seed = Query::insert();
        seed.into_table(Role::Table).columns([Role::Name]);
        for name in SEED_ROLES {
            seed.values_panic([name.into()]);
        }
        seed.on_conflict(OnConflict::column(Role::Name).do_nothing().to_owned());
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MoviePerson::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Role::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Person::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieKeyword::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Keyword::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieGenre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genre::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movie::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movie {
    Table,
    Id,
    ImdbId,
    Title,
    Year,
    RuntimeMinutes,
    Rating,
    ContentRating,
    PlotSummary,
    PosterUrl,
    ReleaseDate,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Genre {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum MovieGenre {
    Table,
    MovieId,
    GenreId,
}

#[derive(DeriveIden)]
enum Keyword {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum MovieKeyword {
    Table,
    MovieId,
    KeywordId,
}

#[derive(DeriveIden)]
enum Person {
    Table,
    Id,
    ImdbId,
    Name,
    BirthDate,
    Bio,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Role {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum MoviePerson {
    Table,
    MovieId,
    PersonId,
    RoleId,
}
