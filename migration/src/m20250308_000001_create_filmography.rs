use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Filmography::Table)
                    .if_not_exists()
                    .col(integer(Filmography::PersonId))
                    .col(string(Filmography::MovieImdbId))
                    .primary_key(
                        Index::create().col(Filmography::PersonId).col(Filmography::MovieImdbId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_filmography_person")
                            .from(Filmography::Table, Filmography::PersonId)
                            .to(Person::Table, Person::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_filmography_movie")
                    .table(Filmography::Table)
                    .col(Filmography::MovieImdbId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Filmography::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Filmography {
    Table,
    PersonId,
    MovieImdbId,
}

#[derive(DeriveIden)]
enum Person {
    Table,
    Id,
}
