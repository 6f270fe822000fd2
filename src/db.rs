use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

const PRAGMAS: [&str; 3] =
    ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL", "PRAGMA cache_size=-64000"];

pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    for pragma in PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    Migrator::up(&db, None).await?;
    Ok(db)
}

#[cfg(test)]
pub(crate) async fn test_db() -> (tempfile::TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("catalog.db").display());
    let db = connect_and_migrate(&url).await.unwrap();
    (dir, db)
}

#[cfg(test)]
mod tests {
    use sea_orm::EntityTrait;

    use super::*;
    use crate::entities::role;

    #[tokio::test]
    async fn migrations_seed_the_well_known_roles() {
        let (_dir, db) = test_db().await;
        let mut names: Vec<String> =
            role::Entity::find().all(&db).await.unwrap().into_iter().map(|r| r.name).collect();
        names.sort();
        assert_eq!(names, ["Actor", "Director", "Producer", "Writer"]);
    }

    #[tokio::test]
    async fn migrating_twice_is_harmless() {
        let (dir, db) = test_db().await;
        drop(db);
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("catalog.db").display());
        let db = connect_and_migrate(&url).await.unwrap();
        assert_eq!(role::Entity::find().all(&db).await.unwrap().len(), 4);
    }
}
