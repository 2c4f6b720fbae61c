//! Database layer.
//!
//! One module per table, each holding the sea-orm entity and a
//! repository struct with the queries the routes and jobs need. The
//! schema is created from the entities at startup, so SQLite in dev and
//! Postgres in production work from the same definitions.

use sea_orm::{ConnectionTrait, Database, DbErr, Schema};
pub use sea_orm::DatabaseConnection;

pub mod coins;
pub mod promoted;
pub mod trending;
pub mod users;
pub mod votes;

pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    init(&db).await?;

    Ok(db)
}

pub async fn init(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = [
        schema.create_table_from_entity(coins::Entity),
        schema.create_table_from_entity(votes::Entity),
        schema.create_table_from_entity(promoted::Entity),
        schema.create_table_from_entity(trending::Entity),
        schema.create_table_from_entity(users::Entity),
    ];

    for stmt in &mut tables {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }

    // One vote per voter per coin per day, enforced by the database.
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_votes_voter_day \
         ON votes (coin_slug, voter, voted_on)",
    )
    .await?;

    db.execute_unprepared("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email)")
        .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_db() -> DatabaseConnection {
    connect("sqlite::memory:").await.unwrap()
}
