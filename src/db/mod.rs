pub mod repository;

use std::str::FromStr;

use sqlx::{Sqlite, SqlitePool, Transaction};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::config::Config;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens the pool, creating the database file if needed, and applies
/// pending migrations.
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    info!("database ready at {}", config.database_url);

    Ok(pool)
}

/// Starts a transaction that holds the write lock from its first statement.
///
/// A deferred transaction that reads before writing fails with `SQLITE_BUSY`
/// when another connection commits in between; `BEGIN IMMEDIATE` waits on the
/// busy timeout instead.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}
