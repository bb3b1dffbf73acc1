//! Database connection and migration management.
//!
//! Grounded on `rusk-core`'s `lib.rs` doc example (`db::establish_connection`,
//! `SqlitePool`), whose own `db.rs` source was not available in the retrieved
//! corpus; the connection/migration shape here follows the sqlx conventions
//! the rest of the teacher's stack (transactions, `FromRow`) already assumes.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::CoreError;

pub type DbPool = SqlitePool;

/// Opens (creating if absent) the SQLite database at `path` and runs pending
/// migrations. `path` may be `:memory:` for tests.
pub async fn establish_connection(path: &str) -> Result<DbPool, CoreError> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), CoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
