use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    theme       TEXT    NOT NULL,
    pages       INTEGER NOT NULL,
    work_type   TEXT    NOT NULL,
    model       TEXT    NOT NULL,
    status      TEXT    NOT NULL DEFAULT 'created',
    full_tex    TEXT,
    created_at  TEXT    NOT NULL
)
"#;

/// Creates the SQLite connection pool and applies the schema.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to SQLite...");

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// Applies the schema; idempotent.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}
