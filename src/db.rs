use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::config::AppConfig;

/// Open the pool and create the `entries` table if it is missing.
pub async fn connect(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("parse DATABASE_URL {}", config.database_url))?
        .create_if_missing(true);

    let db = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(opts)
        .await
        .context("connect to database")?;

    migrate(&db).await?;
    Ok(db)
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub async fn memory() -> SqlitePool {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    migrate(&db).await.expect("migrations apply");
    db
}
