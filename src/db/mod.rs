use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error, SqlitePool,
};
use thiserror::Error;

pub mod models;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to parse database URL: {0}")]
    UrlParse(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] Error),
    #[error("Failed to create schema: {0}")]
    Schema(String),
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        first_name TEXT,
        last_name TEXT,
        city TEXT,
        state TEXT,
        country TEXT,
        zip TEXT
    )",
    "CREATE TABLE IF NOT EXISTS medicines (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        price REAL NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity >= 0),
        manufacturer TEXT,
        medicine_type TEXT,
        pack_size TEXT,
        composition_primary TEXT,
        composition_secondary TEXT,
        discontinued INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_medicines_name ON medicines (name)",
    "CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id),
        medicine_id INTEGER NOT NULL REFERENCES medicines (id),
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        status TEXT NOT NULL,
        checkout_id TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders (user_id)",
];

/// Opens (creating if needed) the SQLite database at `database_url` and
/// makes sure every table exists.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DatabaseError::UrlParse(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options)
        .await
        .map_err(DatabaseError::Sqlx)?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database. Every connection to `:memory:` is its
/// own database, so the pool must never open a second one or recycle the first.
pub async fn init_memory_db() -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| DatabaseError::UrlParse(e.to_string()))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(DatabaseError::Sqlx)?;

    ensure_schema(&pool).await?;
    Ok(pool)
}

async fn ensure_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::Schema(e.to_string()))?;
    }

    log::debug!("Database schema is up to date");
    Ok(())
}
