//! SQLite pool and schema.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS boss (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        company_name TEXT NOT NULL,
        firstname TEXT NOT NULL,
        lastname TEXT NOT NULL,
        created_at TEXT NOT NULL,
        reset_token TEXT,
        reset_token_expiry TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS staff (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        boss_id INTEGER NOT NULL REFERENCES boss(id) ON DELETE CASCADE,
        firstname TEXT NOT NULL,
        lastname TEXT NOT NULL,
        national_insurance_number TEXT UNIQUE NOT NULL,
        home_address TEXT NOT NULL,
        telephone_number TEXT NOT NULL,
        employment_status TEXT NOT NULL,
        immigration_status TEXT NOT NULL,
        visa_type TEXT NOT NULL,
        visa_sharecode TEXT NOT NULL,
        sex TEXT NOT NULL,
        date_of_birth TEXT NOT NULL,
        proof_of_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_staff_boss ON staff(boss_id, firstname, lastname)",
];

/// How long a writer waits on another connection's lock before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Statement opening every read-then-write transaction. Taking the write
/// lock up front means a competing writer waits out [`BUSY_TIMEOUT`]
/// instead of failing when a deferred read lock cannot be upgraded.
pub const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Opens (creating if needed) the database at `url` and applies the schema.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    info!("[DB] Connected to {}", url);
    Ok(pool)
}

/// Private in-memory database. One connection, since every SQLite
/// in-memory connection is its own database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
