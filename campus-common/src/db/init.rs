//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas and
//! creates the schema. Table creation is idempotent, so this is safe to run
//! on every startup.

use crate::config::SpaceConfig;
use crate::{Error, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets dashboard reads proceed while a reconciliation pass writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Limited to one connection: every SQLite `:memory:` connection is a
/// separate database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_spaces_table(pool).await?;
    create_live_state_table(pool).await?;
    create_history_table(pool).await?;

    Ok(())
}

async fn create_spaces_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS spaces (
            space_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL DEFAULT 'Classroom',
            capacity INTEGER NOT NULL CHECK (capacity >= 0),
            sensor_id TEXT UNIQUE,
            calendar_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_live_state_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS live_state (
            space_id TEXT PRIMARY KEY REFERENCES spaces(space_id) ON DELETE CASCADE,
            occupancy INTEGER NOT NULL CHECK (occupancy >= 0),
            occupied INTEGER NOT NULL,
            is_ghost INTEGER NOT NULL,
            calendar_degraded INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            guid TEXT PRIMARY KEY,
            space_id TEXT NOT NULL,
            occupancy INTEGER NOT NULL CHECK (occupancy >= 0),
            capacity INTEGER NOT NULL,
            is_ghost INTEGER NOT NULL,
            day_of_week TEXT NOT NULL,
            recorded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_history_space_time ON history(space_id, recorded_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Upsert spaces listed in the bootstrap config
///
/// Existing live state and history are left untouched. Returns the number of
/// spaces written.
pub async fn provision_spaces(pool: &SqlitePool, spaces: &[SpaceConfig]) -> Result<usize> {
    for space in spaces {
        if space.sensor_id.is_none() {
            warn!(space_id = %space.space_id, "Space has no sensor binding; it will never receive telemetry");
        }

        sqlx::query(
            r#"
            INSERT INTO spaces (space_id, name, kind, capacity, sensor_id, calendar_id)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(space_id) DO UPDATE SET
                name = excluded.name,
                kind = excluded.kind,
                capacity = excluded.capacity,
                sensor_id = excluded.sensor_id,
                calendar_id = excluded.calendar_id,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&space.space_id)
        .bind(&space.name)
        .bind(&space.kind)
        .bind(space.capacity as i64)
        .bind(&space.sensor_id)
        .bind(&space.calendar_id)
        .execute(pool)
        .await?;
    }

    if !spaces.is_empty() {
        info!("Provisioned {} space(s)", spaces.len());
    }

    Ok(spaces.len())
}
