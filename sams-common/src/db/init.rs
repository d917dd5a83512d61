//! Database initialization
//!
//! Creates the database file on first run, applies the schema idempotently and
//! seeds default runtime settings. Safe to call on every startup.

use crate::db::settings::{
    KEY_AFTERNOON_END, KEY_AFTERNOON_START, KEY_MEAL_END, KEY_MEAL_START, KEY_MORNING_END,
    KEY_MORNING_START, KEY_RECOGNITION_THRESHOLD,
};
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_students_table(pool).await?;
    create_attendance_table(pool).await?;
    create_meals_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            guid TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            name TEXT NOT NULL,
            class_name TEXT NOT NULL DEFAULT '',
            guardian_name TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive')),
            descriptors TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Student IDs are unique among active students only; inactive rows keep history
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_students_active_id
        ON students (student_id COLLATE NOCASE)
        WHERE status = 'active'
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_attendance_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            guid TEXT PRIMARY KEY,
            student_guid TEXT NOT NULL REFERENCES students(guid),
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            date TEXT NOT NULL,
            session TEXT NOT NULL,
            session_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'present',
            confidence INTEGER NOT NULL,
            timestamp TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (student_guid, date, session)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance (date)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_meals_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meals (
            guid TEXT PRIMARY KEY,
            student_guid TEXT NOT NULL REFERENCES students(guid),
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            date TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'served',
            created_at TEXT NOT NULL,
            UNIQUE (student_guid, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meals_date ON meals (date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize default settings
///
/// Ensures all required settings exist; NULL values are reset to defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, KEY_RECOGNITION_THRESHOLD, "0.6").await?;

    ensure_setting(pool, KEY_MORNING_START, "08:00").await?;
    ensure_setting(pool, KEY_MORNING_END, "12:00").await?;
    ensure_setting(pool, KEY_MEAL_START, "12:00").await?;
    ensure_setting(pool, KEY_MEAL_END, "13:00").await?;
    ensure_setting(pool, KEY_AFTERNOON_START, "13:00").await?;
    ensure_setting(pool, KEY_AFTERNOON_END, "17:00").await?;

    Ok(())
}

/// Insert a setting if missing, or reset it if NULL
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        debug!("Setting '{}' initialized to default: {}", key, default_value);
    }

    Ok(())
}
