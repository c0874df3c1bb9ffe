//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: tracker cache and settings
    r#"
    -- ============================================
    -- Tracker cache (replaced per board on sync)
    -- ============================================

    CREATE TABLE IF NOT EXISTS boards (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        description      TEXT NOT NULL DEFAULT '',
        last_activity_at DATETIME,
        synced_at        DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS stages (
        id               TEXT PRIMARY KEY,
        board_id         TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
        name             TEXT NOT NULL,
        position         REAL NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_stages_board ON stages(board_id, position);

    CREATE TABLE IF NOT EXISTS persons (
        id               TEXT PRIMARY KEY,
        username         TEXT NOT NULL,
        full_name        TEXT NOT NULL,
        status           TEXT
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id               TEXT PRIMARY KEY,
        board_id         TEXT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
        stage_id         TEXT NOT NULL,
        name             TEXT NOT NULL,
        closed           INTEGER NOT NULL DEFAULT 0,
        last_activity_at DATETIME
    );

    CREATE INDEX IF NOT EXISTS idx_tasks_board ON tasks(board_id);

    -- person_id is not a foreign key: people are refreshed independently
    CREATE TABLE IF NOT EXISTS task_assignments (
        task_id          TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        person_id        TEXT NOT NULL,
        PRIMARY KEY (task_id, person_id)
    );

    CREATE INDEX IF NOT EXISTS idx_task_assignments_person ON task_assignments(person_id);

    -- ============================================
    -- Settings (working calendar)
    -- ============================================

    CREATE TABLE IF NOT EXISTS settings (
        key              TEXT PRIMARY KEY,
        value            TEXT NOT NULL,
        updated_at       DATETIME NOT NULL
    );
    "#,
    // Version 2: stored reports
    r#"
    CREATE TABLE IF NOT EXISTS reports (
        id               TEXT PRIMARY KEY,
        board_id         TEXT NOT NULL,
        generated_at     DATETIME NOT NULL,
        range_start      DATETIME,
        range_end        DATETIME,
        tasks_examined   INTEGER NOT NULL DEFAULT 0,
        request          JSON NOT NULL,
        skipped          JSON NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_reports_board ON reports(board_id);

    CREATE TABLE IF NOT EXISTS report_rows (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        report_id        TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
        person_id        TEXT NOT NULL,
        person_name      TEXT NOT NULL,
        task_id          TEXT NOT NULL,
        task_name        TEXT NOT NULL,
        stage_id         TEXT NOT NULL,
        stage_name       TEXT NOT NULL,
        duration_secs    INTEGER NOT NULL,
        board_id         TEXT NOT NULL,
        board_name       TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_report_rows_report ON report_rows(report_id);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
