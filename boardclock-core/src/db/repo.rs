//! Database repository layer
//!
//! Provides query and insert operations for the tracker cache, the stored
//! working calendar and generated reports.

use crate::calendar::WorkCalendar;
use crate::error::{Error, Result};
use crate::format::{format_duration, format_time_of_day, parse_duration, parse_time_of_day};
use crate::report::{Report, ReportRequest, ReportSink, SkippedTask, TaskCandidateSource};
use crate::types::*;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Settings keys for the stored calendar
const WORK_DAY_START: &str = "work_day_start";
const WORK_DAY_END: &str = "work_day_end";
const LUNCH_START: &str = "lunch_start";
const LUNCH_END: &str = "lunch_end";
const WORK_DAYS_PER_WEEK: &str = "work_days_per_week";
const DAILY_WORK_DURATION: &str = "daily_work_duration";
const WEEKLY_WORK_DURATION: &str = "weekly_work_duration";
const LUNCH_DURATION: &str = "lunch_duration";

/// A report as last stored for a board.
#[derive(Debug, Clone)]
pub struct StoredReport {
    pub id: String,
    pub board_id: String,
    pub report: Report,
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable foreign keys and WAL mode for better concurrency
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;  -- 64MB cache
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // Board operations
    // ============================================

    /// Replace everything cached for a board in one transaction.
    pub fn replace_board_snapshot(&self, snapshot: &BoardSnapshot) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;
        let board = &snapshot.board;

        // Cascades to stages, tasks and assignments
        tx.execute("DELETE FROM boards WHERE id = ?", [&board.id])?;
        tx.execute(
            r#"
            INSERT INTO boards (id, name, description, last_activity_at, synced_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                board.id,
                board.name,
                board.description,
                board.last_activity_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )?;

        for stage in &snapshot.stages {
            tx.execute(
                "INSERT OR REPLACE INTO stages (id, board_id, name, position) VALUES (?1, ?2, ?3, ?4)",
                params![stage.id, board.id, stage.name, stage.position],
            )?;
        }

        for task in &snapshot.tasks {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO tasks (id, board_id, stage_id, name, closed, last_activity_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    task.id,
                    board.id,
                    task.stage_id,
                    task.name,
                    task.closed,
                    task.last_activity_at.map(|t| t.to_rfc3339()),
                ],
            )?;
            for person_id in &task.member_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO task_assignments (task_id, person_id) VALUES (?1, ?2)",
                    params![task.id, person_id],
                )?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            board_id = %board.id,
            stages = snapshot.stages.len(),
            tasks = snapshot.tasks.len(),
            "Replaced board snapshot"
        );
        Ok(())
    }

    /// Remove a board and everything cached under it.
    ///
    /// Returns false when the board was not cached.
    pub fn remove_board(&self, board_id: &str) -> Result<bool> {
        let conn = self.connection();
        let removed = conn.execute("DELETE FROM boards WHERE id = ?", [board_id])?;
        Ok(removed > 0)
    }

    /// List cached boards ordered by name
    pub fn list_boards(&self) -> Result<Vec<Board>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT * FROM boards ORDER BY name, id")?;
        let boards = stmt
            .query_map([], Self::row_to_board)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(boards)
    }

    /// Get a board by ID
    pub fn get_board(&self, id: &str) -> Result<Option<Board>> {
        let conn = self.connection();
        conn.query_row("SELECT * FROM boards WHERE id = ?", [id], Self::row_to_board)
            .optional()
            .map_err(Error::from)
    }

    /// Look a board up by ID, then by exact name.
    pub fn find_board(&self, id_or_name: &str) -> Result<Option<Board>> {
        if let Some(board) = self.get_board(id_or_name)? {
            return Ok(Some(board));
        }
        let conn = self.connection();
        conn.query_row(
            "SELECT * FROM boards WHERE name = ? ORDER BY id LIMIT 1",
            [id_or_name],
            Self::row_to_board,
        )
        .optional()
        .map_err(Error::from)
    }

    fn row_to_board(row: &Row) -> rusqlite::Result<Board> {
        let last_activity_str: Option<String> = row.get("last_activity_at")?;
        Ok(Board {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            last_activity_at: parse_timestamp(last_activity_str),
        })
    }

    // ============================================
    // Stage and task operations
    // ============================================

    /// Stages of a board in board order
    pub fn list_stages(&self, board_id: &str) -> Result<Vec<Stage>> {
        let conn = self.connection();
        let mut stmt =
            conn.prepare("SELECT * FROM stages WHERE board_id = ? ORDER BY position, id")?;
        let stages = stmt
            .query_map([board_id], Self::row_to_stage)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stages)
    }

    fn row_to_stage(row: &Row) -> rusqlite::Result<Stage> {
        Ok(Stage {
            id: row.get("id")?,
            board_id: row.get("board_id")?,
            name: row.get("name")?,
            position: row.get("position")?,
        })
    }

    /// Tasks of a board with their assignees
    pub fn list_tasks(&self, board_id: &str) -> Result<Vec<Task>> {
        let conn = self.connection();

        let mut members: HashMap<String, Vec<String>> = HashMap::new();
        let mut stmt = conn.prepare(
            r#"
            SELECT a.task_id, a.person_id
            FROM task_assignments a
            JOIN tasks t ON t.id = a.task_id
            WHERE t.board_id = ?
            ORDER BY a.person_id
            "#,
        )?;
        let rows = stmt.query_map([board_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (task_id, person_id) = row?;
            members.entry(task_id).or_default().push(person_id);
        }

        let mut stmt = conn.prepare("SELECT * FROM tasks WHERE board_id = ? ORDER BY name, id")?;
        let tasks = stmt
            .query_map([board_id], |row| {
                let last_activity_str: Option<String> = row.get("last_activity_at")?;
                let id: String = row.get("id")?;
                Ok(Task {
                    member_ids: members.remove(&id).unwrap_or_default(),
                    id,
                    board_id: row.get("board_id")?,
                    stage_id: row.get("stage_id")?,
                    name: row.get("name")?,
                    closed: row.get("closed")?,
                    last_activity_at: parse_timestamp(last_activity_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    // ============================================
    // Person operations
    // ============================================

    /// Replace the cached people in one transaction
    pub fn replace_persons(&self, persons: &[Person]) -> Result<()> {
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM persons", [])?;
        for person in persons {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO persons (id, username, full_name, status)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![person.id, person.username, person.full_name, person.status],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// List cached people ordered by full name
    pub fn list_persons(&self) -> Result<Vec<Person>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT * FROM persons ORDER BY full_name, id")?;
        let persons = stmt
            .query_map([], Self::row_to_person)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(persons)
    }

    /// Look a person up by ID, username or full name.
    pub fn find_person(&self, key: &str) -> Result<Option<Person>> {
        let conn = self.connection();
        conn.query_row(
            r#"
            SELECT * FROM persons
            WHERE id = ?1 OR username = ?1 OR full_name = ?1
            ORDER BY (id = ?1) DESC, (username = ?1) DESC
            LIMIT 1
            "#,
            [key],
            Self::row_to_person,
        )
        .optional()
        .map_err(Error::from)
    }

    fn row_to_person(row: &Row) -> rusqlite::Result<Person> {
        Ok(Person {
            id: row.get("id")?,
            username: row.get("username")?,
            full_name: row.get("full_name")?,
            status: row.get("status")?,
        })
    }

    // ============================================
    // Overview queries
    // ============================================

    /// Stages with open task counts and the people assigned on a board.
    pub fn board_overview(&self, board_id: &str) -> Result<BoardOverview> {
        let conn = self.connection();

        let mut stmt = conn.prepare(
            r#"
            SELECT s.*, COUNT(t.id) AS open_tasks
            FROM stages s
            LEFT JOIN tasks t ON t.stage_id = s.id AND t.closed = 0
            WHERE s.board_id = ?
            GROUP BY s.id
            ORDER BY s.position, s.id
            "#,
        )?;
        let stages = stmt
            .query_map([board_id], |row| {
                Ok((Self::row_to_stage(row)?, row.get::<_, i64>("open_tasks")?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        // People without a cached profile still show up under their ID
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT a.person_id AS id,
                   COALESCE(p.username, a.person_id) AS username,
                   COALESCE(p.full_name, a.person_id) AS full_name,
                   p.status AS status
            FROM task_assignments a
            JOIN tasks t ON t.id = a.task_id
            LEFT JOIN persons p ON p.id = a.person_id
            WHERE t.board_id = ?
            ORDER BY full_name, id
            "#,
        )?;
        let people = stmt
            .query_map([board_id], Self::row_to_person)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(BoardOverview { stages, people })
    }

    /// Open tasks assigned to a person that sit in a stage with this name,
    /// on any board.
    pub fn active_task_count(&self, person_id: &str, stage_name: &str) -> Result<i64> {
        let conn = self.connection();
        let count = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM tasks t
            JOIN task_assignments a ON a.task_id = t.id
            JOIN stages s ON s.id = t.stage_id
            WHERE a.person_id = ?1 AND s.name = ?2 AND t.closed = 0
            "#,
            params![person_id, stage_name],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ============================================
    // Calendar settings
    // ============================================

    /// Stored working calendar, or `None` before the first save.
    pub fn load_calendar(&self) -> Result<Option<WorkCalendar>> {
        let settings = self.settings()?;
        if !settings.contains_key(WORK_DAY_START) {
            return Ok(None);
        }

        let time = |key: &str| -> Result<chrono::NaiveTime> {
            let value = settings
                .get(key)
                .ok_or_else(|| Error::Config(format!("stored calendar is missing {}", key)))?;
            parse_time_of_day(value)
        };

        let days = settings
            .get(WORK_DAYS_PER_WEEK)
            .ok_or_else(|| {
                Error::Config(format!("stored calendar is missing {}", WORK_DAYS_PER_WEEK))
            })?
            .parse::<u8>()
            .map_err(|e| Error::InvalidValue(format!("{}: {}", WORK_DAYS_PER_WEEK, e)))?;

        let calendar = WorkCalendar::new(
            time(WORK_DAY_START)?,
            time(WORK_DAY_END)?,
            time(LUNCH_START)?,
            time(LUNCH_END)?,
            days,
        )?;

        // Totals are recomputed from the bounds; stored copies only get checked
        let derived = [
            (DAILY_WORK_DURATION, calendar.daily_work_duration()),
            (WEEKLY_WORK_DURATION, calendar.weekly_work_duration()),
            (LUNCH_DURATION, calendar.lunch_duration()),
        ];
        for (key, expected) in derived {
            let Some(value) = settings.get(key) else {
                continue;
            };
            let stored = parse_duration(value)?;
            if stored != expected {
                tracing::warn!(
                    key,
                    stored = %value,
                    derived = %format_duration(expected),
                    "Stored calendar total disagrees with its bounds"
                );
            }
        }

        Ok(Some(calendar))
    }

    /// Store the working calendar with its derived totals.
    pub fn save_calendar(&self, calendar: &WorkCalendar) -> Result<()> {
        let values = [
            (WORK_DAY_START, format_time_of_day(calendar.work_day_start())),
            (WORK_DAY_END, format_time_of_day(calendar.work_day_end())),
            (LUNCH_START, format_time_of_day(calendar.lunch_start())),
            (LUNCH_END, format_time_of_day(calendar.lunch_end())),
            (WORK_DAYS_PER_WEEK, calendar.work_days_per_week().to_string()),
            (DAILY_WORK_DURATION, format_duration(calendar.daily_work_duration())),
            (WEEKLY_WORK_DURATION, format_duration(calendar.weekly_work_duration())),
            (LUNCH_DURATION, format_duration(calendar.lunch_duration())),
        ];

        let mut conn = self.connection();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        for (key, value) in &values {
            tx.execute(
                r#"
                INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                params![key, value, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn settings(&self) -> Result<HashMap<String, String>> {
        let conn = self.connection();
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let settings = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(settings)
    }

    // ============================================
    // Reports
    // ============================================

    /// Most recent stored report for a board
    pub fn latest_report(&self, board_id: &str) -> Result<Option<StoredReport>> {
        let conn = self.connection();
        let header = conn
            .query_row(
                r#"
                SELECT id, generated_at, tasks_examined, skipped
                FROM reports WHERE board_id = ?
                ORDER BY generated_at DESC LIMIT 1
                "#,
                [board_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, generated_at, tasks_examined, skipped)) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT person_id, person_name, task_id, task_name, stage_id, stage_name,
                   duration_secs, board_id, board_name
            FROM report_rows WHERE report_id = ? ORDER BY id
            "#,
        )?;
        let rows = stmt
            .query_map([&id], |row| {
                Ok(ReportRow {
                    person_id: row.get(0)?,
                    person_name: row.get(1)?,
                    task_id: row.get(2)?,
                    task_name: row.get(3)?,
                    stage_id: row.get(4)?,
                    stage_name: row.get(5)?,
                    duration: Duration::seconds(row.get(6)?),
                    board_id: row.get(7)?,
                    board_name: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let skipped: Vec<SkippedTask> = serde_json::from_str(&skipped)?;

        Ok(Some(StoredReport {
            id,
            board_id: board_id.to_string(),
            report: Report {
                generated_at: parse_timestamp(Some(generated_at)),
                rows,
                skipped,
                tasks_examined: usize::try_from(tasks_examined).unwrap_or_default(),
            },
        }))
    }
}

impl TaskCandidateSource for Database {
    fn candidate_tasks(
        &self,
        board_id: &str,
        stage_id: &str,
        person_id: &str,
    ) -> Result<Vec<CandidateTask>> {
        let conn = self.connection();
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, a.person_id,
                   COALESCE(NULLIF(p.full_name, ''), p.username, a.person_id),
                   s.id, s.name, b.id, b.name
            FROM tasks t
            JOIN task_assignments a ON a.task_id = t.id
            JOIN boards b ON b.id = t.board_id
            JOIN stages s ON s.board_id = b.id AND s.id = ?2
            LEFT JOIN persons p ON p.id = a.person_id
            WHERE t.board_id = ?1 AND a.person_id = ?3
            ORDER BY t.name, t.id
            "#,
        )?;
        let candidates = stmt
            .query_map(params![board_id, stage_id, person_id], |row| {
                Ok(CandidateTask {
                    task_id: row.get(0)?,
                    task_name: row.get(1)?,
                    person_id: row.get(2)?,
                    person_name: row.get(3)?,
                    stage_id: row.get(4)?,
                    stage_name: row.get(5)?,
                    board_id: row.get(6)?,
                    board_name: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }
}

impl ReportSink for Database {
    fn replace_report(&self, request: &ReportRequest, report: &Report) -> Result<()> {
        let id = uuid::Uuid::new_v4().to_string();
        let generated_at = report.generated_at.unwrap_or_else(Utc::now);

        let mut conn = self.connection();
        let tx = conn.transaction()?;

        // Cascades to report_rows
        tx.execute("DELETE FROM reports WHERE board_id = ?", [&request.board_id])?;
        tx.execute(
            r#"
            INSERT INTO reports (id, board_id, generated_at, range_start, range_end,
                                 tasks_examined, request, skipped)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                id,
                request.board_id,
                generated_at.to_rfc3339(),
                request.range.map(|r| r.start().to_string()),
                request.range.map(|r| r.end().to_string()),
                i64::try_from(report.tasks_examined).unwrap_or(i64::MAX),
                serde_json::to_string(request)?,
                serde_json::to_string(&report.skipped)?,
            ],
        )?;

        for row in &report.rows {
            tx.execute(
                r#"
                INSERT INTO report_rows (report_id, person_id, person_name, task_id, task_name,
                                         stage_id, stage_name, duration_secs, board_id, board_name)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    id,
                    row.person_id,
                    row.person_name,
                    row.task_id,
                    row.task_name,
                    row.stage_id,
                    row.stage_name,
                    row.duration.num_seconds(),
                    row.board_id,
                    row.board_name,
                ],
            )?;
        }

        tx.commit()?;

        tracing::info!(
            report_id = %id,
            board_id = %request.board_id,
            rows = report.rows.len(),
            "Stored report"
        );
        Ok(())
    }
}

fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn create_test_snapshot(board_id: &str) -> BoardSnapshot {
        let stage = |id: &str, name: &str, position: f64| Stage {
            id: id.to_string(),
            board_id: board_id.to_string(),
            name: name.to_string(),
            position,
        };
        let task = |id: &str, stage_id: &str, closed: bool, members: &[&str]| Task {
            id: id.to_string(),
            board_id: board_id.to_string(),
            stage_id: stage_id.to_string(),
            name: format!("Task {}", id),
            closed,
            last_activity_at: None,
            member_ids: members.iter().map(|m| m.to_string()).collect(),
        };

        BoardSnapshot {
            board: Board {
                id: board_id.to_string(),
                name: format!("Board {}", board_id),
                description: String::new(),
                last_activity_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
            },
            stages: vec![
                stage(&format!("{}-todo", board_id), "Todo", 1.0),
                stage(&format!("{}-doing", board_id), "Doing", 2.0),
            ],
            tasks: vec![
                task(&format!("{}-t1", board_id), &format!("{}-todo", board_id), false, &["alice"]),
                task(
                    &format!("{}-t2", board_id),
                    &format!("{}-doing", board_id),
                    false,
                    &["alice", "bob"],
                ),
                task(&format!("{}-t3", board_id), &format!("{}-doing", board_id), true, &["bob"]),
            ],
        }
    }

    fn create_test_persons() -> Vec<Person> {
        vec![
            Person {
                id: "alice".to_string(),
                username: "alice01".to_string(),
                full_name: "Alice Liddell".to_string(),
                status: Some("Active".to_string()),
            },
            Person {
                id: "bob".to_string(),
                username: "bob".to_string(),
                full_name: String::new(),
                status: None,
            },
        ]
    }

    #[test]
    fn test_replace_board_snapshot() {
        let db = test_db();
        let snapshot = create_test_snapshot("b1");
        db.replace_board_snapshot(&snapshot).unwrap();
        // Replacing twice must not duplicate anything
        db.replace_board_snapshot(&snapshot).unwrap();

        let boards = db.list_boards().unwrap();
        assert_eq!(boards, vec![snapshot.board.clone()]);

        let stages = db.list_stages("b1").unwrap();
        assert_eq!(stages, snapshot.stages);

        let tasks = db.list_tasks("b1").unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[1].member_ids, vec!["alice", "bob"]);
    }

    #[test]
    fn test_replace_drops_vanished_tasks() {
        let db = test_db();
        let mut snapshot = create_test_snapshot("b1");
        db.replace_board_snapshot(&snapshot).unwrap();

        snapshot.tasks.truncate(1);
        db.replace_board_snapshot(&snapshot).unwrap();

        assert_eq!(db.list_tasks("b1").unwrap().len(), 1);
    }

    #[test]
    fn test_remove_board() {
        let db = test_db();
        db.replace_board_snapshot(&create_test_snapshot("b1")).unwrap();
        db.replace_board_snapshot(&create_test_snapshot("b2")).unwrap();

        assert!(db.remove_board("b1").unwrap());
        assert!(!db.remove_board("b1").unwrap());

        let boards = db.list_boards().unwrap();
        assert_eq!(boards.len(), 1);
        assert_eq!(boards[0].id, "b2");
        assert!(db.list_tasks("b1").unwrap().is_empty());
        assert!(db.list_stages("b1").unwrap().is_empty());
    }

    #[test]
    fn test_find_board_by_name() {
        let db = test_db();
        db.replace_board_snapshot(&create_test_snapshot("b1")).unwrap();

        assert_eq!(db.find_board("b1").unwrap().unwrap().id, "b1");
        assert_eq!(db.find_board("Board b1").unwrap().unwrap().id, "b1");
        assert!(db.find_board("Nope").unwrap().is_none());
    }

    #[test]
    fn test_persons() {
        let db = test_db();
        db.replace_persons(&create_test_persons()).unwrap();

        assert_eq!(db.list_persons().unwrap().len(), 2);
        assert_eq!(db.find_person("alice01").unwrap().unwrap().id, "alice");
        assert_eq!(db.find_person("Alice Liddell").unwrap().unwrap().id, "alice");

        db.replace_persons(&create_test_persons()[..1]).unwrap();
        assert!(db.find_person("bob").unwrap().is_none());
    }

    #[test]
    fn test_candidate_tasks() {
        let db = test_db();
        db.replace_board_snapshot(&create_test_snapshot("b1")).unwrap();
        db.replace_board_snapshot(&create_test_snapshot("b2")).unwrap();
        db.replace_persons(&create_test_persons()).unwrap();

        // Every task of the person on the board, whatever its current stage
        let candidates = db.candidate_tasks("b1", "b1-todo", "alice").unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.stage_name == "Todo"));
        assert!(candidates.iter().all(|c| c.board_name == "Board b1"));
        assert_eq!(candidates[0].person_name, "Alice Liddell");

        // Empty full name falls back to the username
        let candidates = db.candidate_tasks("b1", "b1-doing", "bob").unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].person_name, "bob");

        // Stage from another board
        assert!(db.candidate_tasks("b1", "b2-todo", "alice").unwrap().is_empty());
    }

    #[test]
    fn test_board_overview() {
        let db = test_db();
        db.replace_board_snapshot(&create_test_snapshot("b1")).unwrap();
        db.replace_persons(&create_test_persons()[..1]).unwrap();

        let overview = db.board_overview("b1").unwrap();
        let counts: Vec<_> = overview
            .stages
            .iter()
            .map(|(s, n)| (s.name.as_str(), *n))
            .collect();
        // Closed tasks are not counted
        assert_eq!(counts, vec![("Todo", 1), ("Doing", 1)]);

        let names: Vec<_> = overview.people.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["Alice Liddell", "bob"]);
    }

    #[test]
    fn test_active_task_count() {
        let db = test_db();
        db.replace_board_snapshot(&create_test_snapshot("b1")).unwrap();
        db.replace_board_snapshot(&create_test_snapshot("b2")).unwrap();

        assert_eq!(db.active_task_count("alice", "Doing").unwrap(), 2);
        assert_eq!(db.active_task_count("bob", "Doing").unwrap(), 2);
        assert_eq!(db.active_task_count("bob", "Todo").unwrap(), 0);
    }

    #[test]
    fn test_calendar_roundtrip() {
        let db = test_db();
        assert!(db.load_calendar().unwrap().is_none());

        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        let calendar = WorkCalendar::new(t(8, 30), t(17, 0), t(12, 0), t(12, 30), 6).unwrap();
        db.save_calendar(&calendar).unwrap();
        assert_eq!(db.load_calendar().unwrap(), Some(calendar));

        let settings = db.settings().unwrap();
        assert_eq!(settings[WORK_DAY_START], "08:30:00");
        assert_eq!(settings[WEEKLY_WORK_DURATION], "48:00:00");

        db.save_calendar(&WorkCalendar::default()).unwrap();
        assert_eq!(db.load_calendar().unwrap(), Some(WorkCalendar::default()));
    }

    #[test]
    fn test_calendar_totals_are_derived_from_bounds() {
        let db = test_db();
        db.save_calendar(&WorkCalendar::default()).unwrap();

        db.connection()
            .execute(
                "UPDATE settings SET value = '7:00:00' WHERE key = ?",
                [DAILY_WORK_DURATION],
            )
            .unwrap();
        let calendar = db.load_calendar().unwrap().unwrap();
        assert_eq!(calendar.daily_work_duration(), Duration::hours(8));

        db.connection()
            .execute(
                "UPDATE settings SET value = 'eight hours' WHERE key = ?",
                [WEEKLY_WORK_DURATION],
            )
            .unwrap();
        assert!(matches!(
            db.load_calendar(),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn test_replace_report() {
        let db = test_db();
        let request = ReportRequest {
            board_id: "b1".to_string(),
            stage_ids: vec!["b1-todo".to_string()],
            person_ids: vec!["alice".to_string()],
            range: None,
        };
        let candidate = CandidateTask {
            task_id: "b1-t1".to_string(),
            task_name: "Task".to_string(),
            person_id: "alice".to_string(),
            person_name: "Alice".to_string(),
            stage_id: "b1-todo".to_string(),
            stage_name: "Todo".to_string(),
            board_id: "b1".to_string(),
            board_name: "Board".to_string(),
        };
        let report = |n: usize| Report {
            generated_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
            rows: vec![ReportRow::new(&candidate, Duration::minutes(90)); n],
            skipped: vec![SkippedTask {
                task_id: "x".to_string(),
                task_name: "X".to_string(),
                reason: "timeout".to_string(),
            }],
            tasks_examined: 2,
        };

        db.replace_report(&request, &report(3)).unwrap();
        db.replace_report(&request, &report(2)).unwrap();

        let stored = db.latest_report("b1").unwrap().unwrap();
        assert_eq!(stored.report.rows.len(), 2);
        assert_eq!(stored.report.rows[0].duration, Duration::minutes(90));
        assert_eq!(stored.report.skipped[0].reason, "timeout");
        assert_eq!(stored.report.tasks_examined, 2);

        let conn = db.connection();
        let reports: i64 = conn
            .query_row("SELECT COUNT(*) FROM reports", [], |r| r.get(0))
            .unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM report_rows", [], |r| r.get(0))
            .unwrap();
        assert_eq!((reports, rows), (1, 2));
    }
}
