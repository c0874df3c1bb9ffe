//! Tracker cache synchronization
//!
//! Keeps the local cache of boards, stages, tasks and people in step with
//! the tracker. Reports are selected from this cache, so it only needs to
//! be as fresh as the sync interval.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  BoardSource    │ ──► │    CacheSync     │ ──► │    Database     │
//! │ (Trello API)    │     │                  │     │ (boards, tasks) │
//! └─────────────────┘     └──────────────────┘     └─────────────────┘
//! ```
//!
//! Per board:
//! - not cached yet: fetched and stored
//! - cached, but no longer on the tracker: removed with everything under it
//! - last activity advanced since the cached copy: fetched and replaced
//! - otherwise: skipped
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boardclock_core::{Config, Database};
//! use boardclock_core::sync::CacheSync;
//! use boardclock_core::tracker::BlockingTracker;
//!
//! let db = Database::open(&Config::database_path())?;
//! let tracker = BlockingTracker::new(&config.tracker)?;
//!
//! let result = CacheSync::new(&db, &tracker).sync_all()?;
//! println!("{} boards added, {} updated", result.boards_added, result.boards_updated);
//! ```

use crate::db::Database;
use crate::error::Result;
use crate::types::{Board, BoardSnapshot, Person};
use std::collections::HashMap;

/// Remote side of a cache sync.
pub trait BoardSource {
    /// Boards visible to the configured account
    fn list_boards(&self) -> Result<Vec<Board>>;

    /// Stages and tasks of one board
    fn board_snapshot(&self, board: &Board) -> Result<BoardSnapshot>;

    /// Everyone who can be reported on, given the current boards
    fn team(&self, boards: &[Board]) -> Result<Vec<Person>>;
}

/// Result of a full sync operation.
#[derive(Debug, Default)]
pub struct SyncResult {
    /// Boards cached for the first time
    pub boards_added: usize,
    /// Boards re-fetched because they changed
    pub boards_updated: usize,
    /// Boards unchanged since the last sync
    pub boards_skipped: usize,
    /// Boards dropped from the cache
    pub boards_removed: usize,
    /// Tasks stored across added and updated boards
    pub tasks_stored: usize,
    /// People stored
    pub persons_synced: usize,
    /// Errors encountered (board id or "team" → error message)
    pub errors: Vec<(String, String)>,
}

/// Synchronizes the local cache from a [`BoardSource`].
pub struct CacheSync<'a> {
    db: &'a Database,
    source: &'a dyn BoardSource,
}

impl<'a> CacheSync<'a> {
    pub fn new(db: &'a Database, source: &'a dyn BoardSource) -> Self {
        Self { db, source }
    }

    /// Sync all boards and the team.
    pub fn sync_all(&self) -> Result<SyncResult> {
        self.sync_all_with_progress(|_, _, _| {})
    }

    /// Sync all boards with progress callback.
    ///
    /// The callback receives `(current_board_index, total_boards, board)`
    /// before each remote board is processed.
    ///
    /// Failing to list boards fails the sync. A failure on one board is
    /// recorded in [`SyncResult::errors`] and the remaining boards continue.
    pub fn sync_all_with_progress<F>(&self, mut on_progress: F) -> Result<SyncResult>
    where
        F: FnMut(usize, usize, &Board),
    {
        let remote = self.source.list_boards()?;
        let cached: HashMap<String, Board> = self
            .db
            .list_boards()?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();

        let mut result = SyncResult::default();

        for board in cached.values() {
            if remote.iter().any(|r| r.id == board.id) {
                continue;
            }
            match self.db.remove_board(&board.id) {
                Ok(_) => {
                    tracing::info!(board_id = %board.id, name = %board.name, "Board removed");
                    result.boards_removed += 1;
                }
                Err(e) => result.errors.push((board.id.clone(), e.to_string())),
            }
        }

        let total = remote.len();
        for (i, board) in remote.iter().enumerate() {
            on_progress(i, total, board);

            let is_new = match cached.get(&board.id) {
                None => true,
                Some(old) if board.last_activity_at > old.last_activity_at => false,
                Some(_) => {
                    tracing::debug!(board_id = %board.id, "Board unchanged");
                    result.boards_skipped += 1;
                    continue;
                }
            };

            match self.refresh_board(board) {
                Ok(tasks) => {
                    result.tasks_stored += tasks;
                    if is_new {
                        result.boards_added += 1;
                    } else {
                        result.boards_updated += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(board_id = %board.id, error = %e, "Board sync failed");
                    result.errors.push((board.id.clone(), e.to_string()));
                }
            }
        }

        match self
            .source
            .team(&remote)
            .and_then(|people| self.db.replace_persons(&people).map(|_| people.len()))
        {
            Ok(count) => result.persons_synced = count,
            Err(e) => {
                tracing::warn!(error = %e, "Team sync failed");
                result.errors.push(("team".to_string(), e.to_string()));
            }
        }

        tracing::info!(
            added = result.boards_added,
            updated = result.boards_updated,
            skipped = result.boards_skipped,
            removed = result.boards_removed,
            persons = result.persons_synced,
            errors = result.errors.len(),
            "Sync complete"
        );

        Ok(result)
    }

    fn refresh_board(&self, board: &Board) -> Result<usize> {
        let snapshot = self.source.board_snapshot(board)?;
        let tasks = snapshot.tasks.len();
        self.db.replace_board_snapshot(&snapshot)?;
        tracing::info!(board_id = %board.id, name = %board.name, tasks, "Board synced");
        Ok(tasks)
    }
}
