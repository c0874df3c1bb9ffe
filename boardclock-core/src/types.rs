//! Core domain types for boardclock
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Board** | A project on the tracker |
//! | **Stage** | A list on a board; tasks move between stages over time |
//! | **Task** | A card on a board, assigned to zero or more people |
//! | **Person** | A tracker member; display names come from the team board |
//! | **Transition** | A recorded move of a task from one stage to another |
//!
//! Timestamps coming from the tracker are UTC. Business-time accounting
//! happens in local wall-clock time, see [`crate::accounting`].

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Cached tracker entities
// ============================================

/// A project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Used to decide whether the cached copy is stale
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// A workflow stage (tracker list) on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    pub board_id: String,
    pub name: String,
    /// Ordering on the board, ascending left to right
    pub position: f64,
}

/// A person that can be assigned to tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub username: String,
    pub full_name: String,
    /// Name of the team-board list the person's card sits in, if any
    pub status: Option<String>,
}

/// A task (tracker card).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub board_id: String,
    pub stage_id: String,
    pub name: String,
    pub closed: bool,
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Ids of assigned people
    pub member_ids: Vec<String>,
}

/// Everything cached for one board, replaced as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub board: Board,
    pub stages: Vec<Stage>,
    pub tasks: Vec<Task>,
}

// ============================================
// History and reporting
// ============================================

/// A task moving from one stage to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTransitionEvent {
    pub timestamp: DateTime<Utc>,
    pub source_stage_id: String,
    pub destination_stage_id: String,
}

/// Lifetime of a task as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHistory {
    pub task_id: String,
    pub created_at: DateTime<Utc>,
    pub current_stage_id: String,
    /// Set for archived tasks; accounting stops here instead of "now"
    pub closed_at: Option<DateTime<Utc>>,
    /// Not necessarily sorted
    pub transitions: Vec<StageTransitionEvent>,
}

/// A cached task assigned to a person, with the names needed for a report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTask {
    pub task_id: String,
    pub task_name: String,
    pub person_id: String,
    pub person_name: String,
    pub stage_id: String,
    pub stage_name: String,
    pub board_id: String,
    pub board_name: String,
}

/// One line of a time report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub person_id: String,
    pub person_name: String,
    pub task_id: String,
    pub task_name: String,
    pub stage_id: String,
    pub stage_name: String,
    /// Business time the task spent in the stage
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub board_id: String,
    pub board_name: String,
}

impl ReportRow {
    pub fn new(candidate: &CandidateTask, duration: Duration) -> Self {
        Self {
            person_id: candidate.person_id.clone(),
            person_name: candidate.person_name.clone(),
            task_id: candidate.task_id.clone(),
            task_name: candidate.task_name.clone(),
            stage_id: candidate.stage_id.clone(),
            stage_name: candidate.stage_name.clone(),
            duration,
            board_id: candidate.board_id.clone(),
            board_name: candidate.board_name.clone(),
        }
    }
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        i64::deserialize(d).map(Duration::seconds)
    }
}

/// Per-board summary used by list views.
#[derive(Debug, Clone, Default)]
pub struct BoardOverview {
    /// Stages in board order with the number of open tasks in each
    pub stages: Vec<(Stage, i64)>,
    /// People assigned to at least one task on the board
    pub people: Vec<Person>,
}

/// Creation time encoded in a tracker object id.
///
/// Ids are 24 hex digits; the first 8 are a big-endian Unix timestamp.
pub fn created_at_from_object_id(id: &str) -> Option<DateTime<Utc>> {
    let prefix = id.get(..8)?;
    let secs = u32::from_str_radix(prefix, 16).ok()?;
    Utc.timestamp_opt(i64::from(secs), 0).single()
}
