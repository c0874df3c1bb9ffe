//! Synchronous wrapper for TrackerClient
//!
//! Provides blocking methods for use in synchronous code: the report builder
//! and the cache sync both run on plain threads.

use std::collections::{BTreeMap, HashMap};

use crate::config::TrackerConfig;
use crate::error::{Error, Result};
use crate::report::TaskHistorySource;
use crate::sync::BoardSource;
use crate::types::{Board, BoardSnapshot, Person, Stage, Task, TaskHistory};

use super::client::TrackerClient;

/// Blocking tracker access on a private current-thread runtime
pub struct BlockingTracker {
    inner: TrackerClient,
    runtime: tokio::runtime::Runtime,
    team_board: Option<String>,
}

impl BlockingTracker {
    /// Create a new blocking tracker from configuration
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Tracker(format!("failed to create runtime: {}", e)))?;

        Ok(Self {
            inner: TrackerClient::new(config.clone())?,
            runtime,
            team_board: config.team_board.clone(),
        })
    }

    fn team_from_board(&self, board: &Board) -> Result<Vec<Person>> {
        let members = self.runtime.block_on(self.inner.members(&board.id))?;
        let stages = self.runtime.block_on(self.inner.stages(&board.id))?;
        let tasks = self.runtime.block_on(self.inner.tasks(&board.id))?;
        Ok(people_from_team_board(members, &stages, &tasks))
    }
}

impl TaskHistorySource for BlockingTracker {
    fn fetch_history(&self, task_id: &str) -> Result<TaskHistory> {
        self.runtime
            .block_on(self.inner.task_history(task_id))
            .map_err(|e| match e {
                Error::TransientFetch { .. } => e,
                other => Error::TransientFetch {
                    task_id: task_id.to_string(),
                    message: other.to_string(),
                },
            })
    }
}

impl BoardSource for BlockingTracker {
    fn list_boards(&self) -> Result<Vec<Board>> {
        self.runtime.block_on(self.inner.boards())
    }

    fn board_snapshot(&self, board: &Board) -> Result<BoardSnapshot> {
        self.runtime
            .block_on(self.inner.board_snapshot(board.clone()))
    }

    fn team(&self, boards: &[Board]) -> Result<Vec<Person>> {
        if let Some(name) = &self.team_board {
            return match boards.iter().find(|b| &b.name == name) {
                Some(board) => self.team_from_board(board),
                None => Err(Error::Tracker(format!("team board {:?} not found", name))),
            };
        }

        // No team board: everyone who is a member of some board
        let mut people: BTreeMap<String, Person> = BTreeMap::new();
        for board in boards {
            for person in self.runtime.block_on(self.inner.members(&board.id))? {
                people.entry(person.id.clone()).or_insert(person);
            }
        }
        Ok(people.into_values().collect())
    }
}

/// Name people after their card on the team board.
///
/// Each card on the team board stands for the members assigned to it: the
/// card name is their full name and the card's list is their status. Members
/// without a card keep their tracker profile name.
pub fn people_from_team_board(
    members: Vec<Person>,
    stages: &[Stage],
    tasks: &[Task],
) -> Vec<Person> {
    let stage_names: HashMap<&str, &str> = stages
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();

    let mut cards: HashMap<&str, &Task> = HashMap::new();
    for task in tasks {
        for member_id in &task.member_ids {
            cards.entry(member_id.as_str()).or_insert(task);
        }
    }

    members
        .into_iter()
        .map(|mut person| {
            if let Some(card) = cards.get(person.id.as_str()) {
                person.full_name = card.name.clone();
                person.status = stage_names
                    .get(card.stage_id.as_str())
                    .map(|name| name.to_string());
            }
            person
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> Person {
        Person {
            id: id.to_string(),
            username: id.to_string(),
            full_name: format!("{} profile", id),
            status: None,
        }
    }

    fn card(id: &str, stage_id: &str, name: &str, members: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            board_id: "team".to_string(),
            stage_id: stage_id.to_string(),
            name: name.to_string(),
            closed: false,
            last_activity_at: None,
            member_ids: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_people_from_team_board() {
        let stages = vec![
            Stage {
                id: "l1".to_string(),
                board_id: "team".to_string(),
                name: "Developers".to_string(),
                position: 1.0,
            },
            Stage {
                id: "l2".to_string(),
                board_id: "team".to_string(),
                name: "On leave".to_string(),
                position: 2.0,
            },
        ];
        let tasks = vec![
            card("c1", "l1", "Ivan Petrov", &["m1"]),
            card("c2", "l2", "Anna Smirnova", &["m2"]),
        ];

        let people =
            people_from_team_board(vec![member("m1"), member("m2"), member("m3")], &stages, &tasks);

        assert_eq!(people[0].full_name, "Ivan Petrov");
        assert_eq!(people[0].status.as_deref(), Some("Developers"));
        assert_eq!(people[1].full_name, "Anna Smirnova");
        assert_eq!(people[1].status.as_deref(), Some("On leave"));
        assert_eq!(people[2].full_name, "m3 profile");
        assert!(people[2].status.is_none());
    }

    #[test]
    fn test_blocking_tracker_requires_credentials() {
        assert!(BlockingTracker::new(&TrackerConfig::default()).is_err());
    }
}
