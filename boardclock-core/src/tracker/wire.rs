//! Trello REST payloads and their conversion to domain types

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{
    created_at_from_object_id, Board, Person, Stage, StageTransitionEvent, Task, TaskHistory,
};

/// GET /members/me/boards
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBoard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub closed: bool,
    pub date_last_activity: Option<DateTime<Utc>>,
}

impl From<WireBoard> for Board {
    fn from(board: WireBoard) -> Self {
        Board {
            id: board.id,
            name: board.name,
            description: board.desc,
            last_activity_at: board.date_last_activity,
        }
    }
}

/// GET /boards/{id}/lists
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireList {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pos: f64,
    pub id_board: String,
}

impl From<WireList> for Stage {
    fn from(list: WireList) -> Self {
        Stage {
            id: list.id,
            board_id: list.id_board,
            name: list.name,
            position: list.pos,
        }
    }
}

/// GET /boards/{id}/cards and GET /cards/{id}
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCard {
    pub id: String,
    pub name: String,
    pub id_list: String,
    pub id_board: String,
    #[serde(default)]
    pub id_members: Vec<String>,
    #[serde(default)]
    pub closed: bool,
    pub date_last_activity: Option<DateTime<Utc>>,
}

impl From<WireCard> for Task {
    fn from(card: WireCard) -> Self {
        Task {
            id: card.id,
            board_id: card.id_board,
            stage_id: card.id_list,
            name: card.name,
            closed: card.closed,
            last_activity_at: card.date_last_activity,
            member_ids: card.id_members,
        }
    }
}

/// GET /boards/{id}/members
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMember {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
}

impl From<WireMember> for Person {
    fn from(member: WireMember) -> Self {
        Person {
            id: member.id,
            username: member.username,
            full_name: member.full_name,
            status: None,
        }
    }
}

/// GET /cards/{id}/actions?filter=updateCard:idList
#[derive(Debug, Clone, Deserialize)]
pub struct WireAction {
    /// Page cursor for `before=`
    #[serde(default)]
    pub id: String,
    pub date: DateTime<Utc>,
    pub data: WireActionData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireActionData {
    pub list_before: Option<WireRef>,
    pub list_after: Option<WireRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireRef {
    pub id: String,
}

impl WireAction {
    /// Actions without both list references are not moves.
    pub fn into_transition(self) -> Option<StageTransitionEvent> {
        Some(StageTransitionEvent {
            timestamp: self.date,
            source_stage_id: self.data.list_before?.id,
            destination_stage_id: self.data.list_after?.id,
        })
    }
}

/// Build a task history from a card and its move actions.
///
/// Cards have no closing timestamp; archived cards stop at their last
/// activity.
pub fn task_history(card: WireCard, actions: Vec<WireAction>) -> Result<TaskHistory> {
    let created_at = created_at_from_object_id(&card.id).ok_or_else(|| Error::TransientFetch {
        task_id: card.id.clone(),
        message: "card id does not encode a creation time".to_string(),
    })?;

    let closed_at = if card.closed {
        card.date_last_activity
    } else {
        None
    };

    Ok(TaskHistory {
        task_id: card.id,
        created_at,
        current_stage_id: card.id_list,
        closed_at,
        transitions: actions
            .into_iter()
            .filter_map(WireAction::into_transition)
            .collect(),
    })
}
