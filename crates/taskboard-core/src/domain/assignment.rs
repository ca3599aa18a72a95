//! Assignment - task -> member relation, tracked apart from `Task.assigned_to`.

use serde::{Deserialize, Serialize};

use super::ids::{MemberId, TaskId};

/// A live assignment. Exists only while a member is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub task_id: TaskId,
    pub member_id: MemberId,
    #[serde(default)]
    pub task_card: Option<String>,
}

impl Assignment {
    pub fn new(task_id: TaskId, member_id: MemberId, task_card: Option<String>) -> Self {
        Self {
            task_id,
            member_id,
            task_card,
        }
    }
}

/// `taskAssignment` / `assignmentUpdated` payload.
///
/// `member_id == None` means "remove the assignment".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentEvent {
    pub task_id: TaskId,
    #[serde(default)]
    pub member_id: Option<MemberId>,
    #[serde(default)]
    pub task_card: Option<String>,
}

impl AssignmentEvent {
    pub fn assign(task_id: TaskId, member_id: MemberId, task_card: Option<String>) -> Self {
        Self {
            task_id,
            member_id: Some(member_id),
            task_card,
        }
    }

    pub fn removal(task_id: TaskId) -> Self {
        Self {
            task_id,
            member_id: None,
            task_card: None,
        }
    }

    pub fn is_removal(&self) -> bool {
        self.member_id.is_none()
    }

    /// The assignment this event establishes, if any.
    pub fn to_assignment(&self) -> Option<Assignment> {
        self.member_id.as_ref().map(|member_id| {
            Assignment::new(self.task_id.clone(), member_id.clone(), self.task_card.clone())
        })
    }
}

impl From<Assignment> for AssignmentEvent {
    fn from(a: Assignment) -> Self {
        Self {
            task_id: a.task_id,
            member_id: Some(a.member_id),
            task_card: a.task_card,
        }
    }
}
