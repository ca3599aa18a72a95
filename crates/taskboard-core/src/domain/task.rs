//! Task record and its enums.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use super::ids::{MemberId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority `{other}`")),
        }
    }
}

/// Task progress.
///
/// Wire values are kebab-case (`not-started`, `in-progress`, `completed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "not-started",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
        }
    }

    /// Badge text: `in-progress` -> `In Progress`.
    pub fn label(&self) -> &'static str {
        match self {
            Status::NotStarted => "Not Started",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not-started" => Ok(Status::NotStarted),
            "in-progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            other => Err(format!("unknown status `{other}`")),
        }
    }
}

/// A task on the board.
///
/// Design:
/// - `assigned_to` is redundant with the Assignment map. Both are kept so that
///   assignment changes can be broadcast on their own.
/// - `team_card` is the card the task was dropped onto (if any).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub assigned_to: Option<MemberId>,
    #[serde(default)]
    pub team_card: Option<String>,
}

impl Task {
    /// A freshly created task: `not-started`, unassigned, on no card.
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        description: Option<String>,
        priority: Priority,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description,
            priority,
            status: Status::NotStarted,
            due_date,
            assigned_to: None,
            team_card: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_to.is_some()
    }

    /// Merge `patch` into this task, field by field. Absent fields are kept.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(assigned_to) = &patch.assigned_to {
            self.assigned_to = assigned_to.clone();
        }
        if let Some(team_card) = &patch.team_card {
            self.team_card = team_card.clone();
        }
    }
}

/// Input for creating a task through the request/reply surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub team_card: Option<String>,
}

/// Field-by-field update.
///
/// 省略されたフィールドは変更しない。nullable なフィールド（description,
/// assignedTo, teamCard）は「省略」と「null」を区別するため `Option<Option<_>>`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub assigned_to: Option<Option<MemberId>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub team_card: Option<Option<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    /// Read each key of a camelCase object on its own.
    ///
    /// A value that does not parse is logged and left out; the other keys
    /// still apply. Unknown keys are ignored.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            name: field(fields, "name"),
            description: field(fields, "description"),
            priority: field(fields, "priority"),
            status: field(fields, "status"),
            due_date: field(fields, "dueDate"),
            assigned_to: field(fields, "assignedTo"),
            team_card: field(fields, "teamCard"),
        }
    }
}

fn field<T: DeserializeOwned>(fields: &Map<String, Value>, key: &str) -> Option<T> {
    let value = fields.get(key)?;
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(field = key, error = %e, "patch field skipped");
            None
        }
    }
}

/// A key that is present (even as `null`) deserializes to `Some(..)`.
fn present<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}
