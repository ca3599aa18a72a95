//! Snapshot - ordered `[key, value]` pairs, as sent in `initialData`.

use serde::{Deserialize, Serialize};

use super::assignment::Assignment;
use super::ids::{MemberId, TaskId};
use super::member::TeamMember;
use super::task::Task;

/// Full board state. Pairs are in the insertion order of the source maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tasks: Vec<(TaskId, Task)>,
    pub assignments: Vec<(TaskId, Assignment)>,
    pub team_members: Vec<(MemberId, TeamMember)>,
}

/// Tasks and assignments only (`dashboardData` / `dashboardDataUpdate`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub tasks: Vec<(TaskId, Task)>,
    #[serde(default)]
    pub assignments: Vec<(TaskId, Assignment)>,
}

impl From<Snapshot> for DashboardData {
    fn from(s: Snapshot) -> Self {
        Self {
            tasks: s.tasks,
            assignments: s.assignments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domain::Priority;

    #[test]
    fn pairs_serialize_as_two_element_arrays() {
        let task = Task::new(
            TaskId::new("task-1"),
            "Setup Database Schema",
            None,
            Priority::Medium,
            NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
        );
        let snapshot = Snapshot {
            tasks: vec![(task.id.clone(), task)],
            assignments: vec![],
            team_members: vec![(
                MemberId::new("bob"),
                TeamMember::new("bob", "Bob Johnson", "Backend Developer"),
            )],
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["tasks"][0][0], "task-1");
        assert_eq!(value["tasks"][0][1]["name"], "Setup Database Schema");
        assert_eq!(value["teamMembers"][0][1]["role"], "Backend Developer");
    }
}
