//! Views derived from a `BoardState`.
//!
//! Every function here is a pure function of the current maps. Callers
//! re-derive after each mutation instead of patching a previous result.

use chrono::NaiveDate;
use serde::Serialize;

use crate::board::BoardState;
use crate::domain::member::initials;
use crate::domain::{MemberId, Priority, Status, Task, TaskId};

/// One row of the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub id: TaskId,
    pub name: String,
    pub priority: Priority,
    pub status: Status,
    pub status_label: &'static str,
    pub due_date: NaiveDate,
    pub assignee: Option<String>,
}

/// Tasks currently assigned to one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPanel {
    pub member_id: MemberId,
    pub member_name: String,
    pub tasks: Vec<TaskId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Member,
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub tooltip: String,
}

/// member -> task edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
}

/// Nodes and links for the relationship diagram. Layout is the renderer's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

/// One calendar entry (a task's due date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: TaskId,
    pub title: String,
    pub start: NaiveDate,
    pub color: &'static str,
}

pub fn task_list(state: &BoardState) -> Vec<TaskRow> {
    state
        .tasks()
        .map(|task| TaskRow {
            id: task.id.clone(),
            name: task.name.clone(),
            priority: task.priority,
            status: task.status,
            status_label: task.status.label(),
            due_date: task.due_date,
            assignee: task
                .assigned_to
                .as_ref()
                .map(|m| state.member(m).map_or_else(|| m.to_string(), |mm| mm.name.clone())),
        })
        .collect()
}

pub fn assignment_panel(state: &BoardState) -> Vec<AssignmentPanel> {
    state
        .members()
        .map(|member| AssignmentPanel {
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            tasks: state
                .tasks()
                .filter(|t| t.assigned_to.as_ref() == Some(&member.id))
                .map(|t| t.id.clone())
                .collect(),
        })
        .collect()
}

pub fn relationship_graph(state: &BoardState) -> RelationshipGraph {
    let mut graph = RelationshipGraph::default();

    for member in state.members() {
        let assigned = state
            .tasks()
            .filter(|t| t.assigned_to.as_ref() == Some(&member.id))
            .count();
        graph.nodes.push(GraphNode {
            id: member.id.to_string(),
            label: member.initials(),
            kind: NodeKind::Member,
            tooltip: format!(
                "{} ({})\nAssigned tasks: {}",
                member.name, member.role, assigned
            ),
        });
    }

    for task in state.tasks() {
        let Some(member_id) = &task.assigned_to else {
            continue;
        };
        graph.nodes.push(GraphNode {
            id: task.id.to_string(),
            label: initials(&task.name),
            kind: NodeKind::Task,
            tooltip: format!(
                "{}\nPriority: {}\nStatus: {}",
                task.name, task.priority, task.status
            ),
        });
        graph.links.push(GraphLink {
            source: member_id.to_string(),
            target: task.id.to_string(),
        });
    }

    graph
}

pub fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "#ef4444",
        Priority::Medium => "#f59e0b",
        Priority::Low => "#10b981",
    }
}

pub fn calendar_events(task: &Task) -> Vec<CalendarEvent> {
    vec![CalendarEvent {
        id: task.id.clone(),
        title: task.name.clone(),
        start: task.due_date,
        color: priority_color(task.priority),
    }]
}
