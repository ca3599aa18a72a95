//! Coordinator - canonical state + broadcast
//!
//! # 設計
//! - canonical state は Coordinator だけが書き換える
//! - 呼び出しは 1 本のタスクから直列に行う（`RelayRuntime` 参照）。ロック不要
//! - バージョン管理なし。後から適用した更新が勝つ（last-applied-wins）
//!
//! # broadcast 範囲
//! - `dashboardDataUpdate`: 送信者以外
//! - それ以外（`assignmentUpdated`, `taskUpdated`, `taskCreated`, ...）: 送信者を含む全員

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::board::BoardState;
use crate::domain::{
    Assignment, AssignmentEvent, CalendarUpdate, ClientId, ClientMessage, DashboardData, NewTask,
    ServerMessage, Snapshot, StatusUpdate, Task, TaskId, TaskPatch, TaskRef, TaskUpdate,
};
use crate::error::BoardError;
use crate::ports::IdGenerator;

/// Outbound channel of one connected client.
///
/// Unbounded: frames for a peer that stops reading pile up here until it
/// disconnects.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// What the relay does with an inbound `dashboardData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPolicy {
    /// Forward verbatim to the other clients; canonical state is untouched.
    #[default]
    Relay,
    /// Upsert into canonical state, then forward canonical contents.
    Merge,
}

pub struct Coordinator {
    state: BoardState,
    clients: IndexMap<ClientId, Outbox>,
    ids: Arc<dyn IdGenerator>,
    snapshot_policy: SnapshotPolicy,
}

impl Coordinator {
    pub fn new(state: BoardState, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state,
            clients: IndexMap::new(),
            ids,
            snapshot_policy: SnapshotPolicy::default(),
        }
    }

    pub fn with_snapshot_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.snapshot_policy = policy;
        self
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn ids(&self) -> &Arc<dyn IdGenerator> {
        &self.ids
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn is_connected(&self, client_id: &ClientId) -> bool {
        self.clients.contains_key(client_id)
    }

    // ---- connection lifecycle ----

    /// Register a client and send it the full canonical snapshot.
    pub fn on_connect(&mut self, client_id: ClientId, outbox: Outbox) {
        info!(client = %client_id, clients = self.clients.len() + 1, "client connected");
        self.clients.insert(client_id, outbox);
        self.send(client_id, ServerMessage::InitialData(self.state.snapshot()));
    }

    /// Forget the client. Canonical state is not affected.
    pub fn on_disconnect(&mut self, client_id: ClientId) -> bool {
        let known = self.clients.shift_remove(&client_id).is_some();
        info!(client = %client_id, known, clients = self.clients.len(), "client disconnected");
        known
    }

    // ---- inbound events ----

    /// Route one inbound message to its handler.
    pub fn handle(&mut self, sender: ClientId, message: ClientMessage) {
        debug!(client = %sender, event = message.event_name(), "inbound");
        match message {
            ClientMessage::DashboardData(data) => self.on_dashboard_snapshot(sender, data),
            ClientMessage::TaskAssignment(event) => self.on_task_assignment(event),
            ClientMessage::TaskUpdate(update) => self.on_task_update(update),
            ClientMessage::TaskCreated(task) => self.on_task_created(task),
            ClientMessage::TaskStatusUpdate(update) => self.on_task_status_update(update),
            ClientMessage::CalendarUpdate(update) => self.on_calendar_update(update),
            ClientMessage::TaskDelete(task_ref) => self.on_task_delete(task_ref),
        }
    }

    pub fn on_dashboard_snapshot(&mut self, sender: ClientId, data: DashboardData) {
        let outgoing = match self.snapshot_policy {
            SnapshotPolicy::Relay => data,
            SnapshotPolicy::Merge => {
                self.state.merge_entities(data);
                self.state.dashboard_data()
            }
        };
        self.broadcast_except(sender, ServerMessage::DashboardDataUpdate(outgoing));
    }

    pub fn on_task_assignment(&mut self, event: AssignmentEvent) {
        self.state.apply_assignment_event(&event);
        self.broadcast(ServerMessage::AssignmentUpdated(event));
    }

    pub fn on_task_update(&mut self, update: TaskUpdate) {
        let task = match update {
            TaskUpdate::Full(task) => {
                self.state.put_task(task.clone());
                task
            }
            TaskUpdate::Partial(partial) => {
                match self.state.patch_task(&partial.id, &partial.patch).cloned() {
                    Some(task) => task,
                    None => {
                        warn!(task_id = %partial.id, "partial update for unknown task dropped");
                        return;
                    }
                }
            }
        };
        self.broadcast(ServerMessage::TaskUpdated(task));
    }

    pub fn on_task_created(&mut self, task: Task) {
        self.state.put_task(task.clone());
        self.broadcast(ServerMessage::TaskCreated(task));
    }

    pub fn on_task_status_update(&mut self, update: StatusUpdate) {
        let Some(task) = self.state.task_mut(&update.task_id) else {
            debug!(task_id = %update.task_id, "status update for unknown task ignored");
            return;
        };
        task.status = update.status;
        let task = task.clone();
        self.broadcast(ServerMessage::TaskUpdated(task));
    }

    pub fn on_calendar_update(&mut self, update: CalendarUpdate) {
        let Some(task) = self.state.task_mut(&update.task_id) else {
            debug!(task_id = %update.task_id, "calendar update for unknown task ignored");
            return;
        };
        task.due_date = update.due_date;
        let task = task.clone();
        self.broadcast(ServerMessage::TaskUpdated(task));
    }

    pub fn on_task_delete(&mut self, task_ref: TaskRef) {
        if self.state.remove_task(&task_ref.task_id).is_none() {
            debug!(task_id = %task_ref.task_id, "delete for unknown task ignored");
            return;
        }
        self.broadcast(ServerMessage::TaskDeleted(task_ref));
    }

    // ---- request/reply surface ----

    pub fn list(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// # Errors
    /// - `BoardError::Validation` when the name is blank.
    pub fn create_task(&mut self, new_task: NewTask) -> Result<Task, BoardError> {
        let name = new_task.name.trim();
        if name.is_empty() {
            return Err(BoardError::Validation("task name is required".to_string()));
        }
        let mut task = Task::new(
            self.ids.generate_task_id(),
            name,
            new_task.description.filter(|d| !d.trim().is_empty()),
            new_task.priority,
            new_task.due_date,
        );
        task.team_card = new_task.team_card;

        self.state.upsert_task(task.clone());
        self.broadcast(ServerMessage::TaskCreated(task.clone()));
        Ok(task)
    }

    /// # Errors
    /// - `BoardError::NotFound` for an unknown id.
    pub fn patch_task(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, BoardError> {
        let task = self
            .state
            .patch_task(id, &patch)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(id.clone()))?;
        self.broadcast(ServerMessage::TaskUpdated(task.clone()));
        Ok(task)
    }

    /// # Errors
    /// - `BoardError::NotFound` for an unknown id.
    pub fn delete_task(&mut self, id: &TaskId) -> Result<(), BoardError> {
        self.state
            .remove_task(id)
            .ok_or_else(|| BoardError::NotFound(id.clone()))?;
        self.broadcast(ServerMessage::TaskDeleted(TaskRef::new(id.clone())));
        Ok(())
    }

    pub fn put_assignment(&mut self, assignment: Assignment) -> Assignment {
        self.state.set_assignment(assignment.clone());
        self.broadcast(ServerMessage::AssignmentUpdated(assignment.clone().into()));
        assignment
    }

    pub fn remove_assignment(&mut self, task_id: &TaskId) {
        self.state.clear_assignment(task_id);
        self.broadcast(ServerMessage::AssignmentRemoved(TaskRef::new(task_id.clone())));
    }

    // ---- delivery ----

    fn send(&self, client_id: ClientId, message: ServerMessage) {
        if let Some(outbox) = self.clients.get(&client_id) {
            deliver(client_id, outbox, message);
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        debug!(event = message.event_name(), clients = self.clients.len(), "broadcast");
        for (client_id, outbox) in &self.clients {
            deliver(*client_id, outbox, message.clone());
        }
    }

    fn broadcast_except(&self, sender: ClientId, message: ServerMessage) {
        debug!(event = message.event_name(), except = %sender, "broadcast to others");
        for (client_id, outbox) in self.clients.iter().filter(|(id, _)| **id != sender) {
            deliver(*client_id, outbox, message.clone());
        }
    }
}

fn deliver(client_id: ClientId, outbox: &Outbox, message: ServerMessage) {
    if outbox.send(message).is_err() {
        debug!(client = %client_id, "outbox closed, message dropped");
    }
}
