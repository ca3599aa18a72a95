//! ClientStore - 1 セッション分の replica
//!
//! # 流れ
//! 1. ローカル操作で replica を更新
//! 2. Emitter で relay に送る（応答は待たない）
//! 3. relay からの broadcast は `apply_server_message` で上書き適用
//!
//! # 方針
//! - 未知の task ID への操作は何もしない（`Delivery::NoOp`）
//! - 送信路が落ちていてもローカル更新は行う（`Delivery::Skipped`）
//! - remote の値は比較せずそのまま上書き（last-writer-wins）
//! - 画面は毎回 `BoardState` から作り直す。`revision` はその合図

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::board::BoardState;
use crate::domain::{
    AssignmentEvent, ClientMessage, MemberId, Priority, ServerMessage, Status, StatusUpdate, Task,
    TaskId, TaskRef, TaskUpdate,
};
use crate::error::BoardError;
use crate::ports::{Delivery, Emitter, IdGenerator};
use crate::views::{self, AssignmentPanel, RelationshipGraph, TaskRow};

/// Result of `create_task`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub task: Task,
    pub delivery: Delivery,
}

pub struct ClientStore<E> {
    state: BoardState,
    emitter: E,
    ids: Arc<dyn IdGenerator>,
    revision: u64,
}

impl<E: Emitter> ClientStore<E> {
    pub fn new(state: BoardState, emitter: E, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state,
            emitter,
            ids,
            revision: 0,
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    /// Bumped on every mutation, local or remote.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.state.task(id)
    }

    pub fn task_list(&self) -> Vec<TaskRow> {
        views::task_list(&self.state)
    }

    pub fn assignment_panel(&self) -> Vec<AssignmentPanel> {
        views::assignment_panel(&self.state)
    }

    pub fn relationship_graph(&self) -> RelationshipGraph {
        views::relationship_graph(&self.state)
    }

    // ---- local actions ----

    /// Create a task from the task form.
    ///
    /// # Errors
    /// - `BoardError::Validation` when `name` is blank. Nothing is inserted or sent.
    pub fn create_task(
        &mut self,
        name: &str,
        description: Option<String>,
        priority: Priority,
        due_date: NaiveDate,
    ) -> Result<Created, BoardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BoardError::Validation("task name is required".to_string()));
        }
        let description = description.filter(|d| !d.trim().is_empty());

        let task = Task::new(
            self.ids.generate_task_id(),
            name,
            description,
            priority,
            due_date,
        );
        self.state.upsert_task(task.clone());
        self.touch();

        let delivery = self.emit(ClientMessage::TaskCreated(task.clone()));
        Ok(Created { task, delivery })
    }

    /// Drop a task onto a member's card.
    pub fn assign(
        &mut self,
        task_id: &TaskId,
        member_id: MemberId,
        card_ref: Option<String>,
    ) -> Delivery {
        let Some(task) = self.state.task(task_id) else {
            debug!(task_id = %task_id, "assign: unknown task, ignoring");
            return Delivery::NoOp;
        };
        if let Some(previous) = task.assigned_to.clone()
            && previous != member_id
        {
            debug!(task_id = %task_id, from = %previous, to = %member_id, "reassigning");
            self.state.clear_assignment(task_id);
        }

        let event = AssignmentEvent::assign(task_id.clone(), member_id, card_ref);
        self.state.apply_assignment_event(&event);
        self.touch();
        self.emit(ClientMessage::TaskAssignment(event))
    }

    pub fn unassign(&mut self, task_id: &TaskId) -> Delivery {
        if self.state.task(task_id).is_none() {
            debug!(task_id = %task_id, "unassign: unknown task, ignoring");
            return Delivery::NoOp;
        }
        self.state.clear_assignment(task_id);
        self.touch();
        self.emit(ClientMessage::TaskAssignment(AssignmentEvent::removal(
            task_id.clone(),
        )))
    }

    /// Move a task on its calendar. Sends the whole task, not a delta.
    pub fn update_due_date(&mut self, task_id: &TaskId, due_date: NaiveDate) -> Delivery {
        let Some(task) = self.state.task_mut(task_id) else {
            debug!(task_id = %task_id, "update_due_date: unknown task, ignoring");
            return Delivery::NoOp;
        };
        task.due_date = due_date;
        let task = task.clone();
        self.touch();
        self.emit(ClientMessage::TaskUpdate(TaskUpdate::Full(task)))
    }

    pub fn update_status(&mut self, task_id: &TaskId, status: Status) -> Delivery {
        let Some(task) = self.state.task_mut(task_id) else {
            debug!(task_id = %task_id, "update_status: unknown task, ignoring");
            return Delivery::NoOp;
        };
        task.status = status;
        self.touch();
        self.emit(ClientMessage::TaskStatusUpdate(StatusUpdate {
            task_id: task_id.clone(),
            status,
        }))
    }

    pub fn delete_task(&mut self, task_id: &TaskId) -> Delivery {
        if self.state.remove_task(task_id).is_none() {
            debug!(task_id = %task_id, "delete_task: unknown task, ignoring");
            return Delivery::NoOp;
        }
        self.touch();
        self.emit(ClientMessage::TaskDelete(TaskRef::new(task_id.clone())))
    }

    /// Push the whole local replica (tasks + assignments) to the relay.
    pub fn sync_snapshot(&self) -> Delivery {
        self.emit(ClientMessage::DashboardData(self.state.dashboard_data()))
    }

    // ---- remote ----

    /// Overwrite the local task with the remote one. No comparison.
    pub fn apply_remote_task(&mut self, task: Task) {
        self.state.put_task(task);
        self.touch();
    }

    pub fn apply_remote_assignment(&mut self, event: AssignmentEvent) {
        self.state.apply_assignment_event(&event);
        self.touch();
    }

    pub fn apply_server_message(&mut self, message: ServerMessage) {
        debug!(event = message.event_name(), "applying server message");
        match message {
            ServerMessage::InitialData(snapshot) => {
                self.state.replace_from(snapshot);
                self.touch();
            }
            ServerMessage::DashboardDataUpdate(data) => {
                self.state.replace_entities(data);
                self.touch();
            }
            ServerMessage::AssignmentUpdated(event) => self.apply_remote_assignment(event),
            ServerMessage::AssignmentRemoved(TaskRef { task_id }) => {
                self.state.clear_assignment(&task_id);
                self.touch();
            }
            ServerMessage::TaskUpdated(task) | ServerMessage::TaskCreated(task) => {
                self.apply_remote_task(task)
            }
            ServerMessage::TaskDeleted(TaskRef { task_id }) => {
                self.state.remove_task(&task_id);
                self.touch();
            }
        }
    }

    fn emit(&self, message: ClientMessage) -> Delivery {
        let event = message.event_name();
        let delivery = Delivery::from_result(self.emitter.emit(message));
        match &delivery {
            Delivery::Skipped(e) => warn!(event, error = %e, "broadcast skipped"),
            _ => debug!(event, "emitted"),
        }
        delivery
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::ports::{FixedClock, TimestampIdGenerator};
    use crate::seed;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEmitter {
        sent: Mutex<Vec<ClientMessage>>,
        down: bool,
    }

    impl RecordingEmitter {
        fn down() -> Self {
            Self {
                down: true,
                ..Self::default()
            }
        }

        fn sent(&self) -> Vec<ClientMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Emitter for RecordingEmitter {
        fn emit(&self, message: ClientMessage) -> Result<(), TransportError> {
            if self.down {
                return Err(TransportError::Disconnected);
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn ids() -> Arc<dyn IdGenerator> {
        let at = Utc.with_ymd_and_hms(2024, 12, 1, 9, 0, 0).unwrap();
        Arc::new(TimestampIdGenerator::new(FixedClock::new(at)))
    }

    fn store() -> ClientStore<RecordingEmitter> {
        ClientStore::new(seed::board(true), RecordingEmitter::default(), ids())
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    #[test]
    fn create_task_inserts_not_started_unassigned_and_emits() {
        let mut store = store();
        let created = store
            .create_task("Write spec", None, Priority::Medium, date(10))
            .unwrap();

        assert!(created.task.id.as_str().starts_with("task-"));
        assert_eq!(created.task.status, Status::NotStarted);
        assert_eq!(created.task.assigned_to, None);
        assert_eq!(created.delivery, Delivery::Sent);
        assert_eq!(store.task(&created.task.id), Some(&created.task));
        assert_eq!(
            store.emitter().sent(),
            vec![ClientMessage::TaskCreated(created.task.clone())]
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_name_is_rejected_before_emitting(#[case] name: &str) {
        let mut store = store();
        let before = store.state().clone();

        let err = store
            .create_task(name, None, Priority::Low, date(1))
            .unwrap_err();

        assert!(matches!(err, BoardError::Validation(_)));
        assert_eq!(store.state(), &before);
        assert!(store.emitter().sent().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn two_creations_in_the_same_millisecond_get_distinct_ids() {
        let mut store = store();
        let a = store.create_task("A", None, Priority::Low, date(1)).unwrap();
        let b = store.create_task("B", None, Priority::Low, date(1)).unwrap();
        assert_ne!(a.task.id, b.task.id);
    }

    #[test]
    fn assign_then_unassign_scenario() {
        let mut store = store();
        let id = store
            .create_task("Write spec", None, Priority::Medium, date(10))
            .unwrap()
            .task
            .id;

        let delivery = store.assign(&id, MemberId::new("bob"), Some("card-x".to_string()));
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(store.task(&id).unwrap().assigned_to, Some(MemberId::new("bob")));
        let assignment = store.state().assignment(&id).unwrap();
        assert_eq!(assignment.member_id, MemberId::new("bob"));
        assert_eq!(assignment.task_card.as_deref(), Some("card-x"));

        store.unassign(&id);
        assert_eq!(store.task(&id).unwrap().assigned_to, None);
        assert!(store.state().assignment(&id).is_none());

        let last = store.emitter().sent().pop().unwrap();
        assert_eq!(
            last,
            ClientMessage::TaskAssignment(AssignmentEvent::removal(id.clone()))
        );
    }

    #[test]
    fn reassign_leaves_no_entry_for_the_previous_member() {
        let mut store = store();
        let id = TaskId::new("task-2");

        store.assign(&id, MemberId::new("alice"), Some("task-2".to_string()));
        store.assign(&id, MemberId::new("bob"), Some("task-2".to_string()));

        assert_eq!(store.task(&id).unwrap().assigned_to, Some(MemberId::new("bob")));
        assert!(
            store
                .state()
                .assignments()
                .all(|a| a.member_id != MemberId::new("alice"))
        );
    }

    #[test]
    fn unknown_task_is_a_silent_noop() {
        let mut store = store();
        let ghost = TaskId::new("ghost");

        assert_eq!(store.assign(&ghost, MemberId::new("bob"), None), Delivery::NoOp);
        assert_eq!(store.unassign(&ghost), Delivery::NoOp);
        assert_eq!(store.update_due_date(&ghost, date(3)), Delivery::NoOp);
        assert_eq!(store.update_status(&ghost, Status::Completed), Delivery::NoOp);
        assert_eq!(store.delete_task(&ghost), Delivery::NoOp);
        assert!(store.emitter().sent().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn update_due_date_sends_full_task() {
        let mut store = store();
        let id = TaskId::new("task-1");

        store.update_due_date(&id, date(31));

        let task = store.task(&id).unwrap().clone();
        assert_eq!(task.due_date, date(31));
        assert_eq!(
            store.emitter().sent(),
            vec![ClientMessage::TaskUpdate(TaskUpdate::Full(task))]
        );
    }

    #[test]
    fn disconnected_emitter_still_applies_locally() {
        let mut store = ClientStore::new(seed::board(true), RecordingEmitter::down(), ids());

        let created = store.create_task("Offline", None, Priority::High, date(2)).unwrap();
        assert_eq!(created.delivery, Delivery::Skipped(TransportError::Disconnected));
        assert!(store.task(&created.task.id).is_some());

        let delivery = store.assign(&created.task.id, MemberId::new("eve"), None);
        assert!(!delivery.is_sent());
        assert_eq!(
            store.task(&created.task.id).unwrap().assigned_to,
            Some(MemberId::new("eve"))
        );
    }

    #[test]
    fn applying_the_same_task_update_twice_is_idempotent() {
        let mut store = store();
        let mut remote = store.task(&TaskId::new("task-2")).unwrap().clone();
        remote.status = Status::Completed;

        store.apply_server_message(ServerMessage::TaskUpdated(remote.clone()));
        let once = store.state().clone();
        store.apply_server_message(ServerMessage::TaskUpdated(remote));

        assert_eq!(store.state(), &once);
    }

    #[test]
    fn remote_task_with_new_assignee_moves_the_assignment() {
        let mut store = store();
        let id = TaskId::new("task-1");
        store.apply_remote_assignment(AssignmentEvent::assign(
            id.clone(),
            MemberId::new("bob"),
            None,
        ));

        let mut remote = store.task(&id).unwrap().clone();
        remote.assigned_to = None;
        store.apply_server_message(ServerMessage::TaskUpdated(remote));

        assert!(store.state().assignment(&id).is_none());
    }

    #[test]
    fn initial_data_replaces_the_replica() {
        let canonical = seed::board(true);
        let mut store = ClientStore::new(BoardState::empty(), RecordingEmitter::default(), ids());

        store.apply_server_message(ServerMessage::InitialData(canonical.snapshot()));

        assert_eq!(store.state(), &canonical);
    }

    #[test]
    fn remote_deletion_and_assignment_removal_apply() {
        let mut store = store();
        store.apply_remote_assignment(AssignmentEvent::assign(
            TaskId::new("task-1"),
            MemberId::new("diana"),
            None,
        ));
        assert_eq!(
            store.task(&TaskId::new("task-1")).unwrap().assigned_to,
            Some(MemberId::new("diana"))
        );

        store.apply_server_message(ServerMessage::AssignmentRemoved(TaskRef::new(TaskId::new(
            "task-1",
        ))));
        assert_eq!(store.task(&TaskId::new("task-1")).unwrap().assigned_to, None);

        store.apply_server_message(ServerMessage::TaskDeleted(TaskRef::new(TaskId::new(
            "task-1",
        ))));
        assert!(store.task(&TaskId::new("task-1")).is_none());
    }

    #[test]
    fn sync_snapshot_sends_tasks_and_assignments() {
        let store = store();
        store.sync_snapshot();

        let sent = store.emitter().sent();
        let [ClientMessage::DashboardData(data)] = sent.as_slice() else {
            panic!("expected one dashboardData message");
        };
        assert_eq!(data.tasks.len(), 4);
    }
}
