//! Events - wire messages between clients and the relay.
//!
//! すべてのメッセージは `{"event": "<name>", "data": <payload>}` という形。
//! イベント名は camelCase（`taskAssignment`, `assignmentUpdated`, ...）。
//!
//! # 方向
//! - `ClientMessage`: client -> relay
//! - `ServerMessage`: relay -> client

use chrono::NaiveDate;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::assignment::AssignmentEvent;
use super::ids::TaskId;
use super::snapshot::{DashboardData, Snapshot};
use super::task::{Status, Task, TaskPatch};
use crate::error::BoardError;

/// Messages a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Whole local replica, sent once at startup.
    DashboardData(DashboardData),
    TaskAssignment(AssignmentEvent),
    TaskUpdate(TaskUpdate),
    TaskCreated(Task),
    TaskStatusUpdate(StatusUpdate),
    CalendarUpdate(CalendarUpdate),
    TaskDelete(TaskRef),
}

impl ClientMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::DashboardData(_) => "dashboardData",
            ClientMessage::TaskAssignment(_) => "taskAssignment",
            ClientMessage::TaskUpdate(_) => "taskUpdate",
            ClientMessage::TaskCreated(_) => "taskCreated",
            ClientMessage::TaskStatusUpdate(_) => "taskStatusUpdate",
            ClientMessage::CalendarUpdate(_) => "calendarUpdate",
            ClientMessage::TaskDelete(_) => "taskDelete",
        }
    }
}

/// Messages the relay sends to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    InitialData(Snapshot),
    DashboardDataUpdate(DashboardData),
    AssignmentUpdated(AssignmentEvent),
    AssignmentRemoved(TaskRef),
    TaskUpdated(Task),
    TaskCreated(Task),
    TaskDeleted(TaskRef),
}

impl ServerMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::InitialData(_) => "initialData",
            ServerMessage::DashboardDataUpdate(_) => "dashboardDataUpdate",
            ServerMessage::AssignmentUpdated(_) => "assignmentUpdated",
            ServerMessage::AssignmentRemoved(_) => "assignmentRemoved",
            ServerMessage::TaskUpdated(_) => "taskUpdated",
            ServerMessage::TaskCreated(_) => "taskCreated",
            ServerMessage::TaskDeleted(_) => "taskDeleted",
        }
    }
}

/// `taskUpdate` payload.
///
/// Normally a full task. An object that is not a valid task but still carries
/// a string `id` is accepted as a field-by-field patch
/// (see [`TaskPatch::from_fields`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TaskUpdate {
    Full(Task),
    Partial(PartialTask),
}

impl TaskUpdate {
    pub fn task_id(&self) -> &TaskId {
        match self {
            TaskUpdate::Full(task) => &task.id,
            TaskUpdate::Partial(partial) => &partial.id,
        }
    }
}

impl<'de> Deserialize<'de> for TaskUpdate {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(de)?;
        if let Ok(task) = Task::deserialize(&value) {
            return Ok(TaskUpdate::Full(task));
        }
        let Value::Object(fields) = value else {
            return Err(D::Error::custom("taskUpdate payload is not an object"));
        };
        let Some(Value::String(id)) = fields.get("id") else {
            return Err(D::Error::custom("taskUpdate payload has no string `id`"));
        };
        Ok(TaskUpdate::Partial(PartialTask {
            id: TaskId::new(id.as_str()),
            patch: TaskPatch::from_fields(&fields),
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialTask {
    pub id: TaskId,
    #[serde(flatten)]
    pub patch: TaskPatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub task_id: TaskId,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarUpdate {
    pub task_id: TaskId,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRef {
    pub task_id: TaskId,
}

impl TaskRef {
    pub fn new(task_id: TaskId) -> Self {
        Self { task_id }
    }
}

/// Encode one message as a single JSON line (no trailing newline).
pub fn encode_frame<T: Serialize>(message: &T) -> Result<String, BoardError> {
    Ok(serde_json::to_string(message)?)
}

/// Decode one JSON frame. Surrounding whitespace is allowed; bytes that are
/// not UTF-8 are a `Decode` error.
pub fn decode_frame<T: DeserializeOwned>(frame: impl AsRef<[u8]>) -> Result<T, BoardError> {
    Ok(serde_json::from_slice(frame.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MemberId, Priority};
    use rstest::rstest;
    use serde_json::json;

    fn task() -> Task {
        Task::new(
            TaskId::new("task-2"),
            "Setup Database Schema",
            None,
            Priority::Medium,
            NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
        )
    }

    #[test]
    fn client_message_is_adjacently_tagged() {
        let msg = ClientMessage::TaskAssignment(AssignmentEvent::assign(
            TaskId::new("task-2"),
            MemberId::new("bob"),
            Some("card-x".to_string()),
        ));
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["event"], "taskAssignment");
        assert_eq!(value["data"]["memberId"], "bob");
        assert_eq!(value["data"]["taskCard"], "card-x");
        assert_eq!(msg.event_name(), "taskAssignment");
    }

    #[test]
    fn server_event_names_match_serde_tags() {
        let msgs = vec![
            ServerMessage::InitialData(Snapshot::default()),
            ServerMessage::DashboardDataUpdate(DashboardData::default()),
            ServerMessage::AssignmentUpdated(AssignmentEvent::removal(TaskId::new("t"))),
            ServerMessage::AssignmentRemoved(TaskRef::new(TaskId::new("t"))),
            ServerMessage::TaskUpdated(task()),
            ServerMessage::TaskCreated(task()),
            ServerMessage::TaskDeleted(TaskRef::new(TaskId::new("t"))),
        ];
        for msg in msgs {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["event"], msg.event_name());
        }
    }

    #[test]
    fn full_task_update_decodes_as_full() {
        let frame = json!({ "event": "taskUpdate", "data": task() }).to_string();
        let msg: ClientMessage = decode_frame(&frame).unwrap();

        assert!(matches!(msg, ClientMessage::TaskUpdate(TaskUpdate::Full(t)) if t == task()));
    }

    #[test]
    fn partial_task_update_decodes_as_patch() {
        let frame = r#"{"event":"taskUpdate","data":{"id":"task-2","status":"completed"}}"#;
        let msg: ClientMessage = decode_frame(frame).unwrap();

        let ClientMessage::TaskUpdate(TaskUpdate::Partial(partial)) = msg else {
            panic!("expected a partial update");
        };
        assert_eq!(partial.id.as_str(), "task-2");
        assert_eq!(partial.patch.status, Some(Status::Completed));
        assert_eq!(partial.patch.name, None);
    }

    #[rstest]
    #[case::bad_priority(
        r#"{"id":"task-2","status":"completed","priority":"urgent"}"#,
        Some(Status::Completed),
        None
    )]
    #[case::bad_status(
        r#"{"id":"task-2","status":"done","priority":"high"}"#,
        None,
        Some(Priority::High)
    )]
    #[case::bad_date(
        r#"{"id":"task-2","status":"completed","dueDate":"tomorrow"}"#,
        Some(Status::Completed),
        None
    )]
    fn partial_update_keeps_valid_fields(
        #[case] data: &str,
        #[case] status: Option<Status>,
        #[case] priority: Option<Priority>,
    ) {
        let frame = format!(r#"{{"event":"taskUpdate","data":{data}}}"#);
        let msg: ClientMessage = decode_frame(&frame).unwrap();

        let ClientMessage::TaskUpdate(TaskUpdate::Partial(partial)) = msg else {
            panic!("expected a partial update");
        };
        assert_eq!(partial.id.as_str(), "task-2");
        assert_eq!(partial.patch.status, status);
        assert_eq!(partial.patch.priority, priority);
        assert_eq!(partial.patch.due_date, None);
    }

    #[test]
    fn partial_update_reads_null_as_clear() {
        let frame = r#"{"event":"taskUpdate","data":{"id":"task-2","assignedTo":null,"teamCard":"c"}}"#;
        let msg: ClientMessage = decode_frame(frame).unwrap();

        let ClientMessage::TaskUpdate(TaskUpdate::Partial(partial)) = msg else {
            panic!("expected a partial update");
        };
        assert_eq!(partial.patch.assigned_to, Some(None));
        assert_eq!(partial.patch.team_card, Some(Some("c".to_string())));
        assert_eq!(partial.patch.description, None);
    }

    #[rstest]
    #[case::no_id(r#"{"event":"taskUpdate","data":{"status":"completed"}}"#)]
    #[case::numeric_id(r#"{"event":"taskUpdate","data":{"id":7,"status":"completed"}}"#)]
    #[case::not_an_object(r#"{"event":"taskUpdate","data":"task-2"}"#)]
    fn task_update_without_usable_id_is_rejected(#[case] frame: &str) {
        let err = decode_frame::<ClientMessage>(frame).unwrap_err();
        assert!(matches!(err, BoardError::Decode(_)));
    }

    #[test]
    fn non_utf8_frame_is_a_decode_error() {
        let err = decode_frame::<ClientMessage>(b"\xff\xfe{}".as_slice()).unwrap_err();
        assert!(matches!(err, BoardError::Decode(_)));
    }

    #[test]
    fn garbage_frame_is_a_decode_error() {
        let err = decode_frame::<ClientMessage>("{not json").unwrap_err();
        assert!(matches!(err, BoardError::Decode(_)));

        let err = decode_frame::<ClientMessage>(r#"{"event":"nope","data":{}}"#).unwrap_err();
        assert!(matches!(err, BoardError::Decode(_)));
    }

    #[test]
    fn frames_round_trip_through_encode() {
        let msg = ServerMessage::TaskDeleted(TaskRef::new(TaskId::new("task-4")));
        let line = encode_frame(&msg).unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(decode_frame::<ServerMessage>(&line).unwrap(), msg);
    }
}
