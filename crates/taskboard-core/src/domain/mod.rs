//! Domain model: tasks, members, assignments, snapshots and wire events.

pub mod assignment;
pub mod events;
pub mod ids;
pub mod member;
pub mod snapshot;
pub mod task;

pub use assignment::{Assignment, AssignmentEvent};
pub use events::{
    CalendarUpdate, ClientMessage, PartialTask, ServerMessage, StatusUpdate, TaskRef, TaskUpdate,
    decode_frame, encode_frame,
};
pub use ids::{ClientId, MemberId, TaskId};
pub use member::TeamMember;
pub use snapshot::{DashboardData, Snapshot};
pub use task::{NewTask, Priority, Status, Task, TaskPatch};
