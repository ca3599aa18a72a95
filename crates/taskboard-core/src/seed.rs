//! Sample data loaded at process start.

use chrono::NaiveDate;

use crate::board::BoardState;
use crate::domain::{MemberId, Priority, Status, Task, TaskId, TeamMember};

/// The fixed team roster.
pub fn team_members() -> Vec<TeamMember> {
    vec![
        TeamMember::new("alice", "Alice Smith", "Frontend Developer"),
        TeamMember::new("bob", "Bob Johnson", "Backend Developer"),
        TeamMember::new("charlie", "Charlie Davis", "Full Stack Developer"),
        TeamMember::new("diana", "Diana Wilson", "DevOps Engineer"),
        TeamMember::new("eve", "Eve Brown", "UI/UX Designer"),
        TeamMember::new("frank", "Frank Miller", "Graphic Designer"),
        TeamMember::new("grace", "Grace Lee", "QA Engineer"),
        TeamMember::new("henry", "Henry Taylor", "Test Engineer"),
    ]
}

/// Four sample tasks, two of them already assigned.
pub fn sample_tasks() -> Vec<Task> {
    vec![
        sample(
            "task-1",
            "Implement Login System",
            "Create secure authentication system with JWT tokens",
            Priority::High,
            Status::InProgress,
            const { ymd(2024, 12, 20) },
            None,
        ),
        sample(
            "task-2",
            "Setup Database Schema",
            "Design and implement database structure",
            Priority::Medium,
            Status::NotStarted,
            const { ymd(2024, 12, 25) },
            None,
        ),
        sample(
            "task-3",
            "Design User Interface",
            "Create modern and responsive UI components",
            Priority::Low,
            Status::Completed,
            const { ymd(2024, 12, 15) },
            Some("eve"),
        ),
        sample(
            "task-4",
            "Bug Testing",
            "Comprehensive testing of all features",
            Priority::High,
            Status::InProgress,
            const { ymd(2024, 12, 30) },
            Some("grace"),
        ),
    ]
}

/// Members only, or members plus the sample tasks.
///
/// Seed tasks carry `assigned_to` but no Assignment entry.
pub fn board(with_sample_tasks: bool) -> BoardState {
    let mut state = BoardState::with_members(team_members());
    if with_sample_tasks {
        for task in sample_tasks() {
            state.upsert_task(task);
        }
    }
    state
}

fn sample(
    id: &str,
    name: &str,
    description: &str,
    priority: Priority,
    status: Status,
    due_date: NaiveDate,
    assigned_to: Option<&str>,
) -> Task {
    Task {
        id: TaskId::new(id),
        name: name.to_string(),
        description: Some(description.to_string()),
        priority,
        status,
        due_date,
        assigned_to: assigned_to.map(MemberId::new),
        team_card: Some(id.to_string()),
    }
}

/// Seed date, checked at compile time when used in a `const` block.
const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid seed date"),
    }
}
