//! BoardState - tasks / assignments / members の入れ物
//!
//! client の replica と relay の canonical state の両方がこの型を使う。
//! グローバル変数ではなく、constructor に渡して所有させる。
//!
//! # 不変条件
//! - 3 つの map はすべて挿入順を保持する（snapshot の順序になる）
//! - 既存キーの上書きは位置を変えない
//! - assignment を消すときは task 側の `assigned_to` も消す

use indexmap::IndexMap;

use crate::domain::{
    Assignment, AssignmentEvent, DashboardData, MemberId, Snapshot, Task, TaskId, TaskPatch,
    TeamMember,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    tasks: IndexMap<TaskId, Task>,
    assignments: IndexMap<TaskId, Assignment>,
    members: IndexMap<MemberId, TeamMember>,
}

impl BoardState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_members(members: impl IntoIterator<Item = TeamMember>) -> Self {
        let mut state = Self::default();
        for member in members {
            state.members.insert(member.id.clone(), member);
        }
        state
    }

    /// Roster plus the four sample tasks.
    pub fn seeded() -> Self {
        crate::seed::board(true)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn assignment(&self, task_id: &TaskId) -> Option<&Assignment> {
        self.assignments.get(task_id)
    }

    pub fn member(&self, id: &MemberId) -> Option<&TeamMember> {
        self.members.get(id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments.values()
    }

    pub fn members(&self) -> impl Iterator<Item = &TeamMember> {
        self.members.values()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Overwrite (or insert) a task. Returns the previous value.
    pub fn upsert_task(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id.clone(), task)
    }

    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    /// Remove a task together with its assignment.
    pub fn remove_task(&mut self, id: &TaskId) -> Option<Task> {
        self.assignments.shift_remove(id);
        self.tasks.shift_remove(id)
    }

    /// Upsert, then bring the Assignment entry in line with `assigned_to`
    /// if the assignee or card differs from the stored task.
    pub fn put_task(&mut self, task: Task) -> Option<Task> {
        let id = task.id.clone();
        let moved = match self.tasks.get(&id) {
            Some(old) => !same_assignee(old, &task),
            None => task.assigned_to.is_some(),
        };
        let previous = self.upsert_task(task);
        if moved {
            self.sync_assignment(&id);
        }
        previous
    }

    /// Apply `patch` to a stored task; the Assignment entry follows as in
    /// [`BoardState::put_task`]. Returns the patched task.
    pub fn patch_task(&mut self, id: &TaskId, patch: &TaskPatch) -> Option<&Task> {
        let task = self.tasks.get_mut(id)?;
        let before = task.clone();
        task.apply_patch(patch);
        if !same_assignee(&before, task) {
            self.sync_assignment(id);
        }
        self.tasks.get(id)
    }

    /// Rebuild the Assignment entry from the task's `assigned_to` / `team_card`.
    ///
    /// Unassigned task: entry removed. Unknown task: no-op.
    pub fn sync_assignment(&mut self, task_id: &TaskId) {
        let Some(task) = self.tasks.get(task_id) else {
            return;
        };
        match &task.assigned_to {
            Some(member_id) => {
                let assignment =
                    Assignment::new(task_id.clone(), member_id.clone(), task.team_card.clone());
                self.assignments.insert(task_id.clone(), assignment);
            }
            None => {
                self.assignments.shift_remove(task_id);
            }
        }
    }

    /// Record an assignment and point the task (if known) at the member.
    pub fn set_assignment(&mut self, assignment: Assignment) {
        if let Some(task) = self.tasks.get_mut(&assignment.task_id) {
            task.assigned_to = Some(assignment.member_id.clone());
            task.team_card = assignment.task_card.clone();
        }
        self.assignments
            .insert(assignment.task_id.clone(), assignment);
    }

    /// Drop the assignment and clear the task's assignee and card.
    pub fn clear_assignment(&mut self, task_id: &TaskId) -> Option<Assignment> {
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.assigned_to = None;
            task.team_card = None;
        }
        self.assignments.shift_remove(task_id)
    }

    /// Apply a `taskAssignment` / `assignmentUpdated` payload.
    ///
    /// A removal still copies the event's card onto the task.
    pub fn apply_assignment_event(&mut self, event: &AssignmentEvent) {
        match event.to_assignment() {
            Some(assignment) => self.set_assignment(assignment),
            None => {
                self.clear_assignment(&event.task_id);
                if let Some(task) = self.tasks.get_mut(&event.task_id) {
                    task.team_card = event.task_card.clone();
                }
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tasks: pairs(&self.tasks),
            assignments: pairs(&self.assignments),
            team_members: pairs(&self.members),
        }
    }

    pub fn dashboard_data(&self) -> DashboardData {
        DashboardData {
            tasks: pairs(&self.tasks),
            assignments: pairs(&self.assignments),
        }
    }

    /// Replace everything with the contents of `snapshot`.
    pub fn replace_from(&mut self, snapshot: Snapshot) {
        self.members = snapshot.team_members.into_iter().collect();
        self.replace_entities(DashboardData {
            tasks: snapshot.tasks,
            assignments: snapshot.assignments,
        });
    }

    /// Replace tasks and assignments; members are kept.
    pub fn replace_entities(&mut self, data: DashboardData) {
        self.tasks = data.tasks.into_iter().collect();
        self.assignments = data.assignments.into_iter().collect();
    }

    /// Upsert every task and assignment in `data`. Nothing is removed.
    pub fn merge_entities(&mut self, data: DashboardData) {
        for (_, task) in data.tasks {
            self.upsert_task(task);
        }
        for (_, assignment) in data.assignments {
            self.set_assignment(assignment);
        }
    }
}

fn same_assignee(a: &Task, b: &Task) -> bool {
    a.assigned_to == b.assigned_to && a.team_card == b.team_card
}

fn pairs<K: Clone, V: Clone>(map: &IndexMap<K, V>) -> Vec<(K, V)> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Priority, Status};
    use chrono::NaiveDate;

    fn task(id: &str) -> Task {
        Task::new(
            TaskId::new(id),
            format!("Task {id}"),
            None,
            Priority::Low,
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
        )
    }

    fn board() -> BoardState {
        let mut state = BoardState::with_members([
            TeamMember::new("alice", "Alice Smith", "Frontend Developer"),
            TeamMember::new("bob", "Bob Johnson", "Backend Developer"),
        ]);
        state.upsert_task(task("t1"));
        state.upsert_task(task("t2"));
        state.upsert_task(task("t3"));
        state
    }

    #[test]
    fn overwrite_keeps_insertion_position() {
        let mut state = board();
        let mut updated = task("t1");
        updated.name = "Renamed".to_string();

        let previous = state.upsert_task(updated);

        assert_eq!(previous.unwrap().name, "Task t1");
        let ids: Vec<_> = state.tasks().map(|t| t.id.as_str().to_string()).collect();
        assert_eq!(ids, ["t1", "t2", "t3"]);
        assert_eq!(state.task(&TaskId::new("t1")).unwrap().name, "Renamed");
    }

    #[test]
    fn set_assignment_updates_task() {
        let mut state = board();
        state.set_assignment(Assignment::new(
            TaskId::new("t2"),
            MemberId::new("bob"),
            Some("card-x".to_string()),
        ));

        let t2 = state.task(&TaskId::new("t2")).unwrap();
        assert_eq!(t2.assigned_to, Some(MemberId::new("bob")));
        assert_eq!(t2.team_card.as_deref(), Some("card-x"));
        assert!(state.assignment(&TaskId::new("t2")).is_some());
    }

    #[test]
    fn assignment_for_unknown_task_is_still_recorded() {
        let mut state = board();
        state.set_assignment(Assignment::new(TaskId::new("ghost"), MemberId::new("bob"), None));

        assert!(state.assignment(&TaskId::new("ghost")).is_some());
        assert!(state.task(&TaskId::new("ghost")).is_none());
    }

    #[test]
    fn removal_event_clears_both_sides() {
        let mut state = board();
        state.set_assignment(Assignment::new(TaskId::new("t1"), MemberId::new("alice"), None));

        state.apply_assignment_event(&AssignmentEvent::removal(TaskId::new("t1")));

        assert!(state.assignment(&TaskId::new("t1")).is_none());
        assert_eq!(state.task(&TaskId::new("t1")).unwrap().assigned_to, None);
    }

    #[test]
    fn put_task_follows_assignee_changes() {
        let mut state = board();
        let id = TaskId::new("t1");
        state.set_assignment(Assignment::new(id.clone(), MemberId::new("bob"), None));

        let mut moved = state.task(&id).unwrap().clone();
        moved.assigned_to = Some(MemberId::new("alice"));
        moved.team_card = Some("card-a".to_string());
        state.put_task(moved.clone());

        let assignment = state.assignment(&id).unwrap();
        assert_eq!(assignment.member_id, MemberId::new("alice"));
        assert_eq!(assignment.task_card.as_deref(), Some("card-a"));

        moved.assigned_to = None;
        state.put_task(moved);
        assert!(state.assignment(&id).is_none());
    }

    #[test]
    fn unchanged_assignee_leaves_assignments_alone() {
        let mut state = board();
        let id = TaskId::new("t3");
        let mut seeded = task("t3");
        seeded.assigned_to = Some(MemberId::new("alice"));
        state.upsert_task(seeded.clone());

        seeded.name = "Renamed".to_string();
        state.put_task(seeded);
        state.patch_task(
            &id,
            &TaskPatch {
                status: Some(Status::Completed),
                ..TaskPatch::default()
            },
        );

        assert!(state.assignment(&id).is_none());
    }

    #[test]
    fn patch_task_clears_assignment_with_assignee() {
        let mut state = board();
        let id = TaskId::new("t2");
        state.set_assignment(Assignment::new(id.clone(), MemberId::new("bob"), None));

        let patched = state
            .patch_task(
                &id,
                &TaskPatch {
                    assigned_to: Some(None),
                    ..TaskPatch::default()
                },
            )
            .cloned();

        assert_eq!(patched.unwrap().assigned_to, None);
        assert!(state.assignment(&id).is_none());
    }

    #[test]
    fn remove_task_drops_its_assignment_and_keeps_order() {
        let mut state = board();
        state.set_assignment(Assignment::new(TaskId::new("t2"), MemberId::new("bob"), None));

        let removed = state.remove_task(&TaskId::new("t2"));

        assert!(removed.is_some());
        assert!(state.assignment(&TaskId::new("t2")).is_none());
        let ids: Vec<_> = state.tasks().map(|t| t.id.as_str().to_string()).collect();
        assert_eq!(ids, ["t1", "t3"]);
    }

    #[test]
    fn snapshot_round_trips_into_empty_state() {
        let mut state = board();
        state.set_assignment(Assignment::new(TaskId::new("t3"), MemberId::new("alice"), None));

        let mut replica = BoardState::empty();
        replica.replace_from(state.snapshot());

        assert_eq!(replica, state);
    }

    #[test]
    fn merge_entities_upserts_without_removing() {
        let mut state = board();
        let mut incoming = task("t9");
        incoming.name = "New".to_string();

        state.merge_entities(DashboardData {
            tasks: vec![(incoming.id.clone(), incoming)],
            assignments: vec![],
        });

        assert_eq!(state.task_count(), 4);
    }
}
