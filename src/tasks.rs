//! Ordered task list with a single optional selection.

use crate::observe::{Observable, Subscription};
use crate::ports::TaskStore;
use crate::task::Task;
use std::rc::Rc;
use tracing::debug;
use uuid::Uuid;

/// Owns the task list and the selected task. Every mutation persists the
/// whole list through the [`TaskStore`].
pub struct TaskCoordinator {
    store: Rc<dyn TaskStore>,
    tasks: Observable<Vec<Task>>,
    selected: Observable<Option<Task>>,
}

impl TaskCoordinator {
    pub fn new(store: Rc<dyn TaskStore>) -> Self {
        let tasks = Observable::new(store.load());
        Self {
            store,
            tasks,
            selected: Observable::new(None),
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.get()
    }

    pub fn selected(&self) -> Option<Task> {
        self.selected.get()
    }

    pub fn find(&self, id: Uuid) -> Option<Task> {
        self.tasks.get().into_iter().find(|t| t.id == id)
    }

    pub fn subscribe_tasks(&self, callback: impl Fn(&Vec<Task>) + 'static) -> Subscription {
        self.tasks.subscribe(callback)
    }

    pub fn subscribe_selection(
        &self,
        callback: impl Fn(&Option<Task>) + 'static,
    ) -> Subscription {
        self.selected.subscribe(callback)
    }

    fn commit(&self, tasks: Vec<Task>) {
        self.store.save(&tasks);
        self.tasks.set(tasks);
    }

    fn selected_id(&self) -> Option<Uuid> {
        self.selected.get().map(|t| t.id)
    }

    /// Appends a new task. Blank titles are ignored.
    pub fn add(&self, title: &str, estimated_pomodoros: u32) -> Option<Task> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let task = Task::new(title, estimated_pomodoros);
        self.add_direct(task.clone());
        Some(task)
    }

    /// Appends a fully specified task, e.g. one produced by quick add.
    pub fn add_direct(&self, task: Task) {
        debug!(id = %task.id, title = %task.title, "task added");
        let mut tasks = self.tasks.get();
        tasks.push(task);
        self.commit(tasks);
    }

    /// Replaces the task with the same id, keeping its position.
    pub fn update(&self, task: Task) {
        let mut tasks = self.tasks.get();
        let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) else {
            return;
        };
        *slot = task.clone();
        self.commit(tasks);

        if self.selected_id() == Some(task.id) {
            self.selected.set(Some(task));
        }
    }

    pub fn delete(&self, task: &Task) {
        let mut tasks = self.tasks.get();
        tasks.retain(|t| t.id != task.id);
        self.commit(tasks);

        if self.selected_id() == Some(task.id) {
            self.selected.set(None);
        }
    }

    pub fn toggle_completion(&self, task: &Task) {
        self.update(task.with_completion(!task.is_completed));
    }

    pub fn increment_pomodoro(&self, task: &Task) {
        self.update(task.with_incremented_pomodoro());
    }

    /// Sets the selection. The task is not checked against the list.
    pub fn select(&self, task: Option<Task>) {
        self.selected.set(task);
    }

    /// Moves the tasks at `from` so they sit before the task currently at
    /// `to`, keeping their relative order. Out-of-range offsets are ignored.
    pub fn reorder(&self, from: &[usize], to: usize) {
        let mut tasks = self.tasks.get();
        let mut offsets: Vec<usize> = from.iter().copied().filter(|&i| i < tasks.len()).collect();
        offsets.sort_unstable();
        offsets.dedup();
        if offsets.is_empty() {
            return;
        }

        let to = to.min(tasks.len());
        let destination = to - offsets.iter().filter(|&&i| i < to).count();

        let mut moved = Vec::with_capacity(offsets.len());
        for &i in offsets.iter().rev() {
            moved.push(tasks.remove(i));
        }
        moved.reverse();

        tasks.splice(destination..destination, moved);
        self.commit(tasks);
    }

    /// Removes every completed task in one batch.
    pub fn clear_completed(&self) {
        let mut tasks = self.tasks.get();
        let selected = self.selected_id();
        let selection_cleared = tasks
            .iter()
            .any(|t| t.is_completed && Some(t.id) == selected);
        tasks.retain(|t| !t.is_completed);
        self.commit(tasks);

        if selection_cleared {
            self.selected.set(None);
        }
    }

    /// Replaces the whole list, e.g. when restoring a backup. The selection
    /// is dropped since it may not exist in the new list.
    pub fn replace_all(&self, tasks: Vec<Task>) {
        debug!(count = tasks.len(), "task list replaced");
        self.commit(tasks);
        self.selected.set(None);
    }

    pub fn pending(&self) -> Vec<Task> {
        self.tasks.get().into_iter().filter(|t| !t.is_completed).collect()
    }

    pub fn completed(&self) -> Vec<Task> {
        self.tasks.get().into_iter().filter(|t| t.is_completed).collect()
    }

    /// Estimated pomodoros still ahead across open tasks.
    pub fn total_estimated(&self) -> u32 {
        self.pending().iter().map(|t| t.estimated_pomodoros).sum()
    }

    pub fn total_completed(&self) -> u32 {
        self.tasks.get().iter().map(|t| t.completed_pomodoros).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::SqliteStore;
    use crate::task::Priority;

    fn coordinator() -> (TaskCoordinator, Rc<SqliteStore>) {
        let store = Rc::new(SqliteStore::in_memory().unwrap());
        (TaskCoordinator::new(store.clone()), store)
    }

    fn titles(coordinator: &TaskCoordinator) -> Vec<String> {
        coordinator.tasks().into_iter().map(|t| t.title).collect()
    }

    #[test]
    fn test_add_trims_and_persists() {
        let (tasks, store) = coordinator();
        let task = tasks.add("  Write report ", 3).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(TaskStore::load(store.as_ref()), vec![task]);
    }

    #[test]
    fn test_add_blank_title_is_ignored() {
        let (tasks, _store) = coordinator();
        tasks.add("First", 1);
        let before = tasks.tasks();
        assert!(tasks.add("  ", 1).is_none());
        assert!(tasks.add("\n\t", 2).is_none());
        assert_eq!(tasks.tasks(), before);
    }

    #[test]
    fn test_update_keeps_position_and_refreshes_selection() {
        let (tasks, _store) = coordinator();
        tasks.add("A", 1);
        let b = tasks.add("B", 1).unwrap();
        tasks.add("C", 1);
        tasks.select(Some(b.clone()));

        let renamed = b.with_updates(Some("B2".to_string()), None, None, None);
        tasks.update(renamed.clone());

        assert_eq!(titles(&tasks), vec!["A", "B2", "C"]);
        assert_eq!(tasks.selected(), Some(renamed));
    }

    #[test]
    fn test_update_unknown_task_is_ignored() {
        let (tasks, _store) = coordinator();
        tasks.add("A", 1);
        let before = tasks.tasks();
        tasks.update(Task::new("Stranger", 1));
        assert_eq!(tasks.tasks(), before);
    }

    #[test]
    fn test_delete_selected_clears_selection() {
        let (tasks, _store) = coordinator();
        let a = tasks.add("A", 1).unwrap();
        let b = tasks.add("B", 1).unwrap();
        tasks.select(Some(a.clone()));

        tasks.delete(&b);
        assert_eq!(tasks.selected(), Some(a.clone()));

        tasks.delete(&a);
        assert!(tasks.selected().is_none());
        assert!(tasks.tasks().is_empty());
    }

    #[test]
    fn test_toggle_completion() {
        let (tasks, _store) = coordinator();
        let a = tasks.add("A", 1).unwrap();
        tasks.toggle_completion(&a);
        let done = tasks.find(a.id).unwrap();
        assert!(done.is_completed);
        assert!(done.completed_at.is_some());

        tasks.toggle_completion(&done);
        let reopened = tasks.find(a.id).unwrap();
        assert!(!reopened.is_completed);
        assert!(reopened.completed_at.is_none());
    }

    #[test]
    fn test_increment_pomodoro() {
        let (tasks, _store) = coordinator();
        let a = tasks.add("A", 2).unwrap();
        tasks.select(Some(a.clone()));
        tasks.increment_pomodoro(&a);

        assert_eq!(tasks.find(a.id).unwrap().completed_pomodoros, 1);
        assert_eq!(tasks.selected().unwrap().completed_pomodoros, 1);
        assert_eq!(tasks.total_completed(), 1);
    }

    #[test]
    fn test_reorder_single_item() {
        let (tasks, _store) = coordinator();
        for t in ["A", "B", "C", "D"] {
            tasks.add(t, 1);
        }
        // Move A to the end
        tasks.reorder(&[0], 4);
        assert_eq!(titles(&tasks), vec!["B", "C", "D", "A"]);

        // Move A back to the front
        tasks.reorder(&[3], 0);
        assert_eq!(titles(&tasks), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_reorder_scattered_items_keeps_relative_order() {
        let (tasks, _store) = coordinator();
        for t in ["A", "B", "C", "D", "E"] {
            tasks.add(t, 1);
        }
        tasks.reorder(&[3, 0], 2);
        assert_eq!(titles(&tasks), vec!["B", "A", "D", "C", "E"]);

        tasks.reorder(&[9], 0);
        assert_eq!(titles(&tasks), vec!["B", "A", "D", "C", "E"]);
    }

    #[test]
    fn test_clear_completed() {
        let (tasks, store) = coordinator();
        let a = tasks.add("A", 1).unwrap();
        let b = tasks.add("B", 1).unwrap();
        tasks.add("C", 1);
        tasks.toggle_completion(&a);
        tasks.toggle_completion(&b);
        tasks.select(tasks.find(b.id));

        tasks.clear_completed();
        assert_eq!(titles(&tasks), vec!["C"]);
        assert!(tasks.selected().is_none());
        assert_eq!(TaskStore::load(store.as_ref()).len(), 1);
    }

    #[test]
    fn test_clear_completed_keeps_open_selection() {
        let (tasks, _store) = coordinator();
        let a = tasks.add("A", 1).unwrap();
        let b = tasks.add("B", 1).unwrap();
        tasks.toggle_completion(&a);
        tasks.select(Some(b.clone()));

        tasks.clear_completed();
        assert_eq!(tasks.selected(), Some(b));
    }

    #[test]
    fn test_totals() {
        let (tasks, _store) = coordinator();
        let a = tasks.add("A", 3).unwrap();
        tasks.add("B", 2);
        tasks.toggle_completion(&a);

        assert_eq!(tasks.pending().len(), 1);
        assert_eq!(tasks.completed().len(), 1);
        assert_eq!(tasks.total_estimated(), 2);
    }

    #[test]
    fn test_replace_all_drops_selection() {
        let (tasks, store) = coordinator();
        let a = tasks.add("A", 1).unwrap();
        tasks.select(Some(a));

        tasks.replace_all(vec![Task::new("Restored", 2)]);
        assert_eq!(titles(&tasks), vec!["Restored"]);
        assert!(tasks.selected().is_none());
        assert_eq!(TaskStore::load(store.as_ref()).len(), 1);
    }

    #[test]
    fn test_loads_existing_tasks() {
        let store = Rc::new(SqliteStore::in_memory().unwrap());
        TaskStore::save(store.as_ref(), &[Task::new("Saved", 1)]);
        let tasks = TaskCoordinator::new(store);
        assert_eq!(titles(&tasks), vec!["Saved"]);
    }
}
