use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use super::event::{ListenerId, TaskEvent, TaskModelListener};
use super::task::{
    HighlightingType, Task, TaskId, TaskPriority, find_task_in_list, find_task_mut_in_list,
};

/// Error type for store operations
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("parent task not found: {0}")]
    ParentNotFound(TaskId),
    #[error("cannot move task {task} under {parent}: it is the task itself or one of its sub-tasks")]
    CycleDetected { task: TaskId, parent: TaskId },
}

/// Field values for a task about to be created
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: Option<String>,
    pub priority: TaskPriority,
    pub estimated_time: u64,
    pub actual_time: u64,
    /// Epoch milliseconds; `None` stamps the current time
    pub creation_time: Option<i64>,
    pub completed: bool,
    pub highlighted: bool,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        NewTask {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn estimated(mut self, ms: u64) -> Self {
        self.estimated_time = ms;
        self
    }
}

/// The single owning collection of tasks for a session.
///
/// All mutation goes through here so change notification stays in one place.
/// Listeners run synchronously, in registration order, with a shared borrow
/// of the store.
#[derive(Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: u64,
    listeners: Vec<(ListenerId, Rc<RefCell<dyn TaskModelListener>>)>,
    next_listener_id: u64,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Number of top-level tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Top-level tasks in display order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_at(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Find a task anywhere in the tree
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        find_task_in_list(&self.tasks, id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// The list the task lives in: its parent's sub-tasks, or the top level.
    pub fn siblings(&self, id: TaskId) -> Option<&[Task]> {
        let task = self.get(id)?;
        match task.parent() {
            None => Some(&self.tasks),
            Some(parent) => self.get(parent).map(Task::subtasks),
        }
    }

    /// Position of the task within its sibling list
    pub fn index_in_parent(&self, id: TaskId) -> Option<usize> {
        self.siblings(id)?.iter().position(|t| t.id() == id)
    }

    pub fn can_move_up(&self, id: TaskId) -> bool {
        matches!(self.index_in_parent(id), Some(i) if i > 0)
    }

    pub fn can_move_down(&self, id: TaskId) -> bool {
        match (self.index_in_parent(id), self.siblings(id)) {
            (Some(i), Some(siblings)) => i + 1 < siblings.len(),
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    pub fn add_change_listener(&mut self, listener: Rc<RefCell<dyn TaskModelListener>>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns false when the id was not registered
    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn fire(&self, event: TaskEvent) {
        trace!(?event, listeners = self.listeners.len(), "dispatching task event");
        for (_, listener) in &self.listeners {
            listener.borrow_mut().handle_task_event(self, &event);
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Create a task under `parent` (or at the top level) and fire `Added`.
    pub fn add_task(&mut self, parent: Option<TaskId>, new: NewTask) -> Result<TaskId, TaskError> {
        if let Some(p) = parent
            && !self.contains(p)
        {
            return Err(TaskError::ParentNotFound(p));
        }

        let id = self.issue_id();
        let mut task = Task::new(id, new.title, new.priority);
        task.set_estimated_time(new.estimated_time);
        task.set_actual_time(new.actual_time);
        if let Some(created) = new.creation_time {
            task.set_creation_time(created);
        }
        task.set_completed(new.completed);
        task.set_highlighted(new.highlighted);
        task.set_parent(parent);

        self.attach(parent, task)?;
        debug!(task = %id, parent = ?parent, "task added");

        self.fire(TaskEvent::Added(id));
        Ok(id)
    }

    /// Update title, priority and estimate, moving the task under
    /// `new_parent` when that differs from its current parent.
    ///
    /// A new parent inside the task's own subtree is rejected before any
    /// event fires.
    pub fn update_task(
        &mut self,
        id: TaskId,
        new_parent: Option<TaskId>,
        title: Option<String>,
        priority: TaskPriority,
        estimated_time: u64,
    ) -> Result<(), TaskError> {
        let task = self.get(id).ok_or(TaskError::NotFound(id))?;
        let old_parent = task.parent();
        if let Some(p) = new_parent {
            if task.contains(p) {
                return Err(TaskError::CycleDetected { task: id, parent: p });
            }
            if !self.contains(p) {
                return Err(TaskError::ParentNotFound(p));
            }
        }

        self.fire(TaskEvent::PreChanged(id));

        let task = self.task_mut(id)?;
        task.set_title(title);
        task.set_priority(priority);
        task.set_estimated_time(estimated_time);

        if new_parent != old_parent {
            let mut moved = self.detach(id)?;
            moved.set_parent(new_parent);
            self.attach(new_parent, moved)?;
            debug!(task = %id, from = ?old_parent, to = ?new_parent, "task moved");
        }

        self.fire(TaskEvent::Changed(id));
        Ok(())
    }

    /// Remove a task together with its whole subtree.
    ///
    /// Only one `PreDeleted`/`Deleted` pair fires, for the subtree root.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Task, TaskError> {
        if !self.contains(id) {
            return Err(TaskError::NotFound(id));
        }
        self.fire(TaskEvent::PreDeleted(id));
        let removed = self.detach(id)?;
        debug!(task = %id, "task deleted");
        self.fire(TaskEvent::Deleted(id));
        Ok(removed)
    }

    /// Set the completion flag. Whether the task may be completed (it must be
    /// a leaf) is the caller's concern.
    pub fn complete_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.change_task(id, |t| t.set_completed(true))
    }

    pub fn uncomplete_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.change_task(id, |t| t.set_completed(false))
    }

    pub fn highlight_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.change_task(id, |t| t.set_highlighted(true))
    }

    pub fn unhighlight_task(&mut self, id: TaskId) -> Result<(), TaskError> {
        self.change_task(id, |t| t.set_highlighted(false))
    }

    pub fn update_actual_time(&mut self, id: TaskId, ms: u64) -> Result<(), TaskError> {
        self.change_task(id, |t| t.set_actual_time(ms))
    }

    pub fn set_task_highlighting_type(
        &mut self,
        id: TaskId,
        kind: HighlightingType,
    ) -> Result<(), TaskError> {
        self.change_task(id, |t| t.set_highlighting_type(kind))
    }

    /// Swap with the previous sibling. Returns false (and fires nothing) at
    /// the first position.
    pub fn move_up(&mut self, id: TaskId) -> Result<bool, TaskError> {
        let index = self.index_in_parent(id).ok_or(TaskError::NotFound(id))?;
        if index == 0 {
            return Ok(false);
        }
        self.swap_siblings(id, index - 1, index)?;
        Ok(true)
    }

    /// Swap with the next sibling. Returns false at the last position.
    pub fn move_down(&mut self, id: TaskId) -> Result<bool, TaskError> {
        if !self.can_move_down(id) {
            return if self.contains(id) {
                Ok(false)
            } else {
                Err(TaskError::NotFound(id))
            };
        }
        let index = self.index_in_parent(id).ok_or(TaskError::NotFound(id))?;
        self.swap_siblings(id, index, index + 1)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn issue_id(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId(self.next_id)
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, TaskError> {
        find_task_mut_in_list(&mut self.tasks, id).ok_or(TaskError::NotFound(id))
    }

    fn container_mut(&mut self, parent: Option<TaskId>) -> Option<&mut Vec<Task>> {
        match parent {
            None => Some(&mut self.tasks),
            Some(p) => find_task_mut_in_list(&mut self.tasks, p).map(Task::subtasks_mut),
        }
    }

    /// Append a task to the end of `parent`'s sub-tasks, or the top level.
    fn attach(&mut self, parent: Option<TaskId>, task: Task) -> Result<(), TaskError> {
        match parent {
            None => self.tasks.push(task),
            Some(p) => find_task_mut_in_list(&mut self.tasks, p)
                .ok_or(TaskError::ParentNotFound(p))?
                .subtasks_mut()
                .push(task),
        }
        Ok(())
    }

    /// Take a task out of whatever list holds it.
    fn detach(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let parent = self.get(id).ok_or(TaskError::NotFound(id))?.parent();
        let list = self.container_mut(parent).ok_or(TaskError::NotFound(id))?;
        let index = list
            .iter()
            .position(|t| t.id() == id)
            .ok_or(TaskError::NotFound(id))?;
        Ok(list.remove(index))
    }

    fn change_task(&mut self, id: TaskId, apply: impl FnOnce(&mut Task)) -> Result<(), TaskError> {
        if !self.contains(id) {
            return Err(TaskError::NotFound(id));
        }
        self.fire(TaskEvent::PreChanged(id));
        apply(self.task_mut(id)?);
        self.fire(TaskEvent::Changed(id));
        Ok(())
    }

    fn swap_siblings(&mut self, id: TaskId, a: usize, b: usize) -> Result<(), TaskError> {
        let parent = self.get(id).ok_or(TaskError::NotFound(id))?.parent();
        self.fire(TaskEvent::PreChanged(id));
        self.container_mut(parent)
            .ok_or(TaskError::NotFound(id))?
            .swap(a, b);
        trace!(task = %id, from = b, to = a, "siblings swapped");
        self.fire(TaskEvent::Changed(id));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
