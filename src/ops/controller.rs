use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::model::event::{ListenerId, TaskModelListener};
use crate::model::settings::TaskSettings;
use crate::model::store::{NewTask, TaskError, TaskStore};
use crate::model::task::{HighlightingType, Task, TaskId, TaskPriority, for_each_task};
use crate::view::tree_model::{TaskTreeModel, TreeNode};

/// Gates user commands and forwards them to the store.
///
/// Gated commands return `Ok(false)` when their predicate rejects the
/// node; the caller is expected to have disabled the command already.
#[derive(Debug, Default)]
pub struct TaskController {
    store: TaskStore,
    settings: TaskSettings,
    selection: Vec<TreeNode>,
}

impl TaskController {
    pub fn new(store: TaskStore, settings: TaskSettings) -> Self {
        TaskController {
            store,
            settings,
            selection: Vec::new(),
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn add_change_listener(&mut self, listener: Rc<RefCell<dyn TaskModelListener>>) -> ListenerId {
        self.store.add_change_listener(listener)
    }

    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        self.store.remove_change_listener(id)
    }

    pub fn settings(&self) -> &TaskSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: TaskSettings) {
        self.settings = settings;
    }

    pub fn into_parts(self) -> (TaskStore, TaskSettings) {
        (self.store, self.settings)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn selection(&self) -> &[TreeNode] {
        &self.selection
    }

    /// Called by the widget whenever its selection changes
    pub fn set_selection(&mut self, nodes: Vec<TreeNode>) {
        self.selection = nodes;
    }

    /// Selected nodes that are tasks
    pub fn selected_tasks(&self) -> Vec<TaskId> {
        self.selection.iter().filter_map(|n| n.as_task()).collect()
    }

    /// Priority to preselect for a new task: that of a single selected
    /// priority group.
    pub fn suggested_priority(&self, model: &TaskTreeModel) -> Option<TaskPriority> {
        match self.selection.as_slice() {
            [TreeNode::Group(id)] => model.group(*id)?.priority(),
            _ => None,
        }
    }

    /// Parent to preselect for a new task: a single selected task
    pub fn suggested_parent(&self) -> Option<TaskId> {
        match self.selection.as_slice() {
            [TreeNode::Task(id)] if self.store.contains(*id) => Some(*id),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Predicates
    // -----------------------------------------------------------------------

    fn task(&self, node: TreeNode) -> Option<&Task> {
        node.as_task().and_then(|id| self.store.get(id))
    }

    pub fn can_delete(&self, node: TreeNode) -> bool {
        self.task(node).is_some()
    }

    pub fn can_complete(&self, node: TreeNode) -> bool {
        self.task(node)
            .is_some_and(|t| t.is_leaf() && !t.is_effectively_completed())
    }

    pub fn can_be_uncompleted(&self, node: TreeNode) -> bool {
        self.task(node)
            .is_some_and(|t| t.is_leaf() && t.is_effectively_completed())
    }

    pub fn can_edit(&self, node: TreeNode) -> bool {
        self.task(node).is_some()
    }

    pub fn can_highlight(&self, node: TreeNode) -> bool {
        self.task(node).is_some_and(|t| !t.is_highlighted())
    }

    pub fn can_be_unhighlighted(&self, node: TreeNode) -> bool {
        self.task(node).is_some_and(Task::is_highlighted)
    }

    pub fn can_move_up(&self, node: TreeNode) -> bool {
        node.as_task().is_some_and(|id| self.store.can_move_up(id))
    }

    pub fn can_move_down(&self, node: TreeNode) -> bool {
        node.as_task().is_some_and(|id| self.store.can_move_down(id))
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn add_task(
        &mut self,
        parent: Option<TaskId>,
        title: impl Into<String>,
        priority: TaskPriority,
        estimated_time: u64,
    ) -> Result<TaskId, TaskError> {
        self.store.add_task(
            parent,
            NewTask::titled(title).priority(priority).estimated(estimated_time),
        )
    }

    pub fn update_task(
        &mut self,
        id: TaskId,
        parent: Option<TaskId>,
        title: Option<String>,
        priority: TaskPriority,
        estimated_time: u64,
    ) -> Result<(), TaskError> {
        self.store
            .update_task(id, parent, title, priority, estimated_time)
    }

    pub fn delete_task(&mut self, node: TreeNode) -> Result<bool, TaskError> {
        self.gated(node, Self::can_delete, |store, id| store.delete_task(id).map(|_| ()))
    }

    pub fn complete_task(&mut self, node: TreeNode) -> Result<bool, TaskError> {
        self.gated(node, Self::can_complete, TaskStore::complete_task)
    }

    /// Complete a task, first recording `actual` when the settings ask for
    /// actual time on completion.
    pub fn complete_with_actual_time(&mut self, node: TreeNode, actual: Option<u64>) -> Result<bool, TaskError> {
        if !self.can_complete(node) {
            return Ok(false);
        }
        if let (Some(ms), Some(id)) = (actual, node.as_task())
            && self.settings.records_actual_on_complete()
        {
            self.store.update_actual_time(id, ms)?;
        }
        self.complete_task(node)
    }

    pub fn uncomplete_task(&mut self, node: TreeNode) -> Result<bool, TaskError> {
        self.gated(node, Self::can_be_uncompleted, TaskStore::uncomplete_task)
    }

    pub fn highlight_task(&mut self, node: TreeNode) -> Result<bool, TaskError> {
        self.gated(node, Self::can_highlight, TaskStore::highlight_task)
    }

    pub fn unhighlight_task(&mut self, node: TreeNode) -> Result<bool, TaskError> {
        self.gated(node, Self::can_be_unhighlighted, TaskStore::unhighlight_task)
    }

    pub fn set_task_highlighting_type(&mut self, node: TreeNode, kind: HighlightingType) -> Result<bool, TaskError> {
        self.gated(node, Self::can_edit, |store, id| {
            store.set_task_highlighting_type(id, kind)
        })
    }

    pub fn update_actual_time(&mut self, id: TaskId, ms: u64) -> Result<(), TaskError> {
        self.store.update_actual_time(id, ms)
    }

    pub fn move_up(&mut self, node: TreeNode) -> Result<bool, TaskError> {
        match node.as_task() {
            Some(id) if self.can_move_up(node) => self.store.move_up(id),
            _ => Ok(false),
        }
    }

    pub fn move_down(&mut self, node: TreeNode) -> Result<bool, TaskError> {
        match node.as_task() {
            Some(id) if self.can_move_down(node) => self.store.move_down(id),
            _ => Ok(false),
        }
    }

    fn gated(
        &mut self,
        node: TreeNode,
        allowed: fn(&Self, TreeNode) -> bool,
        apply: impl FnOnce(&mut TaskStore, TaskId) -> Result<(), TaskError>,
    ) -> Result<bool, TaskError> {
        match node.as_task() {
            Some(id) if allowed(self, node) => {
                apply(&mut self.store, id)?;
                Ok(true)
            }
            _ => {
                debug!(?node, "command rejected by precondition");
                Ok(false)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Every task in the store, pre-order
    pub fn all_tasks(&self) -> Vec<TaskId> {
        let mut ids = Vec::new();
        for_each_task(self.store.tasks(), &mut |t| ids.push(t.id()));
        ids
    }

    /// The task and all its descendants, pre-order
    pub fn sub_tasks(&self, id: TaskId) -> Vec<TaskId> {
        let mut ids = Vec::new();
        if let Some(task) = self.store.get(id) {
            for_each_task(std::slice::from_ref(task), &mut |t| ids.push(t.id()));
        }
        ids
    }

    /// Tasks offered as a new parent for `id`: everything except the task
    /// and its own subtree.
    pub fn find_possible_parents(&self, id: TaskId) -> Vec<TaskId> {
        let excluded = self.sub_tasks(id);
        self.all_tasks()
            .into_iter()
            .filter(|t| !excluded.contains(t))
            .collect()
    }

    pub fn find_parent_for(&self, id: TaskId) -> Option<TaskId> {
        self.store.get(id)?.parent()
    }
}
