use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::model::event::{ListenerId, TaskEvent, TaskModelListener};
use crate::model::group::{
    AllOf, GroupEntry, GroupId, IncompleteFilter, PriorityFilter, TaskFilter, TaskGroup,
};
use crate::model::store::TaskStore;
use crate::model::task::{TaskId, TaskPriority};

pub const ROOT_TITLE: &str = "All Tasks";

/// A node of the displayed tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeNode {
    Group(GroupId),
    Task(TaskId),
}

impl TreeNode {
    pub fn as_task(self) -> Option<TaskId> {
        match self {
            TreeNode::Task(id) => Some(id),
            TreeNode::Group(_) => None,
        }
    }

    pub fn is_group(self) -> bool {
        matches!(self, TreeNode::Group(_))
    }
}

/// Root-first sequence of nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreePath(Vec<TreeNode>);

impl TreePath {
    pub fn new(root: TreeNode) -> Self {
        TreePath(vec![root])
    }

    pub fn from_nodes(nodes: Vec<TreeNode>) -> Self {
        TreePath(nodes)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<TreeNode> {
        self.0.last().copied()
    }

    /// This path extended by `child`
    pub fn child(&self, child: TreeNode) -> TreePath {
        let mut nodes = self.0.clone();
        nodes.push(child);
        TreePath(nodes)
    }

    /// This path without its last node; `None` for a single-node path
    pub fn parent(&self) -> Option<TreePath> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(TreePath(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Whether `prefix` is this path or one of its ancestors
    pub fn starts_with(&self, prefix: &TreePath) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

/// Structural change notification for a rendered tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeDelta {
    /// Everything below `path` must be re-read
    StructureChanged { path: TreePath },
    NodesInserted {
        parent: TreePath,
        index: usize,
        child: TreeNode,
    },
    NodesRemoved {
        parent: TreePath,
        index: usize,
        child: TreeNode,
    },
    /// The node at `path` needs repainting; structure is unchanged
    NodesChanged { path: TreePath },
}

pub trait TreeModelListener {
    fn tree_changed(&mut self, delta: &TreeDelta);
}

/// Position of a task captured on a pre-event, consumed by its post-event
struct PendingPosition {
    task: TaskId,
    /// Parent path and index, or `None` when the task was not visible
    position: Option<(TreePath, usize)>,
}

/// Exposes the store as a labeled tree and turns store events into
/// [`TreeDelta`]s.
///
/// Navigation methods take the store explicitly; the model only holds the
/// group structure and view toggles.
pub struct TaskTreeModel {
    root: TaskGroup,
    grouped: bool,
    hide_completed: bool,
    listeners: Vec<(ListenerId, Rc<RefCell<dyn TreeModelListener>>)>,
    next_listener_id: u64,
    pending: Option<PendingPosition>,
    /// Top-level tasks listed by each bound group, as of the last event
    membership: Vec<Vec<TaskId>>,
}

impl TaskTreeModel {
    pub fn new(store: &TaskStore) -> Self {
        let mut model = TaskTreeModel {
            root: build_root(false, false),
            grouped: false,
            hide_completed: false,
            listeners: Vec::new(),
            next_listener_id: 0,
            pending: None,
            membership: Vec::new(),
        };
        model.membership = model.membership(store);
        model
    }

    // -----------------------------------------------------------------------
    // Tree navigation
    // -----------------------------------------------------------------------

    pub fn root(&self) -> TreeNode {
        TreeNode::Group(self.root.id())
    }

    pub fn root_group(&self) -> &TaskGroup {
        &self.root
    }

    pub fn group(&self, id: GroupId) -> Option<&TaskGroup> {
        self.root.find_group(id)
    }

    pub fn child(&self, store: &TaskStore, parent: TreeNode, index: usize) -> Option<TreeNode> {
        match parent {
            TreeNode::Group(gid) => match self.group(gid)?.get(store, index)? {
                GroupEntry::Group(g) => Some(TreeNode::Group(g.id())),
                GroupEntry::Task(t) => Some(TreeNode::Task(t.id())),
            },
            TreeNode::Task(tid) => store
                .get(tid)?
                .subtasks()
                .get(index)
                .map(|t| TreeNode::Task(t.id())),
        }
    }

    pub fn child_count(&self, store: &TaskStore, node: TreeNode) -> usize {
        match node {
            TreeNode::Group(gid) => self.group(gid).map_or(0, |g| g.size(store)),
            TreeNode::Task(tid) => store.get(tid).map_or(0, |t| t.subtasks().len()),
        }
    }

    pub fn is_leaf(&self, store: &TaskStore, node: TreeNode) -> bool {
        self.child_count(store, node) == 0
    }

    pub fn children(&self, store: &TaskStore, node: TreeNode) -> Vec<TreeNode> {
        match node {
            TreeNode::Group(gid) => match self.group(gid) {
                Some(g) if g.is_bound() => g.tasks(store).map(|t| TreeNode::Task(t.id())).collect(),
                Some(g) => g.groups().iter().map(|g| TreeNode::Group(g.id())).collect(),
                None => Vec::new(),
            },
            TreeNode::Task(tid) => store.get(tid).map_or_else(Vec::new, |t| {
                t.subtasks().iter().map(|t| TreeNode::Task(t.id())).collect()
            }),
        }
    }

    pub fn index_of_child(&self, store: &TaskStore, parent: TreeNode, child: TreeNode) -> Option<usize> {
        self.children(store, parent).iter().position(|c| *c == child)
    }

    /// Ancestor chain of `task`, root first, excluding the task itself.
    /// Empty when the task is not reachable from the current root.
    pub fn find_path_to_task(&self, store: &TaskStore, task: TaskId) -> TreePath {
        self.find_path_to(store, TreeNode::Task(task))
            .and_then(|p| p.parent())
            .unwrap_or_default()
    }

    /// Full path from the root down to and including `node`
    pub fn path_to_node(&self, store: &TaskStore, node: TreeNode) -> Option<TreePath> {
        self.find_path_to(store, node)
    }

    fn find_path_to(&self, store: &TaskStore, target: TreeNode) -> Option<TreePath> {
        let mut path = Vec::new();
        if self.search(store, self.root(), target, &mut path) {
            path.reverse();
            Some(TreePath(path))
        } else {
            None
        }
    }

    fn search(&self, store: &TaskStore, node: TreeNode, target: TreeNode, path: &mut Vec<TreeNode>) -> bool {
        if node == target {
            path.push(node);
            return true;
        }
        for child in self.children(store, node) {
            if self.search(store, child, target, path) {
                path.push(node);
                return true;
            }
        }
        false
    }

    // -----------------------------------------------------------------------
    // View toggles
    // -----------------------------------------------------------------------

    pub fn is_grouped_by_priority(&self) -> bool {
        self.grouped
    }

    pub fn hides_completed(&self) -> bool {
        self.hide_completed
    }

    /// Replace the root with one group per priority (or the flat view) and
    /// announce a full structure change. Paths held elsewhere go stale.
    pub fn group_by_priority(&mut self, store: &TaskStore, enable: bool) {
        self.grouped = enable;
        self.rebuild_root(store);
    }

    /// Replace the root so completed top-level tasks are hidden (or shown).
    pub fn set_hide_completed(&mut self, store: &TaskStore, enable: bool) {
        self.hide_completed = enable;
        self.rebuild_root(store);
    }

    fn rebuild_root(&mut self, store: &TaskStore) {
        self.root = build_root(self.grouped, self.hide_completed);
        self.pending = None;
        self.membership = self.membership(store);
        debug!(
            grouped = self.grouped,
            hide_completed = self.hide_completed,
            "tree root rebuilt"
        );
        self.structure_changed();
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    pub fn add_tree_listener(&mut self, listener: Rc<RefCell<dyn TreeModelListener>>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_tree_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Ask listeners to repaint the node at `path`
    pub fn fire_nodes_changed(&self, path: TreePath) {
        self.fire(&TreeDelta::NodesChanged { path });
    }

    /// Ask listeners to re-read everything below `path`
    pub fn fire_structure_changed(&self, path: TreePath) {
        self.fire(&TreeDelta::StructureChanged { path });
    }

    fn fire(&self, delta: &TreeDelta) {
        trace!(?delta, "tree delta");
        for (_, listener) in &self.listeners {
            listener.borrow_mut().tree_changed(delta);
        }
    }

    // -----------------------------------------------------------------------
    // Event translation
    // -----------------------------------------------------------------------

    /// Parent path and index of a visible task
    fn locate(&self, store: &TaskStore, task: TaskId) -> Option<(TreePath, usize)> {
        let parent_path = self.find_path_to_task(store, task);
        let parent = parent_path.last()?;
        let index = self.index_of_child(store, parent, TreeNode::Task(task))?;
        Some((parent_path, index))
    }

    fn membership(&self, store: &TaskStore) -> Vec<Vec<TaskId>> {
        let mut lists = Vec::new();
        collect_membership(&self.root, store, &mut lists);
        lists
    }

    /// Re-read group membership; true when some task other than `task`
    /// appeared in or vanished from a bound group.
    fn membership_flipped(&mut self, store: &TaskStore, task: TaskId) -> bool {
        let current = self.membership(store);
        let without = |lists: &[Vec<TaskId>]| -> Vec<Vec<TaskId>> {
            lists
                .iter()
                .map(|l| l.iter().copied().filter(|id| *id != task).collect())
                .collect()
        };
        let flipped = without(&self.membership) != without(&current);
        self.membership = current;
        flipped
    }

    fn take_pending(&mut self, task: TaskId) -> Option<(TreePath, usize)> {
        match self.pending.take() {
            Some(p) if p.task == task => p.position,
            Some(p) => {
                trace!(expected = %task, found = %p.task, "discarding unpaired pre-event position");
                None
            }
            None => None,
        }
    }

    fn structure_changed(&self) {
        self.fire_structure_changed(TreePath::new(self.root()));
    }

    fn on_added(&mut self, store: &TaskStore, task: TaskId) {
        if self.membership_flipped(store, task) {
            self.structure_changed();
            return;
        }
        let Some((parent, index)) = self.locate(store, task) else {
            return;
        };
        if parent.len() == 1 && self.child_count(store, self.root()) == 1 {
            self.structure_changed();
        } else {
            self.fire(&TreeDelta::NodesInserted {
                parent,
                index,
                child: TreeNode::Task(task),
            });
        }
    }

    fn on_deleted(&mut self, store: &TaskStore, task: TaskId) {
        let old = self.take_pending(task);
        if self.membership_flipped(store, task) {
            self.structure_changed();
            return;
        }
        if let Some((parent, index)) = old {
            self.fire(&TreeDelta::NodesRemoved {
                parent,
                index,
                child: TreeNode::Task(task),
            });
        }
    }

    fn on_changed(&mut self, store: &TaskStore, task: TaskId) {
        let old = self.take_pending(task);
        if self.membership_flipped(store, task) {
            self.structure_changed();
            return;
        }
        let new = self.locate(store, task);
        let node = TreeNode::Task(task);

        match (old, new) {
            (Some(old), Some(new)) if old == new => {
                // repaint the node and every ancestor so rolled-up labels refresh
                let mut path = old.0.child(node);
                while path.len() > 1 {
                    let parent = path.parent();
                    self.fire(&TreeDelta::NodesChanged { path });
                    match parent {
                        Some(p) => path = p,
                        None => break,
                    }
                }
            }
            (old, new) => {
                if let Some((parent, index)) = old {
                    self.fire(&TreeDelta::NodesRemoved {
                        parent,
                        index,
                        child: node,
                    });
                }
                if let Some((parent, index)) = new {
                    self.fire(&TreeDelta::NodesInserted {
                        parent,
                        index,
                        child: node,
                    });
                }
            }
        }
    }
}

impl TaskModelListener for TaskTreeModel {
    fn handle_task_event(&mut self, store: &TaskStore, event: &TaskEvent) {
        match *event {
            TaskEvent::Added(id) => self.on_added(store, id),
            TaskEvent::PreDeleted(id) | TaskEvent::PreChanged(id) => {
                self.pending = Some(PendingPosition {
                    task: id,
                    position: self.locate(store, id),
                });
            }
            TaskEvent::Deleted(id) => self.on_deleted(store, id),
            TaskEvent::Changed(id) => self.on_changed(store, id),
        }
    }
}

fn build_root(grouped: bool, hide_completed: bool) -> TaskGroup {
    let filter_for = |priority: Option<TaskPriority>| -> Option<Box<dyn TaskFilter>> {
        match (priority, hide_completed) {
            (None, false) => None,
            (None, true) => Some(Box::new(IncompleteFilter)),
            (Some(p), false) => Some(Box::new(PriorityFilter(p))),
            (Some(p), true) => Some(Box::new(AllOf(vec![
                Box::new(PriorityFilter(p)),
                Box::new(IncompleteFilter),
            ]))),
        }
    };

    if grouped {
        let mut root = TaskGroup::named(ROOT_TITLE);
        for priority in TaskPriority::ALL {
            root.add(TaskGroup::bound(priority.friendly_name(), filter_for(Some(priority))));
        }
        root
    } else {
        TaskGroup::bound(ROOT_TITLE, filter_for(None))
    }
}

fn collect_membership(group: &TaskGroup, store: &TaskStore, lists: &mut Vec<Vec<TaskId>>) {
    if group.is_bound() {
        lists.push(group.tasks(store).map(|t| t.id()).collect());
    } else {
        for g in group.groups() {
            collect_membership(g, store, lists);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
