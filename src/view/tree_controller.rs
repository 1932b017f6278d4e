use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::tree_model::{TaskTreeModel, TreeModelListener, TreeNode, TreePath};
use super::view_state::TreeWidget;
use crate::model::store::TaskStore;

/// Keeps a widget's expansion and selection in step with the tree model.
///
/// The widget is registered as a tree listener on construction so it sees
/// every delta before the controller touches it again.
pub struct TreeController<W> {
    model: Rc<RefCell<TaskTreeModel>>,
    widget: Rc<RefCell<W>>,
}

impl<W: TreeWidget + TreeModelListener + 'static> TreeController<W> {
    pub fn new(model: Rc<RefCell<TaskTreeModel>>, widget: Rc<RefCell<W>>) -> Self {
        model.borrow_mut().add_tree_listener(widget.clone());
        TreeController { model, widget }
    }

    pub fn model(&self) -> &Rc<RefCell<TaskTreeModel>> {
        &self.model
    }

    pub fn widget(&self) -> &Rc<RefCell<W>> {
        &self.widget
    }

    pub fn is_grouped_by_priority(&self) -> bool {
        self.model.borrow().is_grouped_by_priority()
    }

    pub fn hides_completed(&self) -> bool {
        self.model.borrow().hides_completed()
    }

    /// Flip priority grouping; returns the new state
    pub fn toggle_group_by_priority(&self, store: &TaskStore) -> bool {
        let enable = !self.is_grouped_by_priority();
        self.group_by_priority(store, enable);
        enable
    }

    /// Rebuild the tree grouped (or flat). Grouping expands every priority
    /// group one level.
    pub fn group_by_priority(&self, store: &TaskStore, enable: bool) {
        self.model.borrow_mut().group_by_priority(store, enable);
        if enable {
            self.expand_one_level(store);
        }
    }

    pub fn set_hide_completed(&self, store: &TaskStore, enable: bool) {
        self.model.borrow_mut().set_hide_completed(store, enable);
    }

    fn expand_one_level(&self, store: &TaskStore) {
        let model = self.model.borrow();
        let root = TreePath::new(model.root());
        let mut widget = self.widget.borrow_mut();
        for child in model.children(store, model.root()) {
            widget.expand_path(&root.child(child));
        }
    }

    /// Full path to `node`, or `None` when it is not in the current tree
    pub fn path_to_object(&self, store: &TaskStore, node: TreeNode) -> Option<TreePath> {
        let model = self.model.borrow();
        if node == model.root() {
            return Some(TreePath::new(node));
        }
        model.path_to_node(store, node)
    }

    /// Expand the widget down to `node`. Returns false for nodes no longer
    /// in the tree.
    pub fn expand_to_object(&self, store: &TaskStore, node: TreeNode) -> bool {
        match self.path_to_object(store, node) {
            Some(path) => {
                self.widget.borrow_mut().expand_path(&path);
                true
            }
            None => false,
        }
    }

    /// Repaint every node, top-down, without touching structure
    pub fn refresh_tree(&self, store: &TaskStore) {
        let model = self.model.borrow();
        let mut paths = Vec::new();
        collect_paths(&model, store, TreePath::new(model.root()), &mut paths);
        debug!(nodes = paths.len(), "refreshing tree labels");
        for path in paths {
            model.fire_nodes_changed(path);
        }
    }

    /// Have the widget re-read everything below `path`
    pub fn reload(&self, path: TreePath) {
        self.model.borrow().fire_structure_changed(path);
    }

    /// Labels depend on settings, so any settings change repaints
    pub fn settings_changed(&self, store: &TaskStore) {
        self.refresh_tree(store);
    }

    /// Nodes currently selected, for restoring after a rebuild
    pub fn selection_snapshot(&self) -> Vec<TreeNode> {
        self.widget
            .borrow()
            .selection_paths()
            .iter()
            .filter_map(TreePath::last)
            .collect()
    }

    /// Reselect whichever snapshot nodes still exist. Returns how many did.
    pub fn restore_selection(&self, store: &TaskStore, nodes: &[TreeNode]) -> usize {
        let paths: Vec<TreePath> = nodes
            .iter()
            .filter_map(|n| self.path_to_object(store, *n))
            .collect();
        let restored = paths.len();
        self.widget.borrow_mut().set_selection_paths(paths);
        restored
    }

    /// Select a single node
    pub fn select(&self, store: &TaskStore, node: TreeNode) -> bool {
        self.restore_selection(store, &[node]) == 1
    }
}

fn collect_paths(model: &TaskTreeModel, store: &TaskStore, path: TreePath, out: &mut Vec<TreePath>) {
    let node = path.last();
    out.push(path.clone());
    if let Some(node) = node {
        for child in model.children(store, node) {
            collect_paths(model, store, path.child(child), out);
        }
    }
}
