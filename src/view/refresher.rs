use tracing::debug;

use super::tree_controller::TreeController;
use super::tree_model::{TreeModelListener, TreeNode, TreePath};
use super::view_state::TreeWidget;
use crate::model::store::TaskStore;

/// Reloads part of the tree while keeping what the user had expanded.
///
/// Expanded nodes are remembered by identity. Tasks keep their ids across a
/// rebuild, so their expansion comes back; groups are recreated with new
/// ids on every root rebuild, so an expanded priority group stays collapsed
/// afterwards.
#[derive(Debug, Default)]
pub struct TreeRefresher {
    expanded: Vec<TreeNode>,
}

impl TreeRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload the whole tree
    pub fn refresh<W>(&mut self, controller: &TreeController<W>, store: &TaskStore)
    where
        W: TreeWidget + TreeModelListener + 'static,
    {
        let root = controller.model().borrow().root();
        self.refresh_node(controller, store, root);
    }

    /// Reload everything below `node`. Returns false if `node` is not in
    /// the tree.
    pub fn refresh_node<W>(&mut self, controller: &TreeController<W>, store: &TaskStore, node: TreeNode) -> bool
    where
        W: TreeWidget + TreeModelListener + 'static,
    {
        let Some(path) = controller.path_to_object(store, node) else {
            return false;
        };
        self.store_expansions(controller, store, &path);
        controller.reload(path);
        self.restore_expansions(controller, store);
        true
    }

    /// Run a root rebuild (grouping, filtering) between recording and
    /// restoring expansions and selection.
    pub fn rebuild<W, F>(&mut self, controller: &TreeController<W>, store: &TaskStore, rebuild: F)
    where
        W: TreeWidget + TreeModelListener + 'static,
        F: FnOnce(&TreeController<W>, &TaskStore),
    {
        let root = TreePath::new(controller.model().borrow().root());
        self.store_expansions(controller, store, &root);
        let selection = controller.selection_snapshot();
        rebuild(controller, store);
        self.restore_expansions(controller, store);
        controller.restore_selection(store, &selection);
    }

    fn store_expansions<W>(&mut self, controller: &TreeController<W>, store: &TaskStore, path: &TreePath)
    where
        W: TreeWidget + TreeModelListener + 'static,
    {
        self.expanded.clear();
        let model = controller.model().borrow();
        let widget = controller.widget().borrow();
        let mut stack = vec![path.clone()];
        while let Some(path) = stack.pop() {
            if !widget.is_expanded(&path) {
                continue;
            }
            let Some(node) = path.last() else { continue };
            self.expanded.push(node);
            for child in model.children(store, node).into_iter().rev() {
                stack.push(path.child(child));
            }
        }
        debug!(expanded = self.expanded.len(), "recorded expansions");
    }

    fn restore_expansions<W>(&self, controller: &TreeController<W>, store: &TaskStore)
    where
        W: TreeWidget + TreeModelListener + 'static,
    {
        let restored = self
            .expanded
            .iter()
            .filter(|node| controller.expand_to_object(store, **node))
            .count();
        debug!(restored, lost = self.expanded.len() - restored, "restored expansions");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::model::store::NewTask;
    use crate::model::task::{TaskId, TaskPriority};
    use crate::view::tree_model::TaskTreeModel;
    use crate::view::view_state::TreeViewState;

    struct Fixture {
        store: TaskStore,
        controller: TreeController<TreeViewState>,
        a: TaskId,
        a1: TaskId,
        a11: TaskId,
    }

    fn fixture() -> Fixture {
        let mut store = TaskStore::new();
        let model = Rc::new(RefCell::new(TaskTreeModel::new(&store)));
        store.add_change_listener(model.clone());
        let controller = TreeController::new(model, Rc::new(RefCell::new(TreeViewState::new())));
        let a = store.add_task(None, NewTask::titled("A")).unwrap();
        let a1 = store.add_task(Some(a), NewTask::titled("A1")).unwrap();
        let a11 = store.add_task(Some(a1), NewTask::titled("A11")).unwrap();
        store
            .add_task(None, NewTask::titled("B").priority(TaskPriority::Important))
            .unwrap();
        Fixture { store, controller, a, a1, a11 }
    }

    fn expanded(f: &Fixture, node: TreeNode) -> bool {
        let path = f.controller.path_to_object(&f.store, node).unwrap();
        f.controller.widget().borrow().is_expanded(&path)
    }

    #[test]
    fn test_refresh_restores_task_expansion() {
        let f = fixture();
        f.controller.expand_to_object(&f.store, TreeNode::Task(f.a1));
        let mut refresher = TreeRefresher::new();
        refresher.refresh(&f.controller, &f.store);

        assert!(expanded(&f, TreeNode::Task(f.a)));
        assert!(expanded(&f, TreeNode::Task(f.a1)));
        assert!(!expanded(&f, TreeNode::Task(f.a11)));
    }

    #[test]
    fn test_refresh_unknown_node() {
        let f = fixture();
        let mut refresher = TreeRefresher::new();
        assert!(!refresher.refresh_node(&f.controller, &f.store, TreeNode::Task(TaskId(77))));
    }

    #[test]
    fn test_rebuild_keeps_tasks_but_loses_groups() {
        let f = fixture();
        let mut refresher = TreeRefresher::new();
        refresher.rebuild(&f.controller, &f.store, |c, s| c.group_by_priority(s, true));
        let groups = {
            let model = f.controller.model().borrow();
            model.children(&f.store, model.root())
        };
        f.controller.expand_to_object(&f.store, TreeNode::Task(f.a));
        f.controller.widget().borrow_mut().collapse_path(
            &f.controller.path_to_object(&f.store, groups[0]).unwrap(),
        );

        refresher.rebuild(&f.controller, &f.store, |c, s| c.set_hide_completed(s, true));

        assert!(expanded(&f, TreeNode::Task(f.a)));
        // the Normal group holding A is re-expanded as A's ancestor, the
        // collapsed High group was never recorded and stays collapsed
        let new_groups = {
            let model = f.controller.model().borrow();
            model.children(&f.store, model.root())
        };
        assert_ne!(groups, new_groups);
        assert!(!expanded(&f, new_groups[0]));
        assert!(expanded(&f, new_groups[1]));
    }
}
