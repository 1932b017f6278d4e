use std::collections::HashSet;

use tracing::trace;

use super::tree_model::{TreeDelta, TreeModelListener, TreeNode, TreePath};

/// The visual state a tree widget keeps per node: expansion and selection.
///
/// Paths are identity-based (they name nodes, not row indices), so they
/// survive sibling insertions but not removal of the node or a rebuilt
/// ancestor.
pub trait TreeWidget {
    fn is_expanded(&self, path: &TreePath) -> bool;

    /// Expand `path` and every ancestor on it
    fn expand_path(&mut self, path: &TreePath);

    fn collapse_path(&mut self, path: &TreePath);

    fn selection_paths(&self) -> Vec<TreePath>;

    fn set_selection_paths(&mut self, paths: Vec<TreePath>);
}

/// Headless widget state, driven by tree deltas.
#[derive(Debug, Default)]
pub struct TreeViewState {
    expanded: HashSet<TreePath>,
    selection: Vec<TreePath>,
}

impl TreeViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expanded paths strictly below `parent`, shortest first
    pub fn expanded_descendants(&self, parent: &TreePath) -> Vec<TreePath> {
        let mut found: Vec<TreePath> = self
            .expanded
            .iter()
            .filter(|p| p.len() > parent.len() && p.starts_with(parent) && self.is_expanded(p))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.len());
        found
    }

    /// Selected nodes, in selection order
    pub fn selected_nodes(&self) -> Vec<TreeNode> {
        self.selection.iter().filter_map(|p| p.last()).collect()
    }

    /// Forget state for `path` and everything below it
    fn drop_subtree(&mut self, path: &TreePath, keep_self: bool) {
        let before = (self.expanded.len(), self.selection.len());
        let doomed = |p: &TreePath| p.starts_with(path) && !(keep_self && p.len() == path.len());
        self.expanded.retain(|p| !doomed(p));
        self.selection.retain(|p| !doomed(p));
        let after = (self.expanded.len(), self.selection.len());
        if before != after {
            trace!(
                expanded = before.0 - after.0,
                selected = before.1 - after.1,
                "dropped stale view state"
            );
        }
    }
}

impl TreeWidget for TreeViewState {
    fn is_expanded(&self, path: &TreePath) -> bool {
        let nodes = path.nodes();
        !nodes.is_empty()
            && (1..=nodes.len())
                .all(|n| self.expanded.contains(&TreePath::from_nodes(nodes[..n].to_vec())))
    }

    fn expand_path(&mut self, path: &TreePath) {
        let nodes = path.nodes();
        for n in 1..=nodes.len() {
            self.expanded.insert(TreePath::from_nodes(nodes[..n].to_vec()));
        }
    }

    fn collapse_path(&mut self, path: &TreePath) {
        self.expanded.remove(path);
    }

    fn selection_paths(&self) -> Vec<TreePath> {
        self.selection.clone()
    }

    fn set_selection_paths(&mut self, paths: Vec<TreePath>) {
        self.selection = paths;
    }
}

impl TreeModelListener for TreeViewState {
    fn tree_changed(&mut self, delta: &TreeDelta) {
        match delta {
            TreeDelta::StructureChanged { path } => {
                // a rebuilt root has a new identity, so nothing survives;
                // a reloaded subtree keeps its own node
                self.drop_subtree(path, path.len() > 1);
            }
            TreeDelta::NodesRemoved { parent, child, .. } => {
                self.drop_subtree(&parent.child(*child), false);
            }
            TreeDelta::NodesInserted { .. } | TreeDelta::NodesChanged { .. } => {}
        }
    }
}
