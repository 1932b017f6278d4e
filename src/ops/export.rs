use crate::model::store::TaskStore;
use crate::view::tree_model::{TaskTreeModel, TreeNode};

/// Render everything below the current tree root as indented plain text,
/// one title per line, `indent` spaces per level. Group nodes (when grouped
/// by priority) appear as lines of their own.
pub fn export_text(model: &TaskTreeModel, store: &TaskStore, indent: usize) -> String {
    let mut out = String::new();
    for child in model.children(store, model.root()) {
        write_node(model, store, child, 0, indent, &mut out);
    }
    out
}

fn write_node(
    model: &TaskTreeModel,
    store: &TaskStore,
    node: TreeNode,
    depth: usize,
    indent: usize,
    out: &mut String,
) {
    let title = match node {
        TreeNode::Group(id) => model.group(id).map(|g| g.title().to_string()),
        TreeNode::Task(id) => store
            .get(id)
            .map(|t| t.title().unwrap_or_default().to_string()),
    };
    let Some(title) = title else { return };
    out.push_str(&" ".repeat(depth * indent));
    out.push_str(&title);
    out.push('\n');
    for child in model.children(store, node) {
        write_node(model, store, child, depth + 1, indent, out);
    }
}
