use crate::model::group::TaskGroup;
use crate::model::settings::TaskSettings;
use crate::model::store::TaskStore;
use crate::model::task::Task;

use super::tree_model::{TaskTreeModel, TreeNode};

/// Format milliseconds as `"H h M min"`, dropping zero parts. Sub-minute
/// remainders are truncated, so anything under a minute is empty.
pub fn format_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let (hours, min) = (minutes / 60, minutes % 60);
    match (hours, min) {
        (0, 0) => String::new(),
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {} min", h, m),
    }
}

/// Parenthesized detail text shown after a task title; empty when there is
/// nothing to show.
pub fn task_details(task: &Task, settings: &TaskSettings) -> String {
    let estimated = task.effective_estimated_time();
    let actual = task.effective_actual_time();

    if task.is_leaf() {
        if settings.enable_actual_time {
            let mut parts = Vec::new();
            if estimated != 0 {
                parts.push(format!("Estimated: {}", format_time(estimated)));
            }
            if actual != 0 {
                parts.push(format!("Actual: {}", format_time(actual)));
            }
            if parts.is_empty() {
                String::new()
            } else {
                format!("({})", parts.join(", "))
            }
        } else if estimated != 0 {
            format!("({})", format_time(estimated))
        } else {
            String::new()
        }
    } else {
        let mut details = format!(
            "({} Tasks, {}% Completed",
            task.subtasks().len(),
            task.completion_ratio()
        );
        if estimated != 0 {
            details.push_str(&format!(", Estimated: {}", format_time(estimated)));
        }
        if settings.enable_actual_time && actual != 0 {
            details.push_str(&format!(", Actual: {}", format_time(actual)));
        }
        details.push(')');
        details
    }
}

/// `(N Tasks, P% Completed)` over the tasks a group lists, counting nested
/// groups' tasks for a static container.
pub fn group_details(group: &TaskGroup, store: &TaskStore) -> String {
    let mut total = 0usize;
    let mut completed = 0usize;
    count_group(group, store, &mut total, &mut completed);
    let percent = if total > 0 { completed * 100 / total } else { 0 };
    format!("({} Tasks, {}% Completed)", total, percent)
}

fn count_group(group: &TaskGroup, store: &TaskStore, total: &mut usize, completed: &mut usize) {
    if group.is_bound() {
        for task in group.tasks(store) {
            *total += 1;
            if task.is_effectively_completed() {
                *completed += 1;
            }
        }
    } else {
        for g in group.groups() {
            count_group(g, store, total, completed);
        }
    }
}

/// Title plus details for any tree node
pub fn node_label(
    model: &TaskTreeModel,
    store: &TaskStore,
    settings: &TaskSettings,
    node: TreeNode,
) -> Option<String> {
    let (title, details) = match node {
        TreeNode::Group(id) => {
            let group = model.group(id)?;
            (group.title().to_string(), group_details(group, store))
        }
        TreeNode::Task(id) => {
            let task = store.get(id)?;
            (task.title().unwrap_or_default().to_string(), task_details(task, settings))
        }
    };
    if details.is_empty() {
        Some(title)
    } else {
        Some(format!("{} {}", title, details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::NewTask;
    use crate::model::task::TaskPriority;
    use crate::model::group::PriorityFilter;

    const MIN: u64 = 60_000;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "");
        assert_eq!(format_time(59_999), "");
        assert_eq!(format_time(5 * MIN), "5 min");
        assert_eq!(format_time(60 * MIN), "1 h");
        assert_eq!(format_time(135 * MIN + 30_000), "2 h 15 min");
    }

    #[test]
    fn test_leaf_details() {
        let mut store = TaskStore::new();
        let id = store
            .add_task(None, NewTask::titled("Write docs").estimated(90 * MIN))
            .unwrap();
        let mut settings = TaskSettings::default();
        let task = store.get(id).unwrap();
        assert_eq!(task_details(task, &settings), "(1 h 30 min)");

        settings.enable_actual_time = true;
        assert_eq!(task_details(task, &settings), "(Estimated: 1 h 30 min)");

        store.update_actual_time(id, 45 * MIN).unwrap();
        let task = store.get(id).unwrap();
        assert_eq!(
            task_details(task, &settings),
            "(Estimated: 1 h 30 min, Actual: 45 min)"
        );
    }

    #[test]
    fn test_container_details_roll_up() {
        let mut store = TaskStore::new();
        let parent = store.add_task(None, NewTask::titled("Release")).unwrap();
        let c1 = store
            .add_task(Some(parent), NewTask::titled("Tag").estimated(30 * MIN))
            .unwrap();
        store
            .add_task(Some(parent), NewTask::titled("Publish").estimated(30 * MIN))
            .unwrap();
        store.complete_task(c1).unwrap();
        store.update_actual_time(c1, 20 * MIN).unwrap();

        let settings = TaskSettings::default();
        let task = store.get(parent).unwrap();
        assert_eq!(task_details(task, &settings), "(2 Tasks, 50% Completed, Estimated: 1 h)");

        let settings = TaskSettings {
            enable_actual_time: true,
            ..Default::default()
        };
        assert_eq!(
            task_details(task, &settings),
            "(2 Tasks, 50% Completed, Estimated: 1 h, Actual: 20 min)"
        );
    }

    #[test]
    fn test_group_details() {
        let mut store = TaskStore::new();
        let a = store.add_task(None, NewTask::titled("a")).unwrap();
        store.add_task(None, NewTask::titled("b")).unwrap();
        store
            .add_task(None, NewTask::titled("c").priority(TaskPriority::Important))
            .unwrap();
        store.complete_task(a).unwrap();

        let normal = TaskGroup::bound("Normal", Some(Box::new(PriorityFilter(TaskPriority::Normal))));
        assert_eq!(group_details(&normal, &store), "(2 Tasks, 50% Completed)");

        let empty = TaskGroup::bound("Low", Some(Box::new(PriorityFilter(TaskPriority::Questionable))));
        assert_eq!(group_details(&empty, &store), "(0 Tasks, 0% Completed)");

        let mut all = TaskGroup::named("All Tasks");
        all.add(normal);
        all.add(empty);
        assert_eq!(group_details(&all, &store), "(2 Tasks, 50% Completed)");
    }

    #[test]
    fn test_node_label() {
        let mut store = TaskStore::new();
        let model = TaskTreeModel::new(&store);
        let id = store.add_task(None, NewTask::titled("Buy milk")).unwrap();
        let settings = TaskSettings::default();
        assert_eq!(
            node_label(&model, &store, &settings, TreeNode::Task(id)).as_deref(),
            Some("Buy milk")
        );
        assert_eq!(
            node_label(&model, &store, &settings, model.root()).as_deref(),
            Some("All Tasks (1 Tasks, 0% Completed)")
        );
    }
}
