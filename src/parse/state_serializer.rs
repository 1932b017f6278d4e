use super::xml::{Element, write_document};
use crate::model::settings::TaskSettings;
use crate::model::store::TaskStore;
use crate::model::task::Task;

pub const COMPONENT_NAME: &str = "Tasks";

/// Serialize the store and settings to a state document.
///
/// Stored values are written, never the rolled-up ones, so a container's
/// own estimate survives a round trip.
pub fn serialize_state(store: &TaskStore, settings: &TaskSettings) -> String {
    write_document(&state_element(store, settings))
}

pub fn state_element(store: &TaskStore, settings: &TaskSettings) -> Element {
    let mut root = Element::new("component").with_attr("name", COMPONENT_NAME);
    let mut tasks = Element::new("tasks");
    for task in store.tasks() {
        tasks.push(task_element(task));
    }
    root.push(tasks);
    root.push(options_element(settings));
    root
}

fn task_element(task: &Task) -> Element {
    let mut element = Element::new("task")
        .with_attr("priority", task.priority().name())
        .with_attr("completed", task.completed_flag().to_string())
        .with_attr("estimated", task.estimated_time().to_string())
        .with_attr("created", task.creation_time().to_string())
        .with_attr("actual", task.actual_time().to_string())
        .with_attr("highlighted", task.is_highlighted().to_string())
        .with_attr("highlightingtype", task.highlighting_type().name());
    if let Some(title) = task.title() {
        element = element.with_attr("title", title);
    }
    for sub in task.subtasks() {
        element.push(task_element(sub));
    }
    element
}

fn options_element(settings: &TaskSettings) -> Element {
    Element::new("options")
        .with_attr("enableActualTime", settings.enable_actual_time.to_string())
        .with_attr(
            "askActualWhenCompleteTask",
            settings.ask_actual_when_complete_task.to_string(),
        )
        .with_attr("enableTasksScope", settings.enable_tasks_scope.to_string())
        .with_attr("propagatePriority", settings.propagate_priority.to_string())
        .with_attr("oneLevelOnly", settings.one_level_only.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::NewTask;
    use crate::model::task::{HighlightingType, TaskPriority};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serialize_single_task() {
        let mut store = TaskStore::new();
        let id = store
            .add_task(
                None,
                NewTask {
                    title: Some("Buy <milk>".into()),
                    priority: TaskPriority::Questionable,
                    estimated_time: 600_000,
                    creation_time: Some(42),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .set_task_highlighting_type(id, HighlightingType::Yellow)
            .unwrap();

        let out = serialize_state(&store, &TaskSettings::default());
        assert_eq!(
            out,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <component name=\"Tasks\">\n  \
             <tasks>\n    \
             <task priority=\"Questionable\" completed=\"false\" estimated=\"600000\" created=\"42\" \
             actual=\"0\" highlighted=\"false\" highlightingtype=\"Yellow\" title=\"Buy &lt;milk&gt;\"/>\n  \
             </tasks>\n  \
             <options enableActualTime=\"false\" askActualWhenCompleteTask=\"false\" \
             enableTasksScope=\"false\" propagatePriority=\"false\" oneLevelOnly=\"false\"/>\n\
             </component>\n"
        );
    }

    #[test]
    fn test_container_writes_stored_estimate() {
        let mut store = TaskStore::new();
        let parent = store
            .add_task(None, NewTask::titled("P").estimated(1_000))
            .unwrap();
        store
            .add_task(Some(parent), NewTask::titled("C").estimated(5_000))
            .unwrap();
        let root = state_element(&store, &TaskSettings::default());
        let p = &root.child("tasks").unwrap().children[0];
        assert_eq!(p.attr("estimated"), Some("1000"));
        assert_eq!(p.children[0].attr("estimated"), Some("5000"));
    }

    #[test]
    fn test_untitled_task_has_no_title_attribute() {
        let mut store = TaskStore::new();
        store.add_task(None, NewTask::default()).unwrap();
        let root = state_element(&store, &TaskSettings::default());
        assert_eq!(root.child("tasks").unwrap().children[0].attr("title"), None);
    }
}
