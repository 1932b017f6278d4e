use tracing::{debug, warn};

use super::xml::{Element, ParseError, parse_document};
use crate::model::settings::TaskSettings;
use crate::model::store::{NewTask, TaskStore};
use crate::model::task::{HighlightingType, TaskId, TaskPriority};

/// Parse a state document into a fresh store plus the stored settings.
pub fn parse_state(input: &str) -> Result<(TaskStore, TaskSettings), ParseError> {
    let root = parse_document(input)?;
    let mut store = TaskStore::new();
    load_tasks(&mut store, &root)?;
    Ok((store, parse_settings(root.child("options"))))
}

/// Replay the `<tasks>` block of `root` into `store`, firing the usual
/// add events. A missing block loads nothing.
pub fn load_tasks(store: &mut TaskStore, root: &Element) -> Result<usize, ParseError> {
    let Some(tasks) = root.child("tasks") else {
        debug!("no <tasks> element, starting empty");
        return Ok(0);
    };
    let mut count = 0;
    for element in tasks.children_named("task") {
        load_task(store, None, element, &mut count)?;
    }
    debug!(count, "tasks loaded");
    Ok(count)
}

fn load_task(
    store: &mut TaskStore,
    parent: Option<TaskId>,
    element: &Element,
    count: &mut usize,
) -> Result<(), ParseError> {
    let new = NewTask {
        title: read_title(element),
        priority: read_priority(element),
        estimated_time: read_u64(element, "estimated"),
        actual_time: read_u64(element, "actual"),
        creation_time: Some(read_created(element)),
        completed: read_bool(element, "completed"),
        highlighted: read_bool(element, "highlighted"),
    };
    let id = store.add_task(parent, new)?;
    store.set_task_highlighting_type(id, read_highlighting(element))?;
    *count += 1;

    for child in element.children_named("task") {
        load_task(store, Some(id), child, count)?;
    }
    Ok(())
}

/// Settings from the `<options>` element; defaults when it is absent.
pub fn parse_settings(options: Option<&Element>) -> TaskSettings {
    let Some(options) = options else {
        return TaskSettings::default();
    };
    TaskSettings {
        enable_actual_time: read_bool(options, "enableActualTime"),
        ask_actual_when_complete_task: read_bool(options, "askActualWhenCompleteTask"),
        enable_tasks_scope: read_bool(options, "enableTasksScope"),
        propagate_priority: read_bool(options, "propagatePriority"),
        one_level_only: read_bool(options, "oneLevelOnly"),
    }
}

// ---------------------------------------------------------------------------
// Lenient attribute readers
// ---------------------------------------------------------------------------

/// `title` attribute, else the element's text (older files), else nothing
fn read_title(element: &Element) -> Option<String> {
    match element.attr("title") {
        Some(title) if !title.is_empty() => Some(title.to_string()),
        _ => {
            let text = element.text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
    }
}

fn read_bool(element: &Element, key: &str) -> bool {
    element
        .attr(key)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn read_u64(element: &Element, key: &str) -> u64 {
    match element.attr(key) {
        None => 0,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(attribute = key, value = raw, "unreadable duration, using 0");
            0
        }),
    }
}

fn read_created(element: &Element) -> i64 {
    let now = || chrono::Utc::now().timestamp_millis();
    match element.attr("created") {
        None => now(),
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(value = raw, "unreadable creation time, using now");
            now()
        }),
    }
}

fn read_priority(element: &Element) -> TaskPriority {
    match element.attr("priority") {
        None => TaskPriority::default(),
        Some(raw) => TaskPriority::from_name(raw.trim()).unwrap_or_else(|| {
            warn!(value = raw, "unknown priority, using Normal");
            TaskPriority::default()
        }),
    }
}

fn read_highlighting(element: &Element) -> HighlightingType {
    match element.attr("highlightingtype") {
        None => HighlightingType::default(),
        Some(raw) => HighlightingType::from_name(raw.trim()).unwrap_or_else(|| {
            warn!(value = raw, "unknown highlighting type, using Red");
            HighlightingType::default()
        }),
    }
}
