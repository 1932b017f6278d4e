use serde::Serialize;

use crate::model::settings::{DisplayConfig, TaskSettings};
use crate::model::store::TaskStore;
use crate::model::task::{HighlightingType, Task, TaskPriority};
use crate::util::unicode::fit_to_width;
use crate::view::label::{format_time, node_label};
use crate::view::tree_model::{TaskTreeModel, TreeNode};

const TITLE_COLUMN: usize = 40;

// ---------------------------------------------------------------------------
// JSON types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: u64,
    pub title: Option<String>,
    pub priority: TaskPriority,
    /// Priority after propagation from sub-tasks
    pub display_priority: TaskPriority,
    pub completed: bool,
    pub completion: u32,
    pub estimated_ms: u64,
    pub actual_ms: u64,
    pub created_ms: i64,
    pub highlighted: bool,
    pub highlighting_type: HighlightingType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct NodeJson {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeJson>,
}

#[derive(Serialize)]
pub struct ParentJson {
    pub id: u64,
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task, settings: &TaskSettings) -> TaskJson {
    TaskJson {
        id: task.id().value(),
        title: task.title().map(str::to_string),
        priority: task.priority(),
        display_priority: task.effective_priority(settings.priority_propagation()),
        completed: task.is_effectively_completed(),
        completion: task.completion_ratio(),
        estimated_ms: task.effective_estimated_time(),
        actual_ms: task.effective_actual_time(),
        created_ms: task.creation_time(),
        highlighted: task.is_highlighted(),
        highlighting_type: task.highlighting_type(),
        subtasks: task
            .subtasks()
            .iter()
            .map(|t| task_to_json(t, settings))
            .collect(),
    }
}

/// Children of `node` as JSON, recursively
pub fn tree_to_json(
    model: &TaskTreeModel,
    store: &TaskStore,
    settings: &TaskSettings,
    node: TreeNode,
) -> Vec<NodeJson> {
    model
        .children(store, node)
        .into_iter()
        .map(|child| NodeJson {
            kind: if child.is_group() { "group" } else { "task" },
            id: child.as_task().map(|id| id.value()),
            label: node_label(model, store, settings, child).unwrap_or_default(),
            children: tree_to_json(model, store, settings, child),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn status_char(task: &Task) -> char {
    if task.is_effectively_completed() { 'x' } else { ' ' }
}

fn priority_marker(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Important => "!",
        TaskPriority::Normal => " ",
        TaskPriority::Questionable => "?",
    }
}

/// The current tree, one node per line
pub fn format_tree(
    model: &TaskTreeModel,
    store: &TaskStore,
    settings: &TaskSettings,
    display: &DisplayConfig,
) -> Vec<String> {
    let mut lines = Vec::new();
    for child in model.children(store, model.root()) {
        format_node(model, store, settings, display, child, 0, &mut lines);
    }
    lines
}

fn format_node(
    model: &TaskTreeModel,
    store: &TaskStore,
    settings: &TaskSettings,
    display: &DisplayConfig,
    node: TreeNode,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let Some(label) = node_label(model, store, settings, node) else {
        return;
    };
    let indent = " ".repeat(depth * display.indent);
    let line = match node.as_task().and_then(|id| store.get(id)) {
        Some(task) => {
            let id = if display.show_ids {
                format!("{:>3} ", task.id().value())
            } else {
                String::new()
            };
            let highlight = if task.is_highlighted() {
                format!(" <{}>", task.highlighting_type().name().to_lowercase())
            } else {
                String::new()
            };
            format!(
                "{}{}[{}]{} {}{}",
                indent,
                id,
                status_char(task),
                priority_marker(task.effective_priority(settings.priority_propagation())),
                label,
                highlight
            )
        }
        None => format!("{}{}", indent, label),
    };
    lines.push(line);
    for child in model.children(store, node) {
        format_node(model, store, settings, display, child, depth + 1, lines);
    }
}

/// Flat table of every task, pre-order
pub fn format_task_table(store: &TaskStore, settings: &TaskSettings) -> Vec<String> {
    let mut lines = vec![format!(
        "{:>4}  {}  {:<6}  {:>4}  {:<12}  {}",
        "ID",
        fit_to_width("TITLE", TITLE_COLUMN),
        "PRIO",
        "DONE",
        "ESTIMATE",
        "ACTUAL"
    )];
    crate::model::task::for_each_task(store.tasks(), &mut |task| {
        lines.push(format!(
            "{:>4}  {}  {:<6}  {:>3}%  {:<12}  {}",
            task.id().value(),
            fit_to_width(task.title().unwrap_or_default(), TITLE_COLUMN),
            task.effective_priority(settings.priority_propagation()).friendly_name(),
            task.completion_ratio(),
            format_time(task.effective_estimated_time()),
            format_time(task.effective_actual_time()),
        ));
    });
    lines
}

pub fn format_settings(settings: &TaskSettings) -> Vec<String> {
    vec![
        format!("enable-actual-time  {}", settings.enable_actual_time),
        format!("ask-actual          {}", settings.ask_actual_when_complete_task),
        format!("tasks-scope         {}", settings.enable_tasks_scope),
        format!("propagate-priority  {}", settings.propagate_priority),
        format!("one-level-only      {}", settings.one_level_only),
    ]
}

// ---------------------------------------------------------------------------
// Argument parsing
// ---------------------------------------------------------------------------

/// Parse a priority by friendly or stored name, case-insensitively
pub fn parse_priority(s: &str) -> Result<TaskPriority, String> {
    TaskPriority::ALL
        .into_iter()
        .find(|p| p.friendly_name().eq_ignore_ascii_case(s) || p.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown priority '{}' (expected: high, normal, low)", s))
}

pub fn parse_color(s: &str) -> Result<HighlightingType, String> {
    HighlightingType::ALL
        .into_iter()
        .find(|h| h.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown colour '{}' (expected: red, yellow, green)", s))
}

/// Parse a duration into milliseconds: `90m`, `1h`, `1h30m`, `2h 15m`, or
/// bare minutes.
pub fn parse_duration(s: &str) -> Result<u64, String> {
    let invalid = || format!("invalid duration '{}' (expected e.g. 90m, 1h30m, 45)", s);
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(invalid());
    }
    if let Ok(minutes) = compact.parse::<u64>() {
        return minutes.checked_mul(60_000).ok_or_else(invalid);
    }

    let mut minutes = 0u64;
    let mut number = String::new();
    let mut seen_unit = false;
    for c in compact.chars() {
        match c {
            '0'..='9' => number.push(c),
            'h' | 'H' | 'm' | 'M' => {
                let n: u64 = number.parse().map_err(|_| invalid())?;
                let n = if c.eq_ignore_ascii_case(&'h') {
                    n.checked_mul(60).ok_or_else(invalid)?
                } else {
                    n
                };
                minutes = minutes.checked_add(n).ok_or_else(invalid)?;
                number.clear();
                seen_unit = true;
            }
            _ => return Err(invalid()),
        }
    }
    if !number.is_empty() || !seen_unit {
        return Err(invalid());
    }
    minutes.checked_mul(60_000).ok_or_else(invalid)
}
