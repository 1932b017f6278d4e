use serde::{Deserialize, Serialize};

use super::task::PriorityPropagation;

/// Plugin options, persisted in the `<options>` block of the state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskSettings {
    /// Track and show actual time next to estimates
    #[serde(default)]
    pub enable_actual_time: bool,
    /// Ask for the actual time when a task is completed
    #[serde(default)]
    pub ask_actual_when_complete_task: bool,
    #[serde(default)]
    pub enable_tasks_scope: bool,
    /// Show the most urgent sub-task priority on the parent
    #[serde(default)]
    pub propagate_priority: bool,
    /// Limit priority propagation to direct sub-tasks
    #[serde(default)]
    pub one_level_only: bool,
}

impl TaskSettings {
    pub fn priority_propagation(&self) -> PriorityPropagation {
        match (self.propagate_priority, self.one_level_only) {
            (false, _) => PriorityPropagation::None,
            (true, true) => PriorityPropagation::OneLevel,
            (true, false) => PriorityPropagation::Subtree,
        }
    }

    /// Whether completing a task should record an actual time first
    pub fn records_actual_on_complete(&self) -> bool {
        self.enable_actual_time && self.ask_actual_when_complete_task
    }
}

/// Host configuration, read from `tasktree.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// State file, relative to the config file's directory
    #[serde(default = "default_state_file")]
    pub file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            file: default_state_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Spaces per nesting level in tree and export output
    #[serde(default = "default_indent")]
    pub indent: usize,
    /// Prefix tree lines with task ids
    #[serde(default = "default_true")]
    pub show_ids: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            indent: default_indent(),
            show_ids: true,
        }
    }
}

fn default_state_file() -> String {
    "tasks.xml".to_string()
}

fn default_indent() -> usize {
    4
}

fn default_true() -> bool {
    true
}
