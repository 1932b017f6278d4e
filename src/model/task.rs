use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-issued task identity. Never reused within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub fn value(self) -> u64 {
        self.0
    }

    /// Rebuild an id from its numeric form (CLI arguments, persisted UI state).
    pub fn from_raw(raw: u64) -> Self {
        TaskId(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority, in declaration order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskPriority {
    Important,
    #[default]
    Normal,
    Questionable,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [
        TaskPriority::Important,
        TaskPriority::Normal,
        TaskPriority::Questionable,
    ];

    /// The variant name, as written to the persisted state
    pub fn name(self) -> &'static str {
        match self {
            TaskPriority::Important => "Important",
            TaskPriority::Normal => "Normal",
            TaskPriority::Questionable => "Questionable",
        }
    }

    /// The name shown to users (and used as the priority group title)
    pub fn friendly_name(self) -> &'static str {
        match self {
            TaskPriority::Important => "High",
            TaskPriority::Normal => "Normal",
            TaskPriority::Questionable => "Low",
        }
    }

    /// Parse a variant name (`Important`, `Normal`, `Questionable`)
    pub fn from_name(s: &str) -> Option<TaskPriority> {
        TaskPriority::ALL.into_iter().find(|p| p.name() == s)
    }

    /// Parse a friendly name (`High`, `Normal`, `Low`)
    pub fn from_friendly_name(s: &str) -> Option<TaskPriority> {
        TaskPriority::ALL.into_iter().find(|p| p.friendly_name() == s)
    }

    fn rank(self) -> u8 {
        match self {
            TaskPriority::Important => 2,
            TaskPriority::Normal => 1,
            TaskPriority::Questionable => 0,
        }
    }

    /// The more urgent of the two priorities
    pub fn max(self, other: TaskPriority) -> TaskPriority {
        if other.rank() > self.rank() { other } else { self }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.friendly_name())
    }
}

/// Highlight colour for a highlighted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HighlightingType {
    #[default]
    Red,
    Yellow,
    Green,
}

impl HighlightingType {
    pub const ALL: [HighlightingType; 3] = [
        HighlightingType::Red,
        HighlightingType::Yellow,
        HighlightingType::Green,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HighlightingType::Red => "Red",
            HighlightingType::Yellow => "Yellow",
            HighlightingType::Green => "Green",
        }
    }

    pub fn from_name(s: &str) -> Option<HighlightingType> {
        HighlightingType::ALL.into_iter().find(|h| h.name() == s)
    }
}

/// How far down the subtree a task's displayed priority is looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityPropagation {
    /// Own priority only
    None,
    /// Own priority and direct sub-tasks
    OneLevel,
    /// Own priority and the whole subtree
    Subtree,
}

/// A task and its owned sub-tasks.
///
/// Fields are read through accessors; only the store mutates them.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    title: Option<String>,
    priority: TaskPriority,
    /// Milliseconds
    estimated_time: u64,
    /// Milliseconds
    actual_time: u64,
    /// Epoch milliseconds
    creation_time: i64,
    completed: bool,
    highlighted: bool,
    highlighting_type: HighlightingType,
    subtasks: Vec<Task>,
    parent: Option<TaskId>,
}

impl Task {
    pub(crate) fn new(id: TaskId, title: Option<String>, priority: TaskPriority) -> Self {
        Task {
            id,
            title: non_empty(title),
            priority,
            estimated_time: 0,
            actual_time: 0,
            creation_time: chrono::Utc::now().timestamp_millis(),
            completed: false,
            highlighted: false,
            highlighting_type: HighlightingType::Red,
            subtasks: Vec::new(),
            parent: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Stored estimate; see [`Task::effective_estimated_time`] for the rolled-up value
    pub fn estimated_time(&self) -> u64 {
        self.estimated_time
    }

    /// Stored actual time; see [`Task::effective_actual_time`]
    pub fn actual_time(&self) -> u64 {
        self.actual_time
    }

    pub fn creation_time(&self) -> i64 {
        self.creation_time
    }

    /// Stored completion flag; see [`Task::is_effectively_completed`]
    pub fn completed_flag(&self) -> bool {
        self.completed
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn highlighting_type(&self) -> HighlightingType {
        self.highlighting_type
    }

    pub fn subtasks(&self) -> &[Task] {
        &self.subtasks
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        self.subtasks.is_empty()
    }

    pub fn index_of(&self, child: TaskId) -> Option<usize> {
        self.subtasks.iter().position(|t| t.id == child)
    }

    // --- derived attributes ---

    /// Sum of the children's effective estimates, or the own estimate for a
    /// leaf. Saturates at `u64::MAX`.
    pub fn effective_estimated_time(&self) -> u64 {
        if self.subtasks.is_empty() {
            self.estimated_time
        } else {
            self.subtasks
                .iter()
                .fold(0u64, |acc, t| acc.saturating_add(t.effective_estimated_time()))
        }
    }

    pub fn effective_actual_time(&self) -> u64 {
        if self.subtasks.is_empty() {
            self.actual_time
        } else {
            self.subtasks
                .iter()
                .fold(0u64, |acc, t| acc.saturating_add(t.effective_actual_time()))
        }
    }

    /// A leaf uses its own flag; a container is complete when every child is.
    pub fn is_effectively_completed(&self) -> bool {
        if self.subtasks.is_empty() {
            self.completed
        } else {
            self.subtasks.iter().all(Task::is_effectively_completed)
        }
    }

    /// 0 or 100 for a leaf, truncated mean of the children otherwise
    pub fn completion_ratio(&self) -> u32 {
        if self.subtasks.is_empty() {
            return if self.is_effectively_completed() { 100 } else { 0 };
        }
        let total: u32 = self.subtasks.iter().map(Task::completion_ratio).sum();
        total / self.subtasks.len() as u32
    }

    /// Priority used for display, looked up according to `propagation`
    pub fn effective_priority(&self, propagation: PriorityPropagation) -> TaskPriority {
        match propagation {
            PriorityPropagation::None => self.priority,
            PriorityPropagation::OneLevel => self
                .subtasks
                .iter()
                .fold(self.priority, |acc, t| acc.max(t.priority)),
            PriorityPropagation::Subtree => self.subtasks.iter().fold(self.priority, |acc, t| {
                acc.max(t.effective_priority(PriorityPropagation::Subtree))
            }),
        }
    }

    /// Whether `id` is this task or sits anywhere below it
    pub fn contains(&self, id: TaskId) -> bool {
        self.id == id || self.subtasks.iter().any(|t| t.contains(id))
    }

    // --- store-only mutation ---

    pub(crate) fn set_title(&mut self, title: Option<String>) {
        self.title = non_empty(title);
    }

    pub(crate) fn set_priority(&mut self, priority: TaskPriority) {
        self.priority = priority;
    }

    pub(crate) fn set_estimated_time(&mut self, ms: u64) {
        self.estimated_time = ms;
    }

    pub(crate) fn set_actual_time(&mut self, ms: u64) {
        self.actual_time = ms;
    }

    pub(crate) fn set_creation_time(&mut self, epoch_ms: i64) {
        self.creation_time = epoch_ms;
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    pub(crate) fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    pub(crate) fn set_highlighting_type(&mut self, kind: HighlightingType) {
        self.highlighting_type = kind;
    }

    pub(crate) fn set_parent(&mut self, parent: Option<TaskId>) {
        self.parent = parent;
    }

    pub(crate) fn subtasks_mut(&mut self) -> &mut Vec<Task> {
        &mut self.subtasks
    }
}

/// An empty title is no title
fn non_empty(title: Option<String>) -> Option<String> {
    title.filter(|t| !t.is_empty())
}

/// Find a task by id anywhere in a list (including sub-tasks).
pub fn find_task_in_list(tasks: &[Task], id: TaskId) -> Option<&Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(t) = find_task_in_list(&task.subtasks, id) {
            return Some(t);
        }
    }
    None
}

pub(crate) fn find_task_mut_in_list(tasks: &mut [Task], id: TaskId) -> Option<&mut Task> {
    for task in tasks.iter_mut() {
        if task.id == id {
            return Some(task);
        }
        if let Some(t) = find_task_mut_in_list(&mut task.subtasks, id) {
            return Some(t);
        }
    }
    None
}

/// Visit every task in pre-order.
pub fn for_each_task(tasks: &[Task], f: &mut dyn FnMut(&Task)) {
    for task in tasks {
        f(task);
        for_each_task(&task.subtasks, f);
    }
}
