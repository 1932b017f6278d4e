use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tt", about = concat!("tasktree v", env!("CARGO_PKG_VERSION"), " - nested to-dos with priorities and estimates"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// State file to use (default: from tasktree.toml, else ./tasks.xml)
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the task tree as currently grouped and filtered
    Tree,
    /// List every task in a flat table
    List,
    /// Add a task
    Add(AddArgs),
    /// Change a task's title, parent, priority or estimate
    Edit(EditArgs),
    /// Delete a task and its sub-tasks
    Rm(IdArg),
    /// Mark a task completed
    Done(DoneArgs),
    /// Mark a task not completed
    Undone(IdArg),
    /// Highlight a task
    Highlight(HighlightArgs),
    /// Remove a task's highlight
    Unhighlight(IdArg),
    /// Move a task above its previous sibling
    Up(IdArg),
    /// Move a task below its next sibling
    Down(IdArg),
    /// Record the actual time spent on a task
    Actual(ActualArgs),
    /// Group top-level tasks by priority
    Group(ToggleArgs),
    /// Hide completed top-level tasks
    HideCompleted(ToggleArgs),
    /// Export the current tree as indented text
    Export(ExportArgs),
    /// List the tasks a task could be moved under
    Parents(IdArg),
    /// Add a task from the text of a TODO comment
    Todo(TodoArgs),
    /// Show or change settings
    Settings(SettingsArgs),
}

#[derive(Args)]
pub struct IdArg {
    /// Task ID (as shown by `tt tree`)
    pub id: u64,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Parent task ID
    #[arg(long)]
    pub parent: Option<u64>,
    /// Priority: high, normal or low
    #[arg(long)]
    pub priority: Option<String>,
    /// Estimated time, e.g. 90m, 1h30m, 2h 15m
    #[arg(long)]
    pub estimate: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: u64,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New parent task ID, or `root` for the top level
    #[arg(long)]
    pub parent: Option<String>,
    /// New priority: high, normal or low
    #[arg(long)]
    pub priority: Option<String>,
    /// New estimated time
    #[arg(long)]
    pub estimate: Option<String>,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Task ID
    pub id: u64,
    /// Actual time spent, recorded when actual-time tracking asks for it
    #[arg(long)]
    pub actual: Option<String>,
}

#[derive(Args)]
pub struct HighlightArgs {
    /// Task ID
    pub id: u64,
    /// Highlight colour: red, yellow or green
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct ActualArgs {
    /// Task ID
    pub id: u64,
    /// Time spent, e.g. 45m or 1h
    pub duration: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Toggle::On)
    }
}

#[derive(Args)]
pub struct ToggleArgs {
    #[arg(value_enum)]
    pub state: Toggle,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Args)]
pub struct TodoArgs {
    /// Comment text, e.g. "// TODO: handle timeouts"
    pub comment: String,
    /// Priority for the new task
    #[arg(long)]
    pub priority: Option<String>,
}

#[derive(Args)]
pub struct SettingsArgs {
    /// Track actual time next to estimates
    #[arg(long)]
    pub enable_actual_time: Option<bool>,
    /// Ask for the actual time when completing a task
    #[arg(long)]
    pub ask_actual: Option<bool>,
    #[arg(long)]
    pub tasks_scope: Option<bool>,
    /// Show the most urgent sub-task priority on parents
    #[arg(long)]
    pub propagate_priority: Option<bool>,
    /// Limit priority propagation to direct sub-tasks
    #[arg(long)]
    pub one_level_only: Option<bool>,
}

impl SettingsArgs {
    pub fn is_empty(&self) -> bool {
        self.enable_actual_time.is_none()
            && self.ask_actual.is_none()
            && self.tasks_scope.is_none()
            && self.propagate_priority.is_none()
            && self.one_level_only.is_none()
    }
}
