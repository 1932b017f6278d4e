use std::cell::RefCell;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{read_config, state_file_path};
use crate::io::lock::FileLock;
use crate::io::state_io::{load_state, save_state};
use crate::io::ui_state::{UiState, read_ui_state, write_ui_state};
use crate::model::event::TaskModelListener;
use crate::model::settings::HostConfig;
use crate::model::store::TaskStore;
use crate::model::task::{TaskId, TaskPriority};
use crate::ops::controller::TaskController;
use crate::ops::export::export_text;
use crate::ops::todo_ops::title_from_todo;
use crate::view::refresher::TreeRefresher;
use crate::view::tree_controller::TreeController;
use crate::view::tree_model::{TaskTreeModel, TreeNode};
use crate::view::view_state::TreeViewState;

type CmdResult = Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let file = cli.file.as_deref();

    match cli.command {
        // Read commands
        Commands::Tree => cmd_tree(file, json),
        Commands::List => cmd_list(file, json),
        Commands::Parents(args) => cmd_parents(file, args, json),
        Commands::Export(args) => cmd_export(file, args),

        // Write commands
        Commands::Add(args) => cmd_add(file, args, json),
        Commands::Edit(args) => cmd_edit(file, args),
        Commands::Rm(args) => cmd_rm(file, args),
        Commands::Done(args) => cmd_done(file, args),
        Commands::Undone(args) => cmd_undone(file, args),
        Commands::Highlight(args) => cmd_highlight(file, args),
        Commands::Unhighlight(args) => cmd_unhighlight(file, args),
        Commands::Up(args) => cmd_move(file, args, true),
        Commands::Down(args) => cmd_move(file, args, false),
        Commands::Actual(args) => cmd_actual(file, args),
        Commands::Todo(args) => cmd_todo(file, args, json),
        Commands::Settings(args) => cmd_settings(file, args, json),

        // View toggles
        Commands::Group(args) => cmd_group(file, args),
        Commands::HideCompleted(args) => cmd_hide_completed(file, args),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One load-modify-save cycle against a state file, with the tree view
/// wired up the way the host would wire it.
struct Session {
    dir: PathBuf,
    path: PathBuf,
    config: HostConfig,
    controller: TaskController,
    tree: TreeController<TreeViewState>,
    _lock: Option<FileLock>,
}

impl Session {
    fn open(file: Option<&str>, write: bool) -> Result<Session, Box<dyn Error>> {
        let dir = std::env::current_dir()?;
        let config = read_config(&dir)?;
        let path = match file {
            Some(f) => PathBuf::from(f),
            None => state_file_path(&dir, &config),
        };
        // lock before loading so the whole cycle is serialized
        let lock = if write {
            Some(FileLock::acquire_default(&path)?)
        } else {
            None
        };

        let (store, settings) = load_state(&path)?;
        let mut controller = TaskController::new(store, settings);
        let model = Rc::new(RefCell::new(TaskTreeModel::new(controller.store())));
        let listener: Rc<RefCell<dyn TaskModelListener>> = model.clone();
        controller.add_change_listener(listener);
        let tree = TreeController::new(model, Rc::new(RefCell::new(TreeViewState::new())));

        let ui = read_ui_state(&dir).unwrap_or_default();
        if ui.hide_completed {
            tree.set_hide_completed(controller.store(), true);
        }
        if ui.group_by_priority {
            tree.group_by_priority(controller.store(), true);
        }
        debug!(path = %path.display(), ?ui, "session opened");

        Ok(Session {
            dir,
            path,
            config,
            controller,
            tree,
            _lock: lock,
        })
    }

    fn store(&self) -> &TaskStore {
        self.controller.store()
    }

    /// Tree node for a task id given on the command line
    fn node(&self, raw: u64) -> Result<TreeNode, Box<dyn Error>> {
        let id = TaskId::from_raw(raw);
        if self.store().contains(id) {
            Ok(TreeNode::Task(id))
        } else {
            Err(format!("no task with id {}", raw).into())
        }
    }

    /// Select `node` in both the view and the controller, as a click would
    fn select(&mut self, node: TreeNode) {
        self.tree.select(self.controller.store(), node);
        self.controller.set_selection(vec![node]);
    }

    fn ui_state(&self) -> UiState {
        UiState {
            group_by_priority: self.tree.is_grouped_by_priority(),
            hide_completed: self.tree.hides_completed(),
        }
    }

    fn save(&self) -> CmdResult {
        save_state(&self.path, self.store(), self.controller.settings())?;
        Ok(())
    }
}

fn title_of(session: &Session, id: TaskId) -> String {
    session
        .store()
        .get(id)
        .and_then(|t| t.title())
        .unwrap_or_default()
        .to_string()
}

/// A command the controller declined: report it and succeed
fn rejected(message: String) -> CmdResult {
    eprintln!("note: {}", message);
    Ok(())
}

fn parse_parent(session: &Session, raw: Option<u64>) -> Result<Option<TaskId>, Box<dyn Error>> {
    match raw {
        None => Ok(None),
        Some(raw) => Ok(session.node(raw)?.as_task()),
    }
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_tree(file: Option<&str>, json: bool) -> CmdResult {
    let session = Session::open(file, false)?;
    let model = session.tree.model().borrow();
    let settings = session.controller.settings();

    if json {
        let nodes = tree_to_json(&model, session.store(), settings, model.root());
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }
    let lines = format_tree(&model, session.store(), settings, &session.config.display);
    if lines.is_empty() {
        println!("(no tasks)");
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_list(file: Option<&str>, json: bool) -> CmdResult {
    let session = Session::open(file, false)?;
    let settings = session.controller.settings();

    if json {
        let tasks: Vec<TaskJson> = session
            .store()
            .tasks()
            .iter()
            .map(|t| task_to_json(t, settings))
            .collect();
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }
    for line in format_task_table(session.store(), settings) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_parents(file: Option<&str>, args: IdArg, json: bool) -> CmdResult {
    let session = Session::open(file, false)?;
    let id = session
        .node(args.id)?
        .as_task()
        .ok_or("not a task")?;
    let parents: Vec<ParentJson> = session
        .controller
        .find_possible_parents(id)
        .into_iter()
        .map(|p| ParentJson {
            id: p.value(),
            title: session.store().get(p).and_then(|t| t.title()).map(str::to_string),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&parents)?);
        return Ok(());
    }
    let current = session.controller.find_parent_for(id);
    for p in parents {
        let marker = if current.map(TaskId::value) == Some(p.id) { "*" } else { " " };
        println!("{}{:>4}  {}", marker, p.id, p.title.unwrap_or_default());
    }
    Ok(())
}

fn cmd_export(file: Option<&str>, args: ExportArgs) -> CmdResult {
    let session = Session::open(file, false)?;
    let text = export_text(
        &session.tree.model().borrow(),
        session.store(),
        session.config.display.indent,
    );
    match args.out {
        Some(out) => {
            fs::write(&out, text).map_err(|e| format!("could not write {}: {}", out, e))?;
            println!("Exported to {}", out);
        }
        None => print!("{}", text),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_add(file: Option<&str>, args: AddArgs, json: bool) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let title = args.title.trim();
    if title.is_empty() {
        return Err("task title must not be empty".into());
    }
    let parent = parse_parent(&session, args.parent)?;
    let priority = args
        .priority
        .as_deref()
        .map(parse_priority)
        .transpose()?
        .unwrap_or_default();
    let estimate = args.estimate.as_deref().map(parse_duration).transpose()?.unwrap_or(0);

    let id = session.controller.add_task(parent, title, priority, estimate)?;
    session.save()?;
    report_added(id, title, json)
}

fn report_added(id: TaskId, title: &str, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::json!({ "id": id.value(), "title": title }));
    } else {
        println!("Added task {}: {}", id, title);
    }
    Ok(())
}

fn cmd_edit(file: Option<&str>, args: EditArgs) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let node = session.node(args.id)?;
    if !session.controller.can_edit(node) {
        return rejected(format!("task {} cannot be edited", args.id));
    }
    let id = TaskId::from_raw(args.id);
    let (current_priority, current_estimate) = match session.store().get(id) {
        Some(t) => (t.priority(), t.estimated_time()),
        None => (TaskPriority::default(), 0),
    };

    let parent = match args.parent.as_deref() {
        None => session.controller.find_parent_for(id),
        Some("root") => None,
        Some(raw) => {
            let raw: u64 = raw
                .parse()
                .map_err(|_| format!("invalid parent '{}' (expected a task id or 'root')", raw))?;
            parse_parent(&session, Some(raw))?
        }
    };
    let title = args
        .title
        .or_else(|| session.store().get(id).and_then(|t| t.title()).map(str::to_string));
    let priority = match args.priority.as_deref() {
        Some(p) => parse_priority(p)?,
        None => current_priority,
    };
    let estimate = match args.estimate.as_deref() {
        Some(e) => parse_duration(e)?,
        None => current_estimate,
    };

    session.select(node);
    session
        .controller
        .update_task(id, parent, title, priority, estimate)?;
    session.save()?;
    println!("Updated task {}", id);
    Ok(())
}

fn cmd_rm(file: Option<&str>, args: IdArg) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let node = session.node(args.id)?;
    let title = title_of(&session, TaskId::from_raw(args.id));
    session.select(node);
    if !session.controller.delete_task(node)? {
        return rejected(format!("task {} cannot be deleted", args.id));
    }
    session.save()?;
    println!("Deleted task {}: {}", args.id, title);
    Ok(())
}

fn cmd_done(file: Option<&str>, args: DoneArgs) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let node = session.node(args.id)?;
    let actual = args.actual.as_deref().map(parse_duration).transpose()?;
    if actual.is_some() && !session.controller.settings().records_actual_on_complete() {
        eprintln!(
            "note: actual time ignored; enable it with `tt settings --enable-actual-time true --ask-actual true`"
        );
    }

    session.select(node);
    if !session.controller.complete_with_actual_time(node, actual)? {
        return rejected(format!(
            "task {} cannot be completed (already done, or it has sub-tasks)",
            args.id
        ));
    }
    session.save()?;
    println!("Completed task {}", args.id);
    Ok(())
}

fn cmd_undone(file: Option<&str>, args: IdArg) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let node = session.node(args.id)?;
    session.select(node);
    if !session.controller.uncomplete_task(node)? {
        return rejected(format!(
            "task {} cannot be reopened (not done, or it has sub-tasks)",
            args.id
        ));
    }
    session.save()?;
    println!("Reopened task {}", args.id);
    Ok(())
}

fn cmd_highlight(file: Option<&str>, args: HighlightArgs) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let node = session.node(args.id)?;
    let color = args.color.as_deref().map(parse_color).transpose()?;

    session.select(node);
    let recolored = match color {
        Some(kind) => session.controller.set_task_highlighting_type(node, kind)?,
        None => false,
    };
    let highlighted = session.controller.highlight_task(node)?;
    if !recolored && !highlighted {
        return rejected(format!("task {} is already highlighted", args.id));
    }
    session.save()?;
    println!("Highlighted task {}", args.id);
    Ok(())
}

fn cmd_unhighlight(file: Option<&str>, args: IdArg) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let node = session.node(args.id)?;
    session.select(node);
    if !session.controller.unhighlight_task(node)? {
        return rejected(format!("task {} is not highlighted", args.id));
    }
    session.save()?;
    println!("Removed highlight from task {}", args.id);
    Ok(())
}

fn cmd_move(file: Option<&str>, args: IdArg, up: bool) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let node = session.node(args.id)?;
    session.select(node);
    let moved = if up {
        session.controller.move_up(node)?
    } else {
        session.controller.move_down(node)?
    };
    if !moved {
        let edge = if up { "first" } else { "last" };
        return rejected(format!("task {} is already {} among its siblings", args.id, edge));
    }
    session.save()?;
    println!("Moved task {} {}", args.id, if up { "up" } else { "down" });
    Ok(())
}

fn cmd_actual(file: Option<&str>, args: ActualArgs) -> CmdResult {
    let mut session = Session::open(file, true)?;
    let id = session.node(args.id)?.as_task().ok_or("not a task")?;
    let ms = parse_duration(&args.duration)?;
    session.controller.update_actual_time(id, ms)?;
    session.save()?;
    if !session.controller.settings().enable_actual_time {
        eprintln!("note: actual time is recorded but hidden until `--enable-actual-time true`");
    }
    println!("Recorded actual time for task {}", id);
    Ok(())
}

fn cmd_todo(file: Option<&str>, args: TodoArgs, json: bool) -> CmdResult {
    let Some(title) = title_from_todo(&args.comment) else {
        return rejected("no task text in comment".to_string());
    };
    let mut session = Session::open(file, true)?;
    let priority = match args.priority.as_deref() {
        Some(p) => parse_priority(p)?,
        None => TaskPriority::default(),
    };
    let id = session.controller.add_task(None, title.as_str(), priority, 0)?;
    session.save()?;
    report_added(id, &title, json)
}

fn cmd_settings(file: Option<&str>, args: SettingsArgs, json: bool) -> CmdResult {
    if args.is_empty() {
        let session = Session::open(file, false)?;
        let settings = session.controller.settings();
        if json {
            println!("{}", serde_json::to_string_pretty(settings)?);
        } else {
            for line in format_settings(settings) {
                println!("{}", line);
            }
        }
        return Ok(());
    }

    let mut session = Session::open(file, true)?;
    let mut settings = *session.controller.settings();
    if let Some(v) = args.enable_actual_time {
        settings.enable_actual_time = v;
    }
    if let Some(v) = args.ask_actual {
        settings.ask_actual_when_complete_task = v;
    }
    if let Some(v) = args.tasks_scope {
        settings.enable_tasks_scope = v;
    }
    if let Some(v) = args.propagate_priority {
        settings.propagate_priority = v;
    }
    if let Some(v) = args.one_level_only {
        settings.one_level_only = v;
    }
    if settings == *session.controller.settings() {
        return rejected("settings unchanged".to_string());
    }
    session.controller.set_settings(settings);
    session.tree.settings_changed(session.controller.store());
    session.save()?;
    for line in format_settings(&settings) {
        println!("{}", line);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// View toggles
// ---------------------------------------------------------------------------

fn cmd_group(file: Option<&str>, args: ToggleArgs) -> CmdResult {
    let session = Session::open(file, false)?;
    let enable = args.state.enabled();
    TreeRefresher::new().rebuild(&session.tree, session.store(), |tree, store| {
        tree.group_by_priority(store, enable)
    });
    persist_ui_state(&session.dir, &session.ui_state())?;
    println!("Group by priority: {}", on_off(enable));
    Ok(())
}

fn cmd_hide_completed(file: Option<&str>, args: ToggleArgs) -> CmdResult {
    let session = Session::open(file, false)?;
    let enable = args.state.enabled();
    TreeRefresher::new().rebuild(&session.tree, session.store(), |tree, store| {
        tree.set_hide_completed(store, enable)
    });
    persist_ui_state(&session.dir, &session.ui_state())?;
    println!("Hide completed: {}", on_off(enable));
    Ok(())
}

fn persist_ui_state(dir: &Path, state: &UiState) -> CmdResult {
    write_ui_state(dir, state).map_err(|e| format!("could not save view settings: {}", e))?;
    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
