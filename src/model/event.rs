use super::store::TaskStore;
use super::task::TaskId;

/// A store change notification, carrying the affected task.
///
/// `Pre*` events are dispatched while the store still holds the old state,
/// the others once the mutation has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Added(TaskId),
    PreDeleted(TaskId),
    Deleted(TaskId),
    PreChanged(TaskId),
    Changed(TaskId),
}

impl TaskEvent {
    pub fn task(&self) -> TaskId {
        match *self {
            TaskEvent::Added(id)
            | TaskEvent::PreDeleted(id)
            | TaskEvent::Deleted(id)
            | TaskEvent::PreChanged(id)
            | TaskEvent::Changed(id) => id,
        }
    }
}

/// Subscriber to store changes.
///
/// Listeners are handed a shared borrow of the store, so they can read the
/// current state but cannot mutate it from inside a callback.
pub trait TaskModelListener {
    fn handle_task_event(&mut self, store: &TaskStore, event: &TaskEvent);
}

/// Handle returned on registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// Records every event it sees. Handy for hosts that batch work per event.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<TaskEvent>,
}

impl TaskModelListener for EventLog {
    fn handle_task_event(&mut self, _store: &TaskStore, event: &TaskEvent) {
        self.events.push(*event);
    }
}
