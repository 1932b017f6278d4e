use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::store::TaskStore;
use super::task::{Task, TaskPriority};

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one constructed group. A rebuilt group gets a fresh id even
/// when its title and filter are the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u64);

impl GroupId {
    fn next() -> Self {
        GroupId(NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Predicate selecting top-level tasks for a bound group.
///
/// Must be pure: callers interleave `size()` and `get()` assuming the
/// answer does not change between calls.
pub trait TaskFilter {
    fn accept(&self, task: &Task) -> bool;
}

impl<F: Fn(&Task) -> bool> TaskFilter for F {
    fn accept(&self, task: &Task) -> bool {
        self(task)
    }
}

/// Accepts tasks with exactly this priority
#[derive(Debug, Clone, Copy)]
pub struct PriorityFilter(pub TaskPriority);

impl TaskFilter for PriorityFilter {
    fn accept(&self, task: &Task) -> bool {
        task.priority() == self.0
    }
}

/// Rejects effectively completed tasks
#[derive(Debug, Clone, Copy)]
pub struct IncompleteFilter;

impl TaskFilter for IncompleteFilter {
    fn accept(&self, task: &Task) -> bool {
        !task.is_effectively_completed()
    }
}

/// Accepts what every inner filter accepts
pub struct AllOf(pub Vec<Box<dyn TaskFilter>>);

impl TaskFilter for AllOf {
    fn accept(&self, task: &Task) -> bool {
        self.0.iter().all(|f| f.accept(task))
    }
}

enum GroupKind {
    /// Named container of other groups
    Static(Vec<TaskGroup>),
    /// Live view over the store's top-level tasks
    Bound(Option<Box<dyn TaskFilter>>),
}

/// One child of a group: a nested group (static mode) or a task (bound mode)
#[derive(Debug, Clone, Copy)]
pub enum GroupEntry<'a> {
    Group(&'a TaskGroup),
    Task(&'a Task),
}

/// A read-only projection over the store, or a container of such projections.
pub struct TaskGroup {
    id: GroupId,
    title: String,
    kind: GroupKind,
}

impl fmt::Debug for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("TaskGroup");
        d.field("id", &self.id).field("title", &self.title);
        match &self.kind {
            GroupKind::Static(groups) => d.field("groups", groups),
            GroupKind::Bound(filter) => d.field("filtered", &filter.is_some()),
        };
        d.finish()
    }
}

impl TaskGroup {
    /// An empty static container
    pub fn named(title: impl Into<String>) -> Self {
        TaskGroup {
            id: GroupId::next(),
            title: title.into(),
            kind: GroupKind::Static(Vec::new()),
        }
    }

    /// A live view of the store's top-level tasks passing `filter`
    pub fn bound(title: impl Into<String>, filter: Option<Box<dyn TaskFilter>>) -> Self {
        TaskGroup {
            id: GroupId::next(),
            title: title.into(),
            kind: GroupKind::Bound(filter),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.kind, GroupKind::Bound(_))
    }

    /// The priority this group stands for, when titled after one
    pub fn priority(&self) -> Option<TaskPriority> {
        TaskPriority::from_friendly_name(&self.title)
    }

    /// Append a child group. Ignored for bound groups.
    pub fn add(&mut self, group: TaskGroup) {
        match &mut self.kind {
            GroupKind::Static(groups) => groups.push(group),
            GroupKind::Bound(_) => {
                trace!(group = %self.title, "add ignored on bound group");
            }
        }
    }

    /// Nested groups (empty for bound groups)
    pub fn groups(&self) -> &[TaskGroup] {
        match &self.kind {
            GroupKind::Static(groups) => groups,
            GroupKind::Bound(_) => &[],
        }
    }

    /// Top-level store tasks visible through this group, in store order
    pub fn tasks<'s>(&'s self, store: &'s TaskStore) -> impl Iterator<Item = &'s Task> + 's {
        let filter = match &self.kind {
            GroupKind::Bound(filter) => Some(filter.as_deref()),
            GroupKind::Static(_) => None,
        };
        store
            .tasks()
            .iter()
            .filter(move |t| match filter {
                Some(Some(f)) => f.accept(t),
                Some(None) => true,
                None => false,
            })
    }

    pub fn size(&self, store: &TaskStore) -> usize {
        match &self.kind {
            GroupKind::Static(groups) => groups.len(),
            GroupKind::Bound(None) => store.len(),
            GroupKind::Bound(Some(_)) => self.tasks(store).count(),
        }
    }

    pub fn get<'s>(&'s self, store: &'s TaskStore, index: usize) -> Option<GroupEntry<'s>> {
        match &self.kind {
            GroupKind::Static(groups) => groups.get(index).map(GroupEntry::Group),
            GroupKind::Bound(_) => self.tasks(store).nth(index).map(GroupEntry::Task),
        }
    }

    /// Look up a group by id in this group and below
    pub fn find_group(&self, id: GroupId) -> Option<&TaskGroup> {
        if self.id == id {
            return Some(self);
        }
        self.groups().iter().find_map(|g| g.find_group(id))
    }
}
