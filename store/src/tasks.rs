//! # Task Store — one user's task collection with transparent persistence
//!
//! [`TaskStore`] owns the in-memory task collection for the active user and
//! writes it back through a [`KvStore`] after every mutation. The persistence
//! key is derived from the user's email (`tasks:<email>`), so switching users
//! switches the namespace and collections are never shared.
//!
//! ## Read path
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`load`](TaskStore::load) | Reads and deserializes the namespace's collection. A corrupt or unreadable value degrades to an empty collection with a logged warning rather than an error. |
//! | [`guest`](TaskStore::guest) | No namespace: an empty collection that is never persisted. |
//! | [`tasks`](TaskStore::tasks) | The raw collection, newest first. |
//! | [`filter`](TaskStore::filter) / [`sorted`](TaskStore::sorted) / [`stats`](TaskStore::stats) | Derived views; see the free functions below. |
//!
//! ## Write path
//!
//! Every mutator applies the change in memory, then persists the full
//! collection synchronously. A persistence failure is returned as `Err`
//! *without rolling back* the in-memory change, so callers can distinguish
//! "the mutation failed" (never happens for unknown ids — those are no-ops)
//! from "the mutation happened but did not reach durable storage".
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`add`](TaskStore::add) | Prepends a fresh task (newest-first insertion order) and returns it. |
//! | [`toggle_complete`](TaskStore::toggle_complete) | Flips `completed`; unknown id is a no-op. |
//! | [`delete`](TaskStore::delete) | Removes by id; unknown id is a no-op. |
//! | [`edit`](TaskStore::edit) | Replaces the title if the new one is non-empty after trimming; unknown id is a no-op. |
//!
//! ## Pure views
//!
//! [`filter_tasks`], [`sort_tasks`], and [`stats`] operate on any slice and
//! never mutate. Priority sort is stable, so ties keep their input order
//! within a priority bucket.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::kv::{KvStore, StoreError};
use crate::models::{Filter, Priority, SortKey, Task};

/// Persistence key for a user's task collection.
pub fn tasks_key(email: &str) -> String {
    format!("tasks:{email}")
}

/// Aggregate statistics over a task collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    /// round(completed / total × 100); 0 when the collection is empty.
    pub completion_rate: u32,
    /// Incomplete high-priority tasks.
    pub high: usize,
    /// Incomplete medium-priority tasks.
    pub medium: usize,
    /// Incomplete low-priority tasks.
    pub low: usize,
}

/// A task collection backed by a KvStore namespace.
pub struct TaskStore<S: KvStore> {
    store: S,
    namespace: Option<String>,
    tasks: Vec<Task>,
}

impl<S: KvStore> TaskStore<S> {
    /// Load the collection stored under the given user's namespace.
    ///
    /// Missing, unreadable, or corrupt data yields an empty collection; the
    /// failure is logged, not returned, so a damaged store never locks a
    /// user out of their task list.
    pub fn load(store: S, email: &str) -> Self {
        let key = tasks_key(email);
        let tasks = match store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Task>>(&raw) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(key = %key, error = %e, "corrupt task collection, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "unreadable task collection, starting empty");
                Vec::new()
            }
        };
        Self {
            store,
            namespace: Some(key),
            tasks,
        }
    }

    /// An unnamespaced store holding an empty, never-persisted collection.
    pub fn guest(store: S) -> Self {
        Self {
            store,
            namespace: None,
            tasks: Vec::new(),
        }
    }

    /// The collection, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(key) = &self.namespace else {
            return Ok(());
        };
        let raw = serde_json::to_string(&self.tasks).map_err(|e| StoreError::Serialize {
            key: key.clone(),
            source: e,
        })?;
        self.store.set(key, &raw)?;
        debug!(key = %key, count = self.tasks.len(), "persisted task collection");
        Ok(())
    }

    /// Add a new task to the front of the collection and persist.
    ///
    /// On `Err` the task was still added in memory; only the durable write
    /// failed.
    pub fn add(&mut self, title: &str, priority: Priority) -> Result<Task, StoreError> {
        let task = Task::new(title, priority);
        self.tasks.insert(0, task.clone());
        self.persist()?;
        Ok(task)
    }

    /// Flip the completed flag of the task with the given id.
    pub fn toggle_complete(&mut self, id: &str) -> Result<(), StoreError> {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = !task.completed;
        }
        self.persist()
    }

    /// Remove the task with the given id.
    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.tasks.retain(|t| t.id != id);
        self.persist()
    }

    /// Replace a task's title. Titles that are empty after trimming leave
    /// the task unchanged.
    pub fn edit(&mut self, id: &str, new_title: &str) -> Result<(), StoreError> {
        let trimmed = new_title.trim();
        if !trimmed.is_empty() {
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                task.title = trimmed.to_string();
            }
        }
        self.persist()
    }

    /// Tasks matching the given view.
    pub fn filter(&self, view: Filter) -> Vec<Task> {
        filter_tasks(&self.tasks, view)
    }

    /// The collection in the given order.
    pub fn sorted(&self, key: SortKey) -> Vec<Task> {
        sort_tasks(&self.tasks, key)
    }

    /// Aggregate statistics for the collection.
    pub fn stats(&self) -> TaskStats {
        stats(&self.tasks)
    }
}

/// Select the tasks matching a view. Pure; input order preserved.
pub fn filter_tasks(tasks: &[Task], view: Filter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| match view {
            Filter::All => true,
            Filter::Active => !t.completed,
            Filter::Completed => t.completed,
        })
        .cloned()
        .collect()
}

/// Return the tasks in the given order. Pure; the sort is stable, so
/// priority ties keep their input order.
pub fn sort_tasks(tasks: &[Task], key: SortKey) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    match key {
        SortKey::Newest => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::Priority => sorted.sort_by_key(|t| t.priority.rank()),
    }
    sorted
}

/// Compute aggregate statistics. Priority buckets count incomplete tasks
/// only.
pub fn stats(tasks: &[Task]) -> TaskStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let completion_rate = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    };
    let bucket = |p: Priority| {
        tasks
            .iter()
            .filter(|t| t.priority == p && !t.completed)
            .count()
    };
    TaskStats {
        total,
        completed,
        completion_rate,
        high: bucket(Priority::High),
        medium: bucket(Priority::Medium),
        low: bucket(Priority::Low),
    }
}
