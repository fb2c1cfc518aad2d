//! Query cache with optimistic writes and fetch supersession.
//!
//! Each [`QueryKey`] maps to a [`CacheEntry`] holding the last known value,
//! a `stale` flag and a generation counter. Every write that is not a
//! server-confirmed fetch bumps the generation, so an in-flight fetch that
//! started earlier cannot overwrite it when it lands.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use taskdeck_core::types::DbId;

/// Cache key, e.g. `["task", "42"]` or `["tasks", "7"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn task(task_id: DbId) -> Self {
        Self::new(["task".to_string(), task_id.to_string()])
    }

    /// Task list for one project (the board).
    pub fn tasks(project_id: DbId) -> Self {
        Self::new(["tasks".to_string(), project_id.to_string()])
    }

    pub fn subtasks(parent_id: DbId) -> Self {
        Self::new(["subtasks".to_string(), parent_id.to_string()])
    }

    pub fn time_entries(task_id: DbId) -> Self {
        Self::new(["time-entries".to_string(), task_id.to_string()])
    }

    pub fn project(project_id: DbId) -> Self {
        Self::new(["project".to_string(), project_id.to_string()])
    }

    pub fn project_stats(project_id: DbId) -> Self {
        Self::new(["project-stats".to_string(), project_id.to_string()])
    }

    pub fn milestone(milestone_id: DbId) -> Self {
        Self::new(["milestone".to_string(), milestone_id.to_string()])
    }

    pub fn dashboard(workspace_id: DbId) -> Self {
        Self::new(["dashboard".to_string(), workspace_id.to_string()])
    }

    pub fn activity(workspace_id: DbId) -> Self {
        Self::new(["activity".to_string(), workspace_id.to_string()])
    }

    pub fn members(workspace_id: DbId) -> Self {
        Self::new(["members".to_string(), workspace_id.to_string()])
    }

    /// Whether `prefix` matches the leading parts of this key.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.0.len() >= prefix.len() && self.0.iter().zip(prefix).all(|(a, b)| a == b)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// One cached value.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Option<Value>,
    /// Set for optimistic values and invalidated entries; the next read
    /// refetches.
    pub stale: bool,
    pub generation: u64,
}

impl CacheEntry {
    fn empty() -> Self {
        Self {
            value: None,
            stale: true,
            generation: 0,
        }
    }

    /// Fresh value usable without a fetch.
    pub fn fresh_value(&self) -> Option<&Value> {
        if self.stale {
            None
        } else {
            self.value.as_ref()
        }
    }
}

/// Handle for an in-flight fetch. Only the newest ticket for a key may
/// store its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// Entry state captured before an optimistic write.
#[derive(Debug, Clone)]
pub struct Snapshot {
    key: QueryKey,
    previous: Option<CacheEntry>,
}

impl Snapshot {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// Shared query cache. Cloning shares the same storage.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current entry for `key`, fresh or not.
    pub fn peek(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    /// Store a server-confirmed value directly.
    pub fn prime(&self, key: QueryKey, value: Value) {
        let mut entries = self.lock();
        let entry = entries.entry(key).or_insert_with(CacheEntry::empty);
        entry.value = Some(value);
        entry.stale = false;
        entry.generation += 1;
    }

    /// Start a fetch for `key`, superseding any fetch already in flight.
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
        entry.generation += 1;
        FetchTicket {
            key: key.clone(),
            generation: entry.generation,
        }
    }

    /// Store a fetch result. Returns `false` (and stores nothing) when the
    /// ticket has been superseded by a newer fetch or write.
    pub fn complete_fetch(&self, ticket: FetchTicket, value: Value) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(&ticket.key) {
            Some(entry) if entry.generation == ticket.generation => {
                entry.value = Some(value);
                entry.stale = false;
                true
            }
            _ => {
                tracing::debug!(key = %ticket.key, "Discarding superseded fetch result");
                false
            }
        }
    }

    /// Rewrite the entry in place to the intended post-mutation state.
    ///
    /// `update` receives the current value (if any) and returns the new one;
    /// returning `None` leaves the value untouched. The entry is marked stale
    /// either way. Returns the snapshot needed to roll back.
    pub fn set_optimistic<F>(&self, key: &QueryKey, update: F) -> Snapshot
    where
        F: FnOnce(Option<&Value>) -> Option<Value>,
    {
        let mut entries = self.lock();
        let previous = entries.get(key).cloned();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
        if let Some(next) = update(entry.value.as_ref()) {
            entry.value = Some(next);
        }
        entry.stale = true;
        entry.generation += 1;
        Snapshot {
            key: key.clone(),
            previous,
        }
    }

    /// Restore a snapshot verbatim. In-flight fetches for the key are
    /// superseded.
    pub fn rollback(&self, snapshot: Snapshot) {
        let mut entries = self.lock();
        let generation = entries
            .get(&snapshot.key)
            .map(|e| e.generation)
            .unwrap_or_default();
        match snapshot.previous {
            Some(mut previous) => {
                previous.generation = generation.max(previous.generation) + 1;
                entries.insert(snapshot.key, previous);
            }
            None => {
                entries.remove(&snapshot.key);
            }
        }
    }

    /// Mark an entry stale so the next read refetches. Fetches already in
    /// flight for the key are superseded.
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.stale = true;
            entry.generation += 1;
        }
    }

    /// Mark every entry whose key starts with `prefix` stale.
    pub fn invalidate_prefix(&self, prefix: &[&str]) -> usize {
        let mut entries = self.lock();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                entry.generation += 1;
                count += 1;
            }
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
