//! The per-tick work queue, grouped by operation type.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use tableserve_state::{IncVersion, OperationType, PartitionMeta, TablePartition};

use crate::todo::Todo;

/// Ordered todos grouped by operation type.
///
/// Built fresh each tick by one driver thread, handed to the executor,
/// then discarded — no internal synchronization. `BTreeMap` keeps the
/// group order deterministic.
#[derive(Debug, Default)]
pub struct TodoList {
    todos: BTreeMap<OperationType, Vec<Todo>>,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one decided operation for an entity. `Invalid` is rejected,
    /// `None` is silently dropped, everything else goes through the todo
    /// factories (freezing `target` for target-bearing operations).
    pub fn add_operation(
        &mut self,
        entity: Arc<dyn TablePartition>,
        op: OperationType,
        target: Option<&PartitionMeta>,
    ) {
        match op {
            OperationType::Invalid => {
                warn!(identifier = %entity.identifier(), "rejecting invalid operation");
                return;
            }
            OperationType::None => return,
            _ => {}
        }

        let todo = match target {
            Some(target) => Todo::create_with_target(op, entity, target),
            None => Todo::create(op, entity),
        };
        debug!(op = %op, identifier = %todo.identifier(), "queued todo");
        self.todos.entry(op).or_default().push(todo);
    }

    /// Queue retention cleanup with the set of versions still in use.
    pub fn add_clean_inc_version(
        &mut self,
        entity: Arc<dyn TablePartition>,
        in_use: BTreeSet<IncVersion>,
    ) {
        let todo = Todo::clean_inc_version(entity, in_use);
        self.todos
            .entry(OperationType::CleanIncVersion)
            .or_default()
            .push(todo);
    }

    /// Count of pending work. `None` and `SyncVersion` are administrative
    /// and not counted.
    pub fn size(&self) -> usize {
        self.todos
            .iter()
            .filter(|&(&op, _)| op != OperationType::None && op != OperationType::SyncVersion)
            .map(|(_, todos)| todos.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn has_op_type(&self, op: OperationType) -> bool {
        self.todos.get(&op).is_some_and(|todos| !todos.is_empty())
    }

    pub fn need_clean_disk(&self) -> bool {
        self.has_op_type(OperationType::CleanDisk)
    }

    /// Force-loads and reloads both require an unload before reopening.
    pub fn need_stop_service(&self) -> bool {
        self.has_op_type(OperationType::ForceLoad) || self.has_op_type(OperationType::Reload)
    }

    /// Never force-reload a table concurrently being unloaded: when both
    /// are queued this tick, the force-loads are dropped.
    pub fn maybe_optimize(&mut self) {
        if self.has_op_type(OperationType::ForceLoad) && self.has_op_type(OperationType::Unload) {
            let dropped = self
                .todos
                .remove(&OperationType::ForceLoad)
                .map(|todos| todos.len())
                .unwrap_or(0);
            info!(dropped, "dropping force-loads queued alongside unloads");
        }
    }

    /// Identifiers of all entities queued for removal.
    pub fn removed_tables(&self) -> Vec<String> {
        self.todos
            .get(&OperationType::Remove)
            .map(|todos| {
                todos
                    .iter()
                    .map(|todo| todo.identifier().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All todos across all types bound to one entity identifier.
    pub fn operations_for(&self, identifier: &str) -> Vec<&Todo> {
        self.todos
            .values()
            .flatten()
            .filter(|todo| todo.identifier() == identifier)
            .collect()
    }

    /// Erase matching entries for one type. Returns whether anything was
    /// removed.
    pub fn remove(&mut self, op: OperationType, identifier: &str) -> bool {
        let Some(todos) = self.todos.get_mut(&op) else {
            return false;
        };
        let before = todos.len();
        todos.retain(|todo| todo.identifier() != identifier);
        let removed = todos.len() != before;
        if todos.is_empty() {
            self.todos.remove(&op);
        }
        removed
    }
}

impl IntoIterator for TodoList {
    type Item = (OperationType, Vec<Todo>);
    type IntoIter = std::collections::btree_map::IntoIter<OperationType, Vec<Todo>>;

    fn into_iter(self) -> Self::IntoIter {
        self.todos.into_iter()
    }
}
