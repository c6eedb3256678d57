//! Dispatches a built todo list to its runners, type group by type group.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use tableserve_state::OperationType;

use crate::error::{ExecError, ExecResult};
use crate::runner::{SimpleRunner, TodoRunner};
use crate::todo_list::TodoList;

/// Owns one default synchronous runner plus a registry mapping operation
/// types to named runners, so e.g. deploy work and load work can proceed
/// on independent pools.
#[derive(Default)]
pub struct TodoListExecutor {
    default_runner: SimpleRunner,
    runners: HashMap<String, Arc<dyn TodoRunner>>,
    assignments: HashMap<OperationType, String>,
}

impl TodoListExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runner and assign it the given operation types.
    pub fn add_runner(
        &mut self,
        runner: Arc<dyn TodoRunner>,
        types: &[OperationType],
    ) -> ExecResult<()> {
        let name = runner.name().to_string();
        if self.runners.contains_key(&name) {
            return Err(ExecError::DuplicateRunner(name));
        }
        for &op in types {
            self.assignments.insert(op, name.clone());
        }
        self.runners.insert(name, runner);
        Ok(())
    }

    /// Route one operation type to an already-registered runner.
    pub fn assign_to_runner(&mut self, op: OperationType, runner_name: &str) -> ExecResult<()> {
        if !self.runners.contains_key(runner_name) {
            return Err(ExecError::RunnerNotFound(runner_name.to_string()));
        }
        self.assignments.insert(op, runner_name.to_string());
        Ok(())
    }

    /// Run every queued todo, type group by type group, in queued order
    /// within a group. With `force_sync` everything runs on the default
    /// inline runner regardless of assignments.
    pub fn execute(&self, list: TodoList, force_sync: bool) {
        for (op, todos) in list {
            let runner = if force_sync {
                &self.default_runner as &dyn TodoRunner
            } else {
                self.runner_for(op)
            };
            debug!(op = %op, count = todos.len(), runner = runner.name(), "dispatching group");
            for todo in todos {
                let identifier = todo.identifier().to_string();
                if !runner.run(todo) {
                    warn!(
                        %identifier,
                        op = %op,
                        runner = runner.name(),
                        "todo rejected; the next tick re-submits"
                    );
                }
            }
        }
    }

    fn runner_for(&self, op: OperationType) -> &dyn TodoRunner {
        self.assignments
            .get(&op)
            .and_then(|name| self.runners.get(name))
            .map(|runner| runner.as_ref())
            .unwrap_or(&self.default_runner)
    }
}
