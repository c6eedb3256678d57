//! Todo runners — synchronous and thread-pool-backed execution.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::todo::Todo;

/// Executes todos handed over by the
/// [`TodoListExecutor`](crate::TodoListExecutor).
///
/// `run` returns whether the todo was accepted; a rejected todo is not
/// queued or retried here — the outer driver re-evaluates and re-submits
/// on its next tick.
pub trait TodoRunner: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, todo: Todo) -> bool;
}

/// A borrowed task pool the [`AsyncRunner`] submits onto.
///
/// The pool is caller-owned: this crate never creates, resizes, or stops
/// it. `try_submit` must not block on the job itself — it either schedules
/// and returns `true` or rejects and returns `false` in bounded time.
pub trait WorkPool: Send + Sync {
    fn try_submit(&self, job: Box<dyn FnOnce() + Send + 'static>) -> bool;
}

impl WorkPool for tokio::runtime::Handle {
    fn try_submit(&self, job: Box<dyn FnOnce() + Send + 'static>) -> bool {
        self.spawn_blocking(job);
        true
    }
}

// ── SimpleRunner ──────────────────────────────────────────────────

/// Runs each todo inline on the calling thread. Always accepts.
#[derive(Debug, Default)]
pub struct SimpleRunner;

impl SimpleRunner {
    pub fn new() -> Self {
        Self
    }
}

impl TodoRunner for SimpleRunner {
    fn name(&self) -> &str {
        "simple"
    }

    fn run(&self, todo: Todo) -> bool {
        if let Err(error) = todo.run() {
            warn!(
                identifier = %todo.identifier(),
                op = %todo.op(),
                %error,
                "todo failed; status flows back into the next tick"
            );
        }
        true
    }
}

// ── AsyncRunner ───────────────────────────────────────────────────

/// Submits todos onto a borrowed pool with a single-flight guard: at most
/// one in-flight operation per entity identifier at any time.
pub struct AsyncRunner {
    name: String,
    pool: Arc<dyn WorkPool>,
    ongoing: Arc<Mutex<HashSet<String>>>,
}

impl AsyncRunner {
    pub fn new(name: impl Into<String>, pool: Arc<dyn WorkPool>) -> Self {
        Self {
            name: name.into(),
            pool,
            ongoing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Number of identifiers currently in flight (for diagnostics/tests).
    pub fn ongoing_operations_count(&self) -> usize {
        lock_ongoing(&self.ongoing).len()
    }
}

fn lock_ongoing(ongoing: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    match ongoing.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl TodoRunner for AsyncRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, todo: Todo) -> bool {
        let identifier = todo.identifier().to_string();

        {
            let mut ongoing = lock_ongoing(&self.ongoing);
            if !ongoing.insert(identifier.clone()) {
                debug!(
                    %identifier,
                    op = %todo.op(),
                    runner = %self.name,
                    "operation already in flight; rejecting"
                );
                return false;
            }
        }

        let ongoing = Arc::clone(&self.ongoing);
        let job_identifier = identifier.clone();
        let job = Box::new(move || {
            if let Err(error) = todo.run() {
                warn!(
                    identifier = %job_identifier,
                    op = %todo.op(),
                    %error,
                    "async todo failed"
                );
            }
            lock_ongoing(&ongoing).remove(&job_identifier);
        });

        if !self.pool.try_submit(job) {
            lock_ongoing(&self.ongoing).remove(&identifier);
            warn!(%identifier, runner = %self.name, "pool rejected submission");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockPartition;
    use tableserve_state::{OperationType, PartitionMeta};

    /// Holds submitted jobs until the test drains them, so in-flight
    /// state can be observed deterministically.
    #[derive(Default)]
    struct ParkedPool {
        jobs: Mutex<Vec<Box<dyn FnOnce() + Send + 'static>>>,
    }

    impl ParkedPool {
        fn drain(&self) {
            let jobs: Vec<_> = self.jobs.lock().unwrap().drain(..).collect();
            for job in jobs {
                job();
            }
        }
    }

    impl WorkPool for ParkedPool {
        fn try_submit(&self, job: Box<dyn FnOnce() + Send + 'static>) -> bool {
            self.jobs.lock().unwrap().push(job);
            true
        }
    }

    /// Rejects every submission.
    struct RejectingPool;

    impl WorkPool for RejectingPool {
        fn try_submit(&self, _job: Box<dyn FnOnce() + Send + 'static>) -> bool {
            false
        }
    }

    fn load_todo(entity: Arc<MockPartition>) -> Todo {
        let mut target = PartitionMeta::new();
        target.inc_version = 1;
        Todo::create_with_target(OperationType::Load, entity, &target)
    }

    #[test]
    fn simple_runner_runs_inline() {
        let runner = SimpleRunner::new();
        let entity = MockPartition::arc("orders", 0, 100);
        assert!(runner.run(load_todo(entity.clone())));
        assert_eq!(entity.calls(), vec!["load(1)"]);
    }

    #[test]
    fn simple_runner_accepts_failing_todos() {
        let runner = SimpleRunner::new();
        let entity = MockPartition::arc("orders", 0, 100);
        entity.set_fail(true);
        // The failure is logged, not surfaced.
        assert!(runner.run(load_todo(entity)));
    }

    #[test]
    fn second_submission_for_same_identifier_is_rejected() {
        let pool = Arc::new(ParkedPool::default());
        let runner = AsyncRunner::new("async", pool.clone());
        let entity = MockPartition::arc("orders", 0, 100);

        assert!(runner.run(load_todo(entity.clone())));
        assert_eq!(runner.ongoing_operations_count(), 1);

        // Same identifier, different op: still rejected.
        assert!(!runner.run(Todo::create(OperationType::Unload, entity.clone())));
        assert_eq!(runner.ongoing_operations_count(), 1);

        pool.drain();
        assert_eq!(runner.ongoing_operations_count(), 0);
        assert_eq!(entity.calls(), vec!["load(1)"]);

        // After completion the identifier may run again.
        assert!(runner.run(load_todo(entity)));
        assert_eq!(runner.ongoing_operations_count(), 1);
    }

    #[test]
    fn different_identifiers_run_concurrently() {
        let pool = Arc::new(ParkedPool::default());
        let runner = AsyncRunner::new("async", pool.clone());
        let a = MockPartition::arc("orders", 0, 100);
        let b = MockPartition::arc("users", 0, 100);

        assert!(runner.run(load_todo(a)));
        assert!(runner.run(load_todo(b)));
        assert_eq!(runner.ongoing_operations_count(), 2);

        pool.drain();
        assert_eq!(runner.ongoing_operations_count(), 0);
    }

    #[test]
    fn rejected_submission_clears_the_guard() {
        let runner = AsyncRunner::new("async", Arc::new(RejectingPool));
        let entity = MockPartition::arc("orders", 0, 100);

        assert!(!runner.run(load_todo(entity.clone())));
        assert_eq!(runner.ongoing_operations_count(), 0);
        assert!(entity.calls().is_empty());
    }

    #[test]
    fn failing_todo_still_clears_the_guard() {
        let pool = Arc::new(ParkedPool::default());
        let runner = AsyncRunner::new("async", pool.clone());
        let entity = MockPartition::arc("orders", 0, 100);
        entity.set_fail(true);

        assert!(runner.run(load_todo(entity)));
        pool.drain();
        assert_eq!(runner.ongoing_operations_count(), 0);
    }
}
