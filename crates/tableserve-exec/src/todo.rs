//! A single queued operation against one partition entity.

use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use tableserve_state::{IncVersion, OperationType, PartitionMeta, TablePartition};

/// What a [`Todo`] carries besides the operation itself.
///
/// A closed tagged shape: target-bearing operations freeze the target
/// snapshot at creation time so execution is never affected by later
/// target mutation; retention cleanup carries the in-use version set.
#[derive(Clone)]
pub enum TodoPayload {
    Empty,
    Target(PartitionMeta),
    InUseVersions(BTreeSet<IncVersion>),
}

/// One operation instance bound to an entity.
///
/// Lifecycle: create, enqueue in a [`TodoList`](crate::TodoList), run
/// once, discard. Identity (equality/hash) is `(operation, identifier)`.
#[derive(Clone)]
pub struct Todo {
    op: OperationType,
    entity: Arc<dyn TablePartition>,
    identifier: String,
    payload: TodoPayload,
}

impl Todo {
    /// Build a todo for an operation that needs no target.
    pub fn create(op: OperationType, entity: Arc<dyn TablePartition>) -> Self {
        let identifier = entity.identifier();
        Self {
            op,
            entity,
            identifier,
            payload: TodoPayload::Empty,
        }
    }

    /// Build a todo with a frozen target snapshot. Falls back to the
    /// empty payload for operations that do not carry one.
    pub fn create_with_target(
        op: OperationType,
        entity: Arc<dyn TablePartition>,
        target: &PartitionMeta,
    ) -> Self {
        let mut todo = Self::create(op, entity);
        if op.carries_target() {
            todo.payload = TodoPayload::Target(target.clone());
        }
        todo
    }

    /// Build the retention-cleanup todo carrying the versions that must
    /// survive.
    pub fn clean_inc_version(
        entity: Arc<dyn TablePartition>,
        in_use: BTreeSet<IncVersion>,
    ) -> Self {
        let identifier = entity.identifier();
        Self {
            op: OperationType::CleanIncVersion,
            entity,
            identifier,
            payload: TodoPayload::InUseVersions(in_use),
        }
    }

    pub fn op(&self) -> OperationType {
        self.op
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn target(&self) -> Option<&PartitionMeta> {
        match &self.payload {
            TodoPayload::Target(target) => Some(target),
            _ => None,
        }
    }

    /// Hash of the identifier combined with the operation type, for use
    /// as a map/set key.
    pub fn hash_value(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Perform the operation against the bound entity.
    ///
    /// One table-driven dispatch from operation to entity call. `Hold`
    /// and `None` are wait markers; `Remove`, `CleanDisk`, `Cancel`,
    /// `Commit` and `SyncVersion` are consumed by the outer driver from
    /// the queued list and do nothing here.
    pub fn run(&self) -> anyhow::Result<()> {
        match self.op {
            OperationType::Init => self.entity.init(self.require_target()?),
            OperationType::Deploy => self.entity.deploy(self.require_target()?, false),
            OperationType::DistDeploy => self.entity.deploy(self.require_target()?, true),
            OperationType::CancelDeploy => self.entity.cancel_deploy(),
            OperationType::Load => self.entity.load(self.require_target()?),
            OperationType::Reload => self.entity.reload(self.require_target()?),
            OperationType::Preload => self.entity.preload(self.require_target()?),
            OperationType::ForceLoad => self.entity.force_load(self.require_target()?),
            OperationType::UpdateRt => self.entity.update_rt(self.require_target()?),
            OperationType::Unload => self.entity.unload(),
            OperationType::CancelLoad => self.entity.cancel_load(),
            OperationType::BecomeLeader => self.entity.become_leader(self.require_target()?),
            OperationType::NoLongerLeader => {
                self.entity.no_longer_leader(self.require_target()?)
            }
            OperationType::UpdateKeepCount => {
                self.entity.set_keep_count(self.require_target()?.keep_count)
            }
            OperationType::UpdateConfigKeepCount => self
                .entity
                .set_config_keep_count(self.require_target()?.config_keep_count),
            OperationType::FinalToTarget => self.entity.final_target_to_target(),
            OperationType::CleanIncVersion => match &self.payload {
                TodoPayload::InUseVersions(in_use) => self.entity.clean_inc_version(in_use),
                _ => anyhow::bail!("clean_inc_version todo without version set"),
            },
            OperationType::Hold
            | OperationType::None
            | OperationType::Remove
            | OperationType::CleanDisk
            | OperationType::Cancel
            | OperationType::Commit
            | OperationType::SyncVersion
            | OperationType::Invalid => {
                debug!(op = %self.op, identifier = %self.identifier, "no-op todo");
                Ok(())
            }
        }
    }

    fn require_target(&self) -> anyhow::Result<&PartitionMeta> {
        self.target().ok_or_else(|| {
            anyhow::anyhow!("{} todo for {} has no target", self.op, self.identifier)
        })
    }
}

impl PartialEq for Todo {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.identifier == other.identifier
    }
}

impl Eq for Todo {}

impl Hash for Todo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.op.hash(state);
    }
}

impl fmt::Debug for Todo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Todo")
            .field("op", &self.op)
            .field("identifier", &self.identifier)
            .finish()
    }
}
