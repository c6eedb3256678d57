//! Domain types for the tableserve core.
//!
//! These types describe the observed (current) and desired (target) state
//! of one served table partition, plus the closed taxonomy of operations
//! the decision layer can emit. All types are serializable to/from JSON so
//! the outer driver can persist or ship them as it sees fit; this crate
//! itself never does I/O.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Version number of a partition incarnation. `INVALID_VERSION` means
/// nothing is loaded/deployed yet.
pub type IncVersion = i64;

/// Sentinel for "no version".
pub const INVALID_VERSION: IncVersion = -1;

// ── Identity ──────────────────────────────────────────────────────

/// Identity of one served table partition: a table name plus the hash
/// range it covers. Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId {
    pub table_name: String,
    pub range_from: u32,
    pub range_to: u32,
}

impl PartitionId {
    pub fn new(table_name: impl Into<String>, range_from: u32, range_to: u32) -> Self {
        Self {
            table_name: table_name.into(),
            range_from,
            range_to,
        }
    }

    /// The identifier string used by the single-flight guard and todo
    /// identity. Unique per partition.
    pub fn identifier(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.table_name, self.range_from, self.range_to)
    }
}

// ── Lifecycle states ──────────────────────────────────────────────

/// Lifecycle state of one partition's serving logic. Owned and mutated
/// only by the external partition entity; the core only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    #[default]
    Unknown,
    Initializing,
    Unloaded,
    Loading,
    Loaded,
    ForceLoading,
    ForceReload,
    Preloading,
    PreloadFailed,
    PreloadForceReload,
    ErrorLackMem,
    ErrorConfig,
    ErrorUnknown,
    Unloading,
    Committing,
    CommitError,
    RoleSwitching,
    RoleSwitchError,
}

/// Per-incarnation-version state of the on-disk deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    #[default]
    Unknown,
    Deploying,
    DeployDone,
    DiskQuota,
    Cancelled,
    Failed,
}

/// Serving role of a partition replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    Leader,
    #[default]
    Follower,
}

// ── Partition metadata ────────────────────────────────────────────

/// Snapshot of one partition's state, used for both the observed current
/// state and the desired target state. Immutable for the duration of one
/// reconciliation tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionMeta {
    pub table_status: TableStatus,
    /// Deploy state per tracked incarnation version. One partition may
    /// have several concurrently-tracked versions on disk.
    pub deploy_statuses: BTreeMap<IncVersion, DeployStatus>,
    pub role: RoleType,
    /// The loaded (current) or desired (target) incarnation version.
    pub inc_version: IncVersion,
    pub config_path: String,
    pub index_root: String,
    /// Generation marker: a different branch id means the partition was
    /// rolled back to a different lineage.
    pub branch_id: u64,
    pub keep_count: u32,
    pub config_keep_count: u32,
}

impl PartitionMeta {
    pub fn new() -> Self {
        Self {
            inc_version: INVALID_VERSION,
            ..Default::default()
        }
    }

    /// Deploy status for one version; absent versions read as `Unknown`.
    pub fn deploy_status(&self, version: IncVersion) -> DeployStatus {
        self.deploy_statuses
            .get(&version)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_deploy_status(&mut self, version: IncVersion, status: DeployStatus) {
        self.deploy_statuses.insert(version, status);
    }

    /// Largest tracked deploy version, or `INVALID_VERSION` if none.
    pub fn latest_deploy_version(&self) -> IncVersion {
        self.deploy_statuses
            .keys()
            .next_back()
            .copied()
            .unwrap_or(INVALID_VERSION)
    }

    /// Whether any version other than `except` is currently deploying.
    pub fn has_deploying_version(&self, except: IncVersion) -> bool {
        self.deploy_statuses
            .iter()
            .any(|(&v, &s)| v != except && s == DeployStatus::Deploying)
    }
}

// ── Operations ────────────────────────────────────────────────────

/// The closed taxonomy of operations the decision layer can emit.
///
/// `Ord` is derived so grouped dispatch over a todo list is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Init,
    Deploy,
    CancelDeploy,
    UpdateRt,
    Load,
    Unload,
    Cancel,
    Remove,
    ForceLoad,
    CancelLoad,
    Reload,
    Preload,
    DistDeploy,
    Hold,
    CleanDisk,
    FinalToTarget,
    CleanIncVersion,
    Commit,
    SyncVersion,
    BecomeLeader,
    NoLongerLeader,
    UpdateKeepCount,
    UpdateConfigKeepCount,
    None,
    Invalid,
}

impl OperationType {
    /// Operations that carry a frozen target snapshot when queued.
    pub fn carries_target(self) -> bool {
        matches!(
            self,
            OperationType::Init
                | OperationType::Load
                | OperationType::Reload
                | OperationType::Preload
                | OperationType::ForceLoad
                | OperationType::UpdateRt
                | OperationType::UpdateKeepCount
                | OperationType::UpdateConfigKeepCount
                | OperationType::BecomeLeader
                | OperationType::NoLongerLeader
                | OperationType::Deploy
                | OperationType::DistDeploy
                | OperationType::CleanDisk
        )
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
