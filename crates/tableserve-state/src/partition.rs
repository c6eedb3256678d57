//! The entity capability contract consumed by the execution layer.

use std::collections::BTreeSet;

use crate::types::{IncVersion, PartitionId, PartitionMeta, TableStatus};

/// One served table partition, as seen by this core.
///
/// Implementations perform the actual deploy/load/unload work (disk I/O,
/// index opening) and own the `TableStatus` lifecycle; the core only reads
/// status and invokes operations. Every operation is cooperative: a
/// cancel merely asks the entity to stop, it is never interrupted.
///
/// Failures surface as `anyhow::Error` and flow back into the next tick's
/// decision through the status enums — nothing here is fatal.
pub trait TablePartition: Send + Sync {
    fn pid(&self) -> &PartitionId;

    /// Unique identifier for the single-flight guard. Defaults to the
    /// rendered pid.
    fn identifier(&self) -> String {
        self.pid().identifier()
    }

    fn table_status(&self) -> TableStatus;

    fn init(&self, target: &PartitionMeta) -> anyhow::Result<()>;
    fn deploy(&self, target: &PartitionMeta, dist_deploy: bool) -> anyhow::Result<()>;
    fn cancel_deploy(&self) -> anyhow::Result<()>;
    fn load(&self, target: &PartitionMeta) -> anyhow::Result<()>;
    fn reload(&self, target: &PartitionMeta) -> anyhow::Result<()>;
    fn preload(&self, target: &PartitionMeta) -> anyhow::Result<()>;
    fn force_load(&self, target: &PartitionMeta) -> anyhow::Result<()>;
    fn update_rt(&self, target: &PartitionMeta) -> anyhow::Result<()>;
    fn unload(&self) -> anyhow::Result<()>;
    fn cancel_load(&self) -> anyhow::Result<()>;
    fn become_leader(&self, target: &PartitionMeta) -> anyhow::Result<()>;
    fn no_longer_leader(&self, target: &PartitionMeta) -> anyhow::Result<()>;
    fn set_keep_count(&self, keep_count: u32) -> anyhow::Result<()>;
    fn set_config_keep_count(&self, keep_count: u32) -> anyhow::Result<()>;
    /// Drop on-disk incarnations not in `in_use`.
    fn clean_inc_version(&self, in_use: &BTreeSet<IncVersion>) -> anyhow::Result<()>;
    /// Promote the speculative final target to the active target.
    fn final_target_to_target(&self) -> anyhow::Result<()>;
}
