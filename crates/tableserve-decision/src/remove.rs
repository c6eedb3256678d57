//! Remove stage — tear a partition down once it is no longer desired.
//!
//! Removal is unconditional intent, so no target is consulted. The caller
//! drives this separately from the main chain.

use tableserve_state::{DeployStatus, OperationType, PartitionMeta, TableStatus};

#[derive(Debug, Default)]
pub struct RemoveDecision;

impl RemoveDecision {
    pub fn new() -> Self {
        Self
    }

    pub fn make_decision(&self, current: &PartitionMeta) -> OperationType {
        // An in-flight deploy must be cancelled before removal proceeds.
        if current
            .deploy_statuses
            .values()
            .any(|&s| s == DeployStatus::Deploying)
        {
            return OperationType::CancelDeploy;
        }

        match current.table_status {
            TableStatus::Unknown | TableStatus::Unloaded => OperationType::Remove,
            TableStatus::Loading | TableStatus::ForceLoading | TableStatus::Preloading => {
                OperationType::CancelLoad
            }
            TableStatus::Unloading | TableStatus::Committing | TableStatus::RoleSwitching => {
                OperationType::Hold
            }
            _ => OperationType::Unload,
        }
    }
}
