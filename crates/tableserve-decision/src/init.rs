//! Init stage — a partition entity must exist before any other stage can
//! act on it.

use tableserve_state::{OperationType, PartitionMeta, TableStatus};

/// Decides whether a partition still needs to be brought into existence.
///
/// Simple enough to be a direct conditional rather than a
/// [`StateMachine`](crate::StateMachine) instance.
#[derive(Debug, Default)]
pub struct InitDecision;

impl InitDecision {
    pub fn new() -> Self {
        Self
    }

    pub fn make_decision(&self, current: &PartitionMeta) -> OperationType {
        match current.table_status {
            TableStatus::Unknown => OperationType::Init,
            TableStatus::Initializing => OperationType::Hold,
            _ => OperationType::None,
        }
    }
}
