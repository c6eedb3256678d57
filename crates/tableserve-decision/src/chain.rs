//! The decision chain — orders the stages and returns the first
//! non-trivial decision.

use tracing::debug;

use tableserve_state::{Context, OperationType, PartitionMeta};

use crate::deploy::DeployDecision;
use crate::init::InitDecision;
use crate::load::LoadDecision;
use crate::remove::RemoveDecision;

/// Composes `[init, deploy, load]` in that fixed order; the remove stage
/// is exposed separately because removal is a different intent, driven by
/// the caller when a table is no longer desired at all.
pub struct DecisionChain {
    init: InitDecision,
    deploy: DeployDecision,
    load: LoadDecision,
    removal: RemoveDecision,
}

impl DecisionChain {
    pub fn new() -> Self {
        Self {
            init: InitDecision::new(),
            deploy: DeployDecision::new(),
            load: LoadDecision::new(),
            removal: RemoveDecision::new(),
        }
    }

    /// Returns the first stage result that is not `None`, or `None` when
    /// the partition has converged to the target.
    pub fn make_decision(
        &self,
        current: &PartitionMeta,
        target: &PartitionMeta,
        ctx: &Context,
    ) -> OperationType {
        let op = self.init.make_decision(current);
        if op != OperationType::None {
            debug!(stage = "init", op = %op, "chain decision");
            return op;
        }
        let op = self.deploy.make_decision(current, target, ctx);
        if op != OperationType::None {
            debug!(stage = "deploy", op = %op, "chain decision");
            return op;
        }
        self.load.make_decision(current, target, ctx)
    }

    /// Decision for a partition that should no longer exist.
    pub fn remove(&self, current: &PartitionMeta) -> OperationType {
        self.removal.make_decision(current)
    }
}

impl Default for DecisionChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableserve_state::{DeployStatus, ScheduleConfig, TableStatus};

    fn ctx() -> Context {
        Context::new(ScheduleConfig::default())
    }

    #[test]
    fn init_preempts_later_stages() {
        let chain = DecisionChain::new();
        // Unknown status would also produce a deploy decision; init wins.
        let current = PartitionMeta::new();
        let mut target = PartitionMeta::new();
        target.inc_version = 1;
        assert_eq!(
            chain.make_decision(&current, &target, &ctx()),
            OperationType::Init
        );
    }

    #[test]
    fn all_stages_none_is_none() {
        let chain = DecisionChain::new();
        let mut current = PartitionMeta::new();
        current.table_status = TableStatus::Loaded;
        current.inc_version = 1;
        current.set_deploy_status(1, DeployStatus::DeployDone);
        let mut target = PartitionMeta::new();
        target.inc_version = 1;
        assert_eq!(
            chain.make_decision(&current, &target, &ctx()),
            OperationType::None
        );
    }

    #[test]
    fn deploy_runs_before_load() {
        let chain = DecisionChain::new();
        let mut current = PartitionMeta::new();
        current.table_status = TableStatus::Unloaded;
        let mut target = PartitionMeta::new();
        target.inc_version = 1;
        // Version 1 is not deployed, so deploy wins over load.
        assert_eq!(
            chain.make_decision(&current, &target, &ctx()),
            OperationType::Deploy
        );
    }

    #[test]
    fn remove_is_separate_from_the_chain() {
        let chain = DecisionChain::new();
        let mut current = PartitionMeta::new();
        current.table_status = TableStatus::Loaded;
        assert_eq!(chain.remove(&current), OperationType::Unload);
    }
}
