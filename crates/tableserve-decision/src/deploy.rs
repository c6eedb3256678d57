//! Deploy stage — converges the on-disk deployment toward the target
//! version.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tableserve_state::{Context, DeployStatus, OperationType, PartitionMeta, ScheduleConfig};

use crate::machine::StateMachine;

/// What changed between the current deployment and the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployEvent {
    None,
    NewConfig,
    IndexRootChanged,
    NewIncVersion,
    /// Another version is already deploying; never run two deploys
    /// concurrently for one entity.
    WaitResource,
}

const ALL_EVENTS: [DeployEvent; 5] = [
    DeployEvent::None,
    DeployEvent::NewConfig,
    DeployEvent::IndexRootChanged,
    DeployEvent::NewIncVersion,
    DeployEvent::WaitResource,
];

/// Decides the next deploy operation from the target version's deploy
/// status and the computed [`DeployEvent`].
pub struct DeployDecision {
    machine: StateMachine<DeployStatus, DeployEvent, OperationType>,
}

impl DeployDecision {
    pub fn new() -> Self {
        Self {
            machine: build_machine(),
        }
    }

    pub fn make_decision(
        &self,
        current: &PartitionMeta,
        target: &PartitionMeta,
        ctx: &Context,
    ) -> OperationType {
        let event = compute_event(current, target, &ctx.config);
        let state = current.deploy_status(target.inc_version);
        let mut op = self.machine.transition(state, event);
        if ctx.is_final {
            op = rewrite_final(op, current, target);
        }
        debug!(?state, ?event, op = %op, version = target.inc_version, "deploy decision");
        op
    }
}

impl Default for DeployDecision {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the deploy event with precedence
/// `NewConfig > IndexRootChanged > NewIncVersion > None`, then override a
/// non-`None` event to `WaitResource` when some other version is already
/// deploying.
fn compute_event(
    current: &PartitionMeta,
    target: &PartitionMeta,
    config: &ScheduleConfig,
) -> DeployEvent {
    let new_config = config.allow_reload_by_config
        && !current.config_path.is_empty()
        && current.config_path != target.config_path;
    let index_root_changed = config.allow_reload_by_index_root
        && !current.index_root.is_empty()
        && current.index_root != target.index_root;
    let new_inc_version = current.latest_deploy_version() != target.inc_version;

    let event = if new_config {
        DeployEvent::NewConfig
    } else if index_root_changed {
        DeployEvent::IndexRootChanged
    } else if new_inc_version {
        DeployEvent::NewIncVersion
    } else {
        DeployEvent::None
    };

    if event != DeployEvent::None && current.has_deploying_version(target.inc_version) {
        return DeployEvent::WaitResource;
    }
    event
}

fn build_machine() -> StateMachine<DeployStatus, DeployEvent, OperationType> {
    use DeployEvent as E;
    use DeployStatus as S;
    use OperationType as Op;

    let mut machine = StateMachine::new(Op::None);

    // An in-flight deploy always waits.
    for event in ALL_EVENTS {
        machine.add(S::Deploying, event, Op::Hold);
    }

    // Done for the target version: only a config/index-root delta forces a
    // full re-check-and-redeploy of all files.
    machine.add(S::DeployDone, E::NewConfig, Op::DistDeploy);
    machine.add(S::DeployDone, E::IndexRootChanged, Op::DistDeploy);

    // Out of quota: nothing proceeds until disk is cleaned.
    for event in ALL_EVENTS {
        machine.add(S::DiskQuota, event, Op::CleanDisk);
    }

    // Not (successfully) deployed yet.
    for state in [S::Unknown, S::Cancelled, S::Failed] {
        machine.add(state, E::None, Op::Deploy);
        machine.add(state, E::NewIncVersion, Op::Deploy);
        machine.add(state, E::WaitResource, Op::CancelDeploy);
        machine.add(state, E::NewConfig, Op::DistDeploy);
        machine.add(state, E::IndexRootChanged, Op::DistDeploy);
    }

    machine
}

/// A final (speculative) target never triggers disruptive deploy work.
fn rewrite_final(
    op: OperationType,
    current: &PartitionMeta,
    target: &PartitionMeta,
) -> OperationType {
    match op {
        OperationType::DistDeploy | OperationType::CleanDisk => OperationType::Hold,
        OperationType::Deploy
            if current.config_path != target.config_path
                || current.index_root != target.index_root =>
        {
            // The plain deploy would also need a path change; defer it.
            OperationType::Hold
        }
        other => other,
    }
}
