//! Load stage — converges the served partition toward the target
//! version, role, and config.

use serde::{Deserialize, Serialize};
use tracing::debug;

use tableserve_state::{
    Context, OperationType, PartitionMeta, RoleType, ScheduleConfig, TableStatus,
};

use crate::machine::StateMachine;

/// What kind of load-side change the target asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadEvent {
    None,
    Load,
    Reload,
    BecomeLeader,
    NoLongerLeader,
}

const ALL_STATUSES: [TableStatus; 18] = [
    TableStatus::Unknown,
    TableStatus::Initializing,
    TableStatus::Unloaded,
    TableStatus::Loading,
    TableStatus::Loaded,
    TableStatus::ForceLoading,
    TableStatus::ForceReload,
    TableStatus::Preloading,
    TableStatus::PreloadFailed,
    TableStatus::PreloadForceReload,
    TableStatus::ErrorLackMem,
    TableStatus::ErrorConfig,
    TableStatus::ErrorUnknown,
    TableStatus::Unloading,
    TableStatus::Committing,
    TableStatus::CommitError,
    TableStatus::RoleSwitching,
    TableStatus::RoleSwitchError,
];

/// States where an in-flight load can still be cancelled cooperatively.
fn cancellable(status: TableStatus) -> bool {
    matches!(status, TableStatus::Loading | TableStatus::Preloading)
}

/// States where the in-flight transition must run to completion.
fn uncancellable(status: TableStatus) -> bool {
    matches!(
        status,
        TableStatus::Unloading
            | TableStatus::Committing
            | TableStatus::ForceLoading
            | TableStatus::RoleSwitching
    )
}

/// Decides the next load-side operation from the table status and the
/// computed [`LoadEvent`].
pub struct LoadDecision {
    machine: StateMachine<TableStatus, LoadEvent, OperationType>,
}

impl LoadDecision {
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
        let event = determine_load_type(current, target, &ctx.config);
        let op = self.machine.transition(current.table_status, event);
        let op = if ctx.is_final {
            rewrite_final_target(op, ctx)
        } else {
            rewrite_target(op, &ctx.config)
        };
        debug!(status = ?current.table_status, ?event, op = %op, "load decision");
        op
    }
}

impl Default for LoadDecision {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare current and target and classify the required change. Role
/// changes pre-empt everything else.
fn determine_load_type(
    current: &PartitionMeta,
    target: &PartitionMeta,
    config: &ScheduleConfig,
) -> LoadEvent {
    if target.role == RoleType::Leader && current.role == RoleType::Follower {
        return LoadEvent::BecomeLeader;
    }
    if target.role == RoleType::Follower && current.role == RoleType::Leader {
        return LoadEvent::NoLongerLeader;
    }

    let config_changed = config.allow_reload_by_config
        && !current.config_path.is_empty()
        && current.config_path != target.config_path;
    let index_root_changed = config.allow_reload_by_index_root
        && !current.index_root.is_empty()
        && current.index_root != target.index_root;
    if config_changed || index_root_changed {
        return LoadEvent::Reload;
    }

    if target.inc_version > current.inc_version {
        return LoadEvent::Load;
    }
    // Branch rollback: a different lineage must be reloaded even when the
    // version number did not move forward.
    if current.branch_id != target.branch_id {
        return LoadEvent::Reload;
    }
    if target.inc_version < current.inc_version {
        return LoadEvent::Reload;
    }
    LoadEvent::None
}

fn build_machine() -> StateMachine<TableStatus, LoadEvent, OperationType> {
    use LoadEvent as E;
    use OperationType as Op;
    use TableStatus as S;

    let mut machine = StateMachine::new(Op::None);

    // Load event: bring the target version up.
    machine.add(S::Unloaded, E::Load, Op::Load);
    machine.add(S::Loaded, E::Load, Op::Load);
    machine.add(S::ForceReload, E::Load, Op::Reload);
    machine.add(S::ErrorLackMem, E::Load, Op::ForceLoad);
    // A reload cannot fix a config error; load the new version plainly.
    machine.add(S::ErrorConfig, E::Load, Op::Load);
    machine.add(S::ErrorUnknown, E::Load, Op::ForceLoad);
    machine.add(S::CommitError, E::Load, Op::Reload);
    machine.add(S::RoleSwitchError, E::Load, Op::Reload);

    // Reload event: the served data itself must be replaced.
    machine.add(S::Unloaded, E::Reload, Op::Load);
    machine.add(S::Loaded, E::Reload, Op::Reload);
    machine.add(S::ForceReload, E::Reload, Op::Reload);
    machine.add(S::ErrorLackMem, E::Reload, Op::ForceLoad);
    machine.add(S::ErrorConfig, E::Reload, Op::Reload);
    machine.add(S::ErrorUnknown, E::Reload, Op::ForceLoad);
    machine.add(S::CommitError, E::Reload, Op::Reload);
    machine.add(S::RoleSwitchError, E::Reload, Op::Reload);

    // A partition sitting in a preload state converges by promoting the
    // speculative work, never by a fresh load.
    for status in [S::Preloading, S::PreloadFailed, S::PreloadForceReload] {
        machine.add(status, E::Load, Op::FinalToTarget);
        machine.add(status, E::Reload, Op::FinalToTarget);
    }

    // In-flight transitions are never pre-empted by a version/config
    // delta; only role changes may cancel, and only from cancellable
    // states.
    for status in [
        S::Loading,
        S::Unloading,
        S::ForceLoading,
        S::Committing,
        S::RoleSwitching,
    ] {
        machine.add(status, E::Load, Op::Hold);
        machine.add(status, E::Reload, Op::Hold);
    }

    // Role change events.
    for status in ALL_STATUSES {
        let (r#become, resign) = if cancellable(status) {
            (Op::CancelLoad, Op::CancelLoad)
        } else if uncancellable(status) {
            (Op::Hold, Op::Hold)
        } else {
            (Op::BecomeLeader, Op::NoLongerLeader)
        };
        machine.add(status, E::BecomeLeader, r#become);
        machine.add(status, E::NoLongerLeader, resign);
    }

    machine
}

/// Speculative convergence never performs disruptive work — it only
/// preloads, and only when the serving layer supports that.
fn rewrite_final_target(op: OperationType, ctx: &Context) -> OperationType {
    if !ctx.support_preload {
        return OperationType::None;
    }
    match op {
        OperationType::Load => OperationType::Preload,
        OperationType::FinalToTarget | OperationType::ForceLoad | OperationType::Reload => {
            OperationType::None
        }
        other => other,
    }
}

/// Policy gate for the non-final path: without `allow_force_load`,
/// disruptive recoveries degrade to a plain load.
fn rewrite_target(op: OperationType, config: &ScheduleConfig) -> OperationType {
    match op {
        OperationType::ForceLoad | OperationType::Reload if !config.allow_force_load => {
            OperationType::Load
        }
        other => other,
    }
}
