//! Full reconciliation ticks: decision chain → todo list → executor.
//!
//! Uses an entity whose operations complete synchronously and update its
//! own metadata, so each tick observes the previous tick's effect — the
//! same shape the outer per-tick driver has.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tableserve_decision::DecisionChain;
use tableserve_exec::{TodoList, TodoListExecutor};
use tableserve_state::{
    Context, DeployStatus, IncVersion, OperationType, PartitionId, PartitionMeta, ScheduleConfig,
    TablePartition, TableStatus,
};

/// Applies every operation to its own metadata immediately.
struct SelfServingPartition {
    pid: PartitionId,
    meta: Mutex<PartitionMeta>,
    calls: Mutex<Vec<String>>,
}

impl SelfServingPartition {
    fn arc(table: &str) -> Arc<Self> {
        Arc::new(Self {
            pid: PartitionId::new(table, 0, 65535),
            meta: Mutex::new(PartitionMeta::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn snapshot(&self) -> PartitionMeta {
        self.meta.lock().unwrap().clone()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

impl TablePartition for SelfServingPartition {
    fn pid(&self) -> &PartitionId {
        &self.pid
    }

    fn table_status(&self) -> TableStatus {
        self.meta.lock().unwrap().table_status
    }

    fn init(&self, _target: &PartitionMeta) -> anyhow::Result<()> {
        self.record("init");
        self.meta.lock().unwrap().table_status = TableStatus::Unloaded;
        Ok(())
    }

    fn deploy(&self, target: &PartitionMeta, _dist_deploy: bool) -> anyhow::Result<()> {
        self.record("deploy");
        self.meta
            .lock()
            .unwrap()
            .set_deploy_status(target.inc_version, DeployStatus::DeployDone);
        Ok(())
    }

    fn cancel_deploy(&self) -> anyhow::Result<()> {
        self.record("cancel_deploy");
        let mut meta = self.meta.lock().unwrap();
        let deploying: Vec<IncVersion> = meta
            .deploy_statuses
            .iter()
            .filter(|&(_, &s)| s == DeployStatus::Deploying)
            .map(|(&v, _)| v)
            .collect();
        for version in deploying {
            meta.set_deploy_status(version, DeployStatus::Cancelled);
        }
        Ok(())
    }

    fn load(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record("load");
        let mut meta = self.meta.lock().unwrap();
        meta.table_status = TableStatus::Loaded;
        meta.inc_version = target.inc_version;
        meta.branch_id = target.branch_id;
        Ok(())
    }

    fn reload(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record("reload");
        let mut meta = self.meta.lock().unwrap();
        meta.table_status = TableStatus::Loaded;
        meta.inc_version = target.inc_version;
        meta.branch_id = target.branch_id;
        Ok(())
    }

    fn preload(&self, _target: &PartitionMeta) -> anyhow::Result<()> {
        self.record("preload");
        self.meta.lock().unwrap().table_status = TableStatus::Preloading;
        Ok(())
    }

    fn force_load(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record("force_load");
        let mut meta = self.meta.lock().unwrap();
        meta.table_status = TableStatus::Loaded;
        meta.inc_version = target.inc_version;
        Ok(())
    }

    fn update_rt(&self, _target: &PartitionMeta) -> anyhow::Result<()> {
        self.record("update_rt");
        Ok(())
    }

    fn unload(&self) -> anyhow::Result<()> {
        self.record("unload");
        let mut meta = self.meta.lock().unwrap();
        meta.table_status = TableStatus::Unloaded;
        meta.inc_version = tableserve_state::INVALID_VERSION;
        Ok(())
    }

    fn cancel_load(&self) -> anyhow::Result<()> {
        self.record("cancel_load");
        self.meta.lock().unwrap().table_status = TableStatus::Unloaded;
        Ok(())
    }

    fn become_leader(&self, _target: &PartitionMeta) -> anyhow::Result<()> {
        self.record("become_leader");
        self.meta.lock().unwrap().role = tableserve_state::RoleType::Leader;
        Ok(())
    }

    fn no_longer_leader(&self, _target: &PartitionMeta) -> anyhow::Result<()> {
        self.record("no_longer_leader");
        self.meta.lock().unwrap().role = tableserve_state::RoleType::Follower;
        Ok(())
    }

    fn set_keep_count(&self, keep_count: u32) -> anyhow::Result<()> {
        self.record("set_keep_count");
        self.meta.lock().unwrap().keep_count = keep_count;
        Ok(())
    }

    fn set_config_keep_count(&self, keep_count: u32) -> anyhow::Result<()> {
        self.record("set_config_keep_count");
        self.meta.lock().unwrap().config_keep_count = keep_count;
        Ok(())
    }

    fn clean_inc_version(&self, in_use: &BTreeSet<IncVersion>) -> anyhow::Result<()> {
        self.record("clean_inc_version");
        self.meta
            .lock()
            .unwrap()
            .deploy_statuses
            .retain(|version, _| in_use.contains(version));
        Ok(())
    }

    fn final_target_to_target(&self) -> anyhow::Result<()> {
        self.record("final_target_to_target");
        Ok(())
    }
}

/// Run ticks until the chain reports convergence; returns the decided
/// operations in order.
fn drive_to_target(
    chain: &DecisionChain,
    executor: &TodoListExecutor,
    entity: &Arc<SelfServingPartition>,
    target: &PartitionMeta,
    ctx: &Context,
    max_ticks: usize,
) -> Vec<OperationType> {
    let mut decided = Vec::new();
    for _ in 0..max_ticks {
        let current = entity.snapshot();
        let op = chain.make_decision(&current, target, ctx);
        if op == OperationType::None {
            return decided;
        }
        decided.push(op);
        let mut list = TodoList::new();
        list.add_operation(entity.clone(), op, Some(target));
        executor.execute(list, false);
    }
    panic!("did not converge within {max_ticks} ticks: {decided:?}");
}

#[test]
fn fresh_partition_converges_in_three_ticks() {
    let chain = DecisionChain::new();
    let executor = TodoListExecutor::new();
    let ctx = Context::new(ScheduleConfig::default());
    let entity = SelfServingPartition::arc("orders");

    let mut target = PartitionMeta::new();
    target.inc_version = 1;

    let decided = drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);
    assert_eq!(
        decided,
        vec![OperationType::Init, OperationType::Deploy, OperationType::Load]
    );
    assert_eq!(entity.calls(), vec!["init", "deploy", "load"]);

    let meta = entity.snapshot();
    assert_eq!(meta.table_status, TableStatus::Loaded);
    assert_eq!(meta.inc_version, 1);
}

#[test]
fn version_bump_takes_deploy_then_load() {
    let chain = DecisionChain::new();
    let executor = TodoListExecutor::new();
    let ctx = Context::new(ScheduleConfig::default());
    let entity = SelfServingPartition::arc("orders");

    let mut target = PartitionMeta::new();
    target.inc_version = 1;
    drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);

    // New incarnation appears.
    target.inc_version = 2;
    let decided = drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);
    assert_eq!(decided, vec![OperationType::Deploy, OperationType::Load]);

    let meta = entity.snapshot();
    assert_eq!(meta.inc_version, 2);
    assert_eq!(meta.deploy_status(1), DeployStatus::DeployDone);
    assert_eq!(meta.deploy_status(2), DeployStatus::DeployDone);
}

#[test]
fn version_revert_degrades_to_load_without_force_gate() {
    let chain = DecisionChain::new();
    let executor = TodoListExecutor::new();
    let ctx = Context::new(ScheduleConfig::default());
    let entity = SelfServingPartition::arc("orders");

    let mut target = PartitionMeta::new();
    target.inc_version = 2;
    drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);

    // Roll back to version 1. The reload degrades to a load because
    // allow_force_load is off.
    target.inc_version = 1;
    let decided = drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);
    assert_eq!(decided, vec![OperationType::Load]);
    assert_eq!(entity.snapshot().inc_version, 1);

    // With the gate on, the same revert reloads.
    target.inc_version = 2;
    drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);
    target.inc_version = 1;
    let permissive = Context::new(ScheduleConfig {
        allow_force_load: true,
        ..ScheduleConfig::default()
    });
    let decided = drive_to_target(&chain, &executor, &entity, &target, &permissive, 10);
    assert_eq!(decided, vec![OperationType::Reload]);
}

#[test]
fn role_switch_round_trip() {
    let chain = DecisionChain::new();
    let executor = TodoListExecutor::new();
    let ctx = Context::new(ScheduleConfig::default());
    let entity = SelfServingPartition::arc("orders");

    let mut target = PartitionMeta::new();
    target.inc_version = 1;
    drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);

    target.role = tableserve_state::RoleType::Leader;
    let decided = drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);
    assert_eq!(decided, vec![OperationType::BecomeLeader]);

    target.role = tableserve_state::RoleType::Follower;
    let decided = drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);
    assert_eq!(decided, vec![OperationType::NoLongerLeader]);
}

#[test]
fn removal_flow_reports_removed_tables() {
    let chain = DecisionChain::new();
    let executor = TodoListExecutor::new();
    let ctx = Context::new(ScheduleConfig::default());
    let entity = SelfServingPartition::arc("orders");

    let mut target = PartitionMeta::new();
    target.inc_version = 1;
    drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);

    // Tick 1 of removal: loaded table is unloaded first.
    let op = chain.remove(&entity.snapshot());
    assert_eq!(op, OperationType::Unload);
    let mut list = TodoList::new();
    list.add_operation(entity.clone(), op, None);
    executor.execute(list, false);

    // Tick 2: unloaded table can be removed; the driver reads the
    // identifiers off the list and drops the entities itself.
    let op = chain.remove(&entity.snapshot());
    assert_eq!(op, OperationType::Remove);
    let mut list = TodoList::new();
    list.add_operation(entity.clone(), op, None);
    assert_eq!(list.removed_tables(), vec!["orders.0.65535".to_string()]);
}

#[test]
fn retention_cleanup_drops_unused_versions() {
    let chain = DecisionChain::new();
    let executor = TodoListExecutor::new();
    let ctx = Context::new(ScheduleConfig::default());
    let entity = SelfServingPartition::arc("orders");

    let mut target = PartitionMeta::new();
    for version in 1..=3 {
        target.inc_version = version;
        drive_to_target(&chain, &executor, &entity, &target, &ctx, 10);
    }
    assert_eq!(entity.snapshot().deploy_statuses.len(), 3);

    let mut list = TodoList::new();
    list.add_clean_inc_version(entity.clone(), BTreeSet::from([3]));
    executor.execute(list, false);

    let meta = entity.snapshot();
    assert_eq!(meta.deploy_statuses.len(), 1);
    assert_eq!(meta.deploy_status(3), DeployStatus::DeployDone);
}
