//! In-memory partition entity for unit tests.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tableserve_state::{
    IncVersion, PartitionId, PartitionMeta, TablePartition, TableStatus,
};

/// Records every operation invoked against it; can be told to fail.
pub struct MockPartition {
    pid: PartitionId,
    status: Mutex<TableStatus>,
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MockPartition {
    pub fn arc(table: &str, from: u32, to: u32) -> Arc<Self> {
        Arc::new(Self {
            pid: PartitionId::new(table, from, to),
            status: Mutex::new(TableStatus::Unknown),
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: impl Into<String>) -> anyhow::Result<()> {
        let call = call.into();
        self.calls.lock().unwrap().push(call.clone());
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("injected failure in {call}");
        }
        Ok(())
    }
}

impl TablePartition for MockPartition {
    fn pid(&self) -> &PartitionId {
        &self.pid
    }

    fn table_status(&self) -> TableStatus {
        *self.status.lock().unwrap()
    }

    fn init(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record(format!("init({})", target.inc_version))
    }

    fn deploy(&self, target: &PartitionMeta, dist_deploy: bool) -> anyhow::Result<()> {
        if dist_deploy {
            self.record(format!("deploy({},dist)", target.inc_version))
        } else {
            self.record(format!("deploy({})", target.inc_version))
        }
    }

    fn cancel_deploy(&self) -> anyhow::Result<()> {
        self.record("cancel_deploy")
    }

    fn load(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record(format!("load({})", target.inc_version))
    }

    fn reload(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record(format!("reload({})", target.inc_version))
    }

    fn preload(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record(format!("preload({})", target.inc_version))
    }

    fn force_load(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record(format!("force_load({})", target.inc_version))
    }

    fn update_rt(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record(format!("update_rt({})", target.inc_version))
    }

    fn unload(&self) -> anyhow::Result<()> {
        self.record("unload")
    }

    fn cancel_load(&self) -> anyhow::Result<()> {
        self.record("cancel_load")
    }

    fn become_leader(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record(format!("become_leader({})", target.inc_version))
    }

    fn no_longer_leader(&self, target: &PartitionMeta) -> anyhow::Result<()> {
        self.record(format!("no_longer_leader({})", target.inc_version))
    }

    fn set_keep_count(&self, keep_count: u32) -> anyhow::Result<()> {
        self.record(format!("set_keep_count({keep_count})"))
    }

    fn set_config_keep_count(&self, keep_count: u32) -> anyhow::Result<()> {
        self.record(format!("set_config_keep_count({keep_count})"))
    }

    fn clean_inc_version(&self, in_use: &BTreeSet<IncVersion>) -> anyhow::Result<()> {
        self.record(format!(
            "clean_inc_version({:?})",
            in_use.iter().collect::<Vec<_>>()
        ))
    }

    fn final_target_to_target(&self) -> anyhow::Result<()> {
        self.record("final_target_to_target")
    }
}
