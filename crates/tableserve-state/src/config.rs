//! Schedule policy configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Policy flags gating disruptive decisions.
///
/// All flags default to off: a bare config never reloads a serving table
/// behind the operator's back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Allow a changed config path to trigger reload / dist-deploy.
    pub allow_reload_by_config: bool,
    /// Allow a changed index root to trigger reload / dist-deploy.
    pub allow_reload_by_index_root: bool,
    /// Allow force-load recovery from error states. When off, decided
    /// force-loads and reloads degrade to plain loads.
    pub allow_force_load: bool,
}

impl ScheduleConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ScheduleConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Per-tick decision context handed to every stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    /// True when deciding against the final (speculative) target rather
    /// than the immediate tick target. Final targets only drive
    /// non-disruptive pre-work.
    pub is_final: bool,
    /// Whether the serving layer supports preloading a future version.
    pub support_preload: bool,
    pub config: ScheduleConfig,
}

impl Context {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            is_final: false,
            support_preload: false,
            config,
        }
    }

    pub fn final_target(config: ScheduleConfig, support_preload: bool) -> Self {
        Self {
            is_final: true,
            support_preload,
            config,
        }
    }
}
