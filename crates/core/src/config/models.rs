//! Configuration data structures.

use fab_protocol::stage_models::Stage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Global project settings from `.fabflow/config.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    /// Project name, used in messages and default artifact naming.
    pub name: String,

    /// Memory sampling interval for monitored tool invocations, in ms.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
}

fn default_monitor_interval_ms() -> u64 {
    100
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "noname".to_string(),
            monitor_interval_ms: default_monitor_interval_ms(),
        }
    }
}

/// Binding of one pipeline stage to an external tool invocation.
///
/// Loaded from `.fabflow/tools/*.yaml`, one profile per file. The command is
/// a single pre-joined string; double-quoted substrings are preserved as one
/// argument.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolProfile {
    /// The stage this profile drives.
    pub stage: Stage,

    /// Tool command line, e.g. `yosys -p "synth -top {top}" design.v`.
    pub command: String,

    /// Extra environment variables for the tool process.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Log file for the tool's output, relative to the stage directory.
    /// Defaults to `<stage>.log`.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// All tool profiles, keyed by stage.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    profiles: HashMap<Stage, ToolProfile>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile, replacing any previous one for the same stage.
    pub fn insert(&mut self, profile: ToolProfile) {
        self.profiles.insert(profile.stage, profile);
    }

    /// The profile bound to `stage`, if any.
    pub fn get(&self, stage: Stage) -> Option<&ToolProfile> {
        self.profiles.get(&stage)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Complete loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Global project settings.
    pub project: ProjectConfig,

    /// Tool bindings per stage.
    pub tools: ToolCatalog,
}
