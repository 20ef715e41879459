//! Per-stage logic boundary.
//!
//! The coordinator knows how to schedule, scope, and book-keep a stage; what
//! a stage actually computes lives behind [`StageLogic`]. One implementation
//! is registered per stage. Implementations report success as a plain bool
//! (never an error type crossing the coordinator boundary), call the process
//! runner as needed, and are contractually obliged to poll
//! `cancel.is_stop_requested()` inside any loop of unbounded duration.

pub mod builtin;

use crate::cancel::CancelState;
use crate::runner::ProcessRunner;
use async_trait::async_trait;
use fab_protocol::flow_models::FlowState;
use fab_protocol::stage_models::{Stage, StageOptions};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a stage's logic gets to work with for one invocation.
pub struct StageContext {
    /// The stage being run.
    pub stage: Stage,

    /// Per-call options. `clean` inverts the stage's effect.
    pub options: StageOptions,

    /// Runner for external tool invocations.
    pub runner: Arc<ProcessRunner>,

    /// Shared cancellation state; poll it in long loops.
    pub cancel: Arc<CancelState>,

    /// The stage's artifact directory (absolute), empty for pseudo-stages.
    /// When non-empty, the process working directory has already been
    /// switched here by the coordinator.
    pub stage_dir: PathBuf,

    /// Flow progress at dispatch time. Read-only: only the coordinator
    /// mutates flow state, and only after the logic returns.
    pub flow_state: FlowState,
}

/// The logic of one pipeline stage.
#[async_trait]
pub trait StageLogic: Send + Sync {
    /// Run the stage. Returns true on success.
    async fn run(&self, ctx: &StageContext) -> bool;
}

/// Registry of stage logic, one entry per stage.
#[derive(Default)]
pub struct StageSet {
    logic: HashMap<Stage, Arc<dyn StageLogic>>,
}

impl StageSet {
    /// An empty set. Compiling an unregistered stage fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in set: every stage backed by its default logic, driven by
    /// the tool catalog where a profile is bound.
    pub fn builtin(tools: &crate::config::ToolCatalog) -> Self {
        let mut set = Self::new();
        for stage in Stage::ALL {
            set.insert(
                stage,
                Arc::new(builtin::BuiltinStage::new(stage, tools.get(stage).cloned())),
            );
        }
        set
    }

    /// Register (or replace) the logic for one stage.
    pub fn insert(&mut self, stage: Stage, logic: Arc<dyn StageLogic>) {
        self.logic.insert(stage, logic);
    }

    /// The logic registered for `stage`, if any.
    pub fn get(&self, stage: Stage) -> Option<Arc<dyn StageLogic>> {
        self.logic.get(&stage).cloned()
    }
}
