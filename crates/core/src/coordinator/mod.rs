//! Top-level compile dispatch and flow state machine.
//!
//! [`PipelineCoordinator`] is the engine's public surface: it maps a
//! requested stage to its artifact directory, scopes the process working
//! directory for the call, dispatches the stage's logic, and performs all
//! bookkeeping — flow state transition, status reporting, utilization
//! collection — after the logic returns. The flow state is owned exclusively
//! here; nothing else mutates it.

pub mod dirscope;
pub mod status;

use crate::cancel::CancelState;
use crate::executor::registry::ExecutorRegistry;
use crate::runner::ProcessRunner;
use crate::stages::{StageContext, StageSet};
use dirscope::DirScope;
use fab_protocol::flow_models::{FlowState, StageStatus, UtilizationSample};
use fab_protocol::stage_models::{Stage, StageOptions};
use status::StatusSink;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Result of one compile call.
#[derive(Debug, Clone, Default)]
pub struct CompileOutcome {
    /// Whether the stage's logic reported success.
    pub ok: bool,

    /// Utilization of the last tool invocation, when one ran.
    pub utilization: Option<UtilizationSample>,
}

impl CompileOutcome {
    /// A failed outcome with no utilization.
    pub fn failure() -> Self {
        Self::default()
    }
}

/// Coordinates the execution of pipeline stages for one project.
pub struct PipelineCoordinator {
    project_root: PathBuf,
    flow_state: Mutex<FlowState>,
    cancel: Arc<CancelState>,
    runner: Arc<ProcessRunner>,
    stages: StageSet,
    status: Option<Arc<dyn StatusSink>>,
    registry: Option<Arc<ExecutorRegistry>>,
}

impl PipelineCoordinator {
    /// Create a coordinator for the project rooted at `project_root`.
    pub fn new(project_root: impl Into<PathBuf>, stages: StageSet) -> Self {
        let cancel = Arc::new(CancelState::new());
        let runner = Arc::new(ProcessRunner::new(Arc::clone(&cancel)));
        Self {
            project_root: project_root.into(),
            flow_state: Mutex::new(FlowState::Init),
            cancel,
            runner,
            stages,
            status: None,
            registry: None,
        }
    }

    /// Override the runner's memory sampling interval, normally from the
    /// project's `monitor_interval_ms` setting.
    pub fn with_monitor_interval(mut self, interval: std::time::Duration) -> Self {
        self.runner = Arc::new(
            ProcessRunner::new(Arc::clone(&self.cancel)).with_monitor_interval(interval),
        );
        self
    }

    /// Bind an external status collaborator. Without one, status updates are
    /// skipped.
    pub fn with_status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    /// Bind the executor registry that [`PipelineCoordinator::stop`] signals.
    pub fn with_registry(mut self, registry: Arc<ExecutorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The shared cancellation state.
    pub fn cancel(&self) -> Arc<CancelState> {
        Arc::clone(&self.cancel)
    }

    /// The shared process runner.
    pub fn runner(&self) -> Arc<ProcessRunner> {
        Arc::clone(&self.runner)
    }

    /// Current flow progress.
    pub fn flow_state(&self) -> FlowState {
        self.flow_state
            .lock()
            .map(|state| *state)
            .unwrap_or(FlowState::Init)
    }

    /// The artifact directory for `stage`, or an empty path for stages that
    /// own none. Pure; no side effects.
    pub fn file_path(&self, stage: Stage) -> PathBuf {
        match stage.relative_dir() {
            Some(dir) => self.project_root.join(dir),
            None => PathBuf::new(),
        }
    }

    /// A file inside `stage`'s artifact directory.
    pub fn file_path_with(&self, stage: Stage, file: impl AsRef<Path>) -> PathBuf {
        self.file_path(stage).join(file)
    }

    /// Request that all in-flight work stop.
    ///
    /// Sets the stop flag (terminating any child the runner is supervising)
    /// and signals every live executor. Idempotent and non-blocking: this
    /// only signals, it never waits for termination.
    pub fn stop(&self) {
        self.cancel.request_stop();
        if let Some(registry) = &self.registry {
            registry.stop_all();
        }
    }

    /// Run one stage.
    ///
    /// The call: clears a pending abort (failing immediately if one was
    /// pending), reports InProgress, enters the stage directory, dispatches
    /// the stage's logic, restores the working directory on every exit path,
    /// and then reports the result and advances or retreats the flow state.
    pub async fn compile(&self, stage: Stage, options: StageOptions) -> CompileOutcome {
        // An abort issued before we started must not let a queued compile
        // run silently; consume the flag and fail this call.
        if self.cancel.is_stop_requested() {
            self.cancel.reset_stop();
            warn!("{stage}: aborted before start");
            self.report_status(stage, StageStatus::Fail);
            return CompileOutcome::failure();
        }

        self.cancel.reset_stop();
        self.report_status(stage, StageStatus::InProgress);
        self.runner.reset_utilization();

        let stage_dir = self.file_path(stage);
        let scope = self.enter_stage_dir(stage, &stage_dir);

        let ok = match self.stages.get(stage) {
            Some(logic) => {
                let ctx = StageContext {
                    stage,
                    options: options.clone(),
                    runner: Arc::clone(&self.runner),
                    cancel: Arc::clone(&self.cancel),
                    stage_dir,
                    flow_state: self.flow_state(),
                };
                logic.run(&ctx).await
            }
            None => {
                error!("{stage}: no stage logic registered");
                false
            }
        };

        // Restore the caller's directory before any status or state update.
        drop(scope);

        let utilization = self.runner.last_utilization();
        if ok {
            self.apply_transition(stage, &options);
            self.report_status(stage, StageStatus::Success);
            if let (Some(sink), Some(sample)) = (&self.status, utilization) {
                sink.set_utilization(stage, sample);
            }
        } else {
            self.report_status(stage, StageStatus::Fail);
        }

        CompileOutcome { ok, utilization }
    }

    /// Create and enter the stage directory. Creation failure is not a stage
    /// failure: the stage then runs in the caller's current directory.
    fn enter_stage_dir(&self, stage: Stage, stage_dir: &Path) -> Option<DirScope> {
        if stage_dir.as_os_str().is_empty() {
            return None;
        }
        if let Err(err) = std::fs::create_dir_all(stage_dir) {
            warn!(
                "{stage}: cannot create {}: {err}; running in current directory",
                stage_dir.display()
            );
            return None;
        }
        match DirScope::enter(stage_dir) {
            Ok(scope) => Some(scope),
            Err(err) => {
                warn!(
                    "{stage}: cannot enter {}: {err}; running in current directory",
                    stage_dir.display()
                );
                None
            }
        }
    }

    /// Advance or retreat the flow state after a successful run.
    fn apply_transition(&self, stage: Stage, options: &StageOptions) {
        let next = if options.clean {
            FlowState::clean_result_of(stage)
        } else {
            FlowState::target_of(stage)
        };
        let Some(next) = next else { return };
        if let Ok(mut state) = self.flow_state.lock() {
            info!("{stage}: flow state {:?} -> {next:?}", *state);
            *state = next;
        }
    }

    fn report_status(&self, stage: Stage, status: StageStatus) {
        if let Some(sink) = &self.status {
            sink.set_status(stage, status);
        }
    }
}
