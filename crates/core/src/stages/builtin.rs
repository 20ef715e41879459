//! Built-in stage logic.
//!
//! Each stage ships with a default implementation. When a tool profile is
//! bound for the stage, the profile's command runs through the process
//! runner inside the stage directory and success is `exit == 0`. Without a
//! profile the stage is a stand-in that logs its progress, polls
//! cancellation, and succeeds, so a flow can be exercised end to end before
//! real tools are configured.
//!
//! Clean runs remove the stage's previously produced artifacts; the
//! coordinator separately rolls the flow state back.

use crate::config::ToolProfile;
use crate::runner::RunSpec;
use crate::stages::{StageContext, StageLogic};
use async_trait::async_trait;
use fab_protocol::flow_models::FlowState;
use fab_protocol::stage_models::Stage;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default logic for one stage.
pub struct BuiltinStage {
    stage: Stage,
    profile: Option<ToolProfile>,
}

impl BuiltinStage {
    pub fn new(stage: Stage, profile: Option<ToolProfile>) -> Self {
        Self { stage, profile }
    }

    async fn run_tool(&self, ctx: &StageContext, profile: &ToolProfile) -> bool {
        let mut command_line = profile.command.clone();
        for flag in &ctx.options.flags {
            command_line.push(' ');
            command_line.push_str(flag);
        }

        let mut spec = RunSpec::new(command_line);
        if !ctx.stage_dir.as_os_str().is_empty() {
            let log_name = profile
                .log_file
                .clone()
                .unwrap_or_else(|| format!("{}.log", self.stage).into());
            spec = spec
                .in_dir(&ctx.stage_dir)
                .log_to(ctx.stage_dir.join(log_name));
        }
        for (key, value) in &profile.env {
            spec = spec.env(key, value);
        }

        ctx.runner.run(&spec).await == 0
    }
}

#[async_trait]
impl StageLogic for BuiltinStage {
    async fn run(&self, ctx: &StageContext) -> bool {
        if ctx.options.clean {
            return clean_artifacts(ctx);
        }

        if let Some(required) = prerequisite_of(self.stage) {
            if ctx.flow_state < required {
                error!(
                    "{}: design must reach {:?} first (currently {:?})",
                    self.stage, required, ctx.flow_state
                );
                return false;
            }
        }

        if let Some(profile) = &self.profile {
            return self.run_tool(ctx, profile).await;
        }

        match self.stage {
            // Global placement has no real implementation yet; the flow
            // transition stays defined, the work is skipped.
            Stage::GlobalPlace => {
                warn!("global placement is not implemented, skipping");
                true
            }
            Stage::NoAction => true,
            Stage::Batch | Stage::Configuration => {
                info!("{}: nothing to do without a tool profile", self.stage);
                true
            }
            _ => stand_in(ctx).await,
        }
    }
}

/// Minimum flow progress required before a stage may run.
///
/// Synthesis accepts a design straight from IP generation: analysis enriches
/// the flow but is not a hard prerequisite.
fn prerequisite_of(stage: Stage) -> Option<FlowState> {
    match stage {
        Stage::Synthesize => Some(FlowState::IpGenerated),
        Stage::Pack => Some(FlowState::Synthesized),
        Stage::GlobalPlace | Stage::Place => Some(FlowState::Packed),
        Stage::Route => Some(FlowState::Placed),
        Stage::TimingAnalysis | Stage::PowerAnalysis | Stage::Bitstream => {
            Some(FlowState::Routed)
        }
        Stage::SimulateGate => Some(FlowState::Synthesized),
        Stage::SimulatePnr | Stage::SimulateBitstream => Some(FlowState::Routed),
        _ => None,
    }
}

/// Remove everything inside the stage's artifact directory.
///
/// The directory itself stays; only its contents go. A stage with no
/// directory has nothing to clean and succeeds trivially.
fn clean_artifacts(ctx: &StageContext) -> bool {
    if ctx.stage_dir.as_os_str().is_empty() || !ctx.stage_dir.exists() {
        return true;
    }

    info!("{}: cleaning {}", ctx.stage, ctx.stage_dir.display());
    let entries = match std::fs::read_dir(&ctx.stage_dir) {
        Ok(entries) => entries,
        Err(err) => {
            error!("{}: cannot read stage directory: {err}", ctx.stage);
            return false;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(err) = removed {
            error!("{}: failed to remove {}: {err}", ctx.stage, path.display());
            return false;
        }
    }
    true
}

/// Progress stand-in used when no tool profile is bound.
async fn stand_in(ctx: &StageContext) -> bool {
    info!("{}: running built-in stand-in", ctx.stage);
    for percent in (0..100).step_by(10) {
        debug!("{}: {percent}%", ctx.stage);
        if ctx.cancel.is_stop_requested() {
            warn!("{}: stopped", ctx.stage);
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    info!("{}: done", ctx.stage);
    true
}
