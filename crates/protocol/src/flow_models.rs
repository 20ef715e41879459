//! Flow progress, stage status, and utilization models.
//!
//! [`FlowState`] is the ordered progress marker for a design: the furthest
//! pipeline stage that has completed successfully. It is owned exclusively by
//! the pipeline coordinator; everything else only reads it.

use crate::stage_models::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The furthest pipeline stage successfully completed for the current design.
///
/// Legal progression:
/// `Init -> IpGenerated -> Analyzed -> Synthesized -> Packed -> GloballyPlaced
/// -> Placed -> Routed`.
///
/// State only advances on a successful non-clean run of the corresponding
/// stage, and only retreats on a successful clean run. Timing, power,
/// bitstream and simulation stages read but never mutate it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Nothing has run yet.
    Init,

    /// IP instances generated.
    IpGenerated,

    /// Sources analyzed.
    Analyzed,

    /// Netlist synthesized.
    Synthesized,

    /// Netlist packed.
    Packed,

    /// Coarse placement done.
    GloballyPlaced,

    /// Detailed placement done.
    Placed,

    /// Routing done.
    Routed,
}

impl FlowState {
    /// The state a successful non-clean run of `stage` produces, if the
    /// stage participates in the flow state machine.
    pub fn target_of(stage: Stage) -> Option<FlowState> {
        match stage {
            Stage::IpGenerate => Some(FlowState::IpGenerated),
            Stage::Analyze => Some(FlowState::Analyzed),
            Stage::Synthesize => Some(FlowState::Synthesized),
            Stage::Pack => Some(FlowState::Packed),
            Stage::GlobalPlace => Some(FlowState::GloballyPlaced),
            Stage::Place => Some(FlowState::Placed),
            Stage::Route => Some(FlowState::Routed),
            _ => None,
        }
    }

    /// The state a successful clean run of `stage` retreats to.
    ///
    /// A Synthesize clean reverts the analysis artifacts along with the
    /// netlist, so it lands on `IpGenerated` rather than `Analyzed`.
    pub fn clean_result_of(stage: Stage) -> Option<FlowState> {
        match stage {
            Stage::IpGenerate => Some(FlowState::Init),
            Stage::Analyze => Some(FlowState::IpGenerated),
            Stage::Synthesize => Some(FlowState::IpGenerated),
            Stage::Pack => Some(FlowState::Synthesized),
            Stage::GlobalPlace => Some(FlowState::Packed),
            Stage::Place => Some(FlowState::GloballyPlaced),
            Stage::Route => Some(FlowState::Placed),
            _ => None,
        }
    }
}

impl Default for FlowState {
    fn default() -> Self {
        FlowState::Init
    }
}

/// Status of one stage as seen by an external task collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// The stage has never been run.
    NotStarted,

    /// The stage is currently executing.
    InProgress,

    /// The stage's last run succeeded.
    Success,

    /// The stage's last run failed or was aborted.
    Fail,
}

/// Peak memory and wall-clock duration of one external tool invocation.
///
/// Produced once per process-runner invocation; within a single compile call
/// the last sample wins.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UtilizationSample {
    /// Maximum resident-set size observed, in bytes.
    pub peak_memory_bytes: u64,

    /// Wall-clock time from spawn to exit, in milliseconds.
    pub duration_ms: u64,
}

/// One row of the task status board: the collaborator-visible record of a
/// stage's most recent run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TaskRecord {
    /// The stage this record describes.
    pub stage: Stage,

    /// Current status.
    pub status: StageStatus,

    /// Utilization of the last successful run, if any.
    pub utilization: Option<UtilizationSample>,

    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_state_ordering() {
        assert!(FlowState::Init < FlowState::IpGenerated);
        assert!(FlowState::IpGenerated < FlowState::Analyzed);
        assert!(FlowState::Analyzed < FlowState::Synthesized);
        assert!(FlowState::Synthesized < FlowState::Packed);
        assert!(FlowState::Packed < FlowState::GloballyPlaced);
        assert!(FlowState::GloballyPlaced < FlowState::Placed);
        assert!(FlowState::Placed < FlowState::Routed);
    }

    #[test]
    fn test_analysis_stages_do_not_transition() {
        for stage in [
            Stage::TimingAnalysis,
            Stage::PowerAnalysis,
            Stage::Bitstream,
            Stage::SimulateRtl,
            Stage::SimulateGate,
            Stage::SimulatePnr,
            Stage::SimulateBitstream,
            Stage::Batch,
            Stage::Configuration,
            Stage::NoAction,
        ] {
            assert_eq!(FlowState::target_of(stage), None);
            assert_eq!(FlowState::clean_result_of(stage), None);
        }
    }

    #[test]
    fn test_clean_retreats_below_target() {
        for stage in [
            Stage::IpGenerate,
            Stage::Analyze,
            Stage::Synthesize,
            Stage::Pack,
            Stage::GlobalPlace,
            Stage::Place,
            Stage::Route,
        ] {
            let target = FlowState::target_of(stage).unwrap();
            let clean = FlowState::clean_result_of(stage).unwrap();
            assert!(clean < target, "{stage}: clean result must precede target");
        }
    }

    #[test]
    fn test_synthesize_clean_reverts_analysis() {
        assert_eq!(
            FlowState::clean_result_of(Stage::Synthesize),
            Some(FlowState::IpGenerated)
        );
    }
}
