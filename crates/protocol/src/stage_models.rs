//! Pipeline stage identifiers and per-call options.
//!
//! A [`Stage`] names one unit of the hardware-compilation flow. Each stage
//! maps deterministically to an artifact sub-path under the project root;
//! stages without an artifact directory (batch, configuration, no-action)
//! map to nothing.

use serde::{Deserialize, Serialize};

/// One named unit of the compilation pipeline.
///
/// The set is fixed and ordered: the compilation stages appear in flow order,
/// followed by the analysis/bitstream stages, the simulation variants, and
/// the administrative pseudo-stages.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Generate configured IP instances.
    IpGenerate,

    /// Analyze the design sources (elaboration).
    Analyze,

    /// Synthesize the design into a netlist.
    Synthesize,

    /// Pack netlist primitives into clusters.
    Pack,

    /// Global (coarse) placement.
    GlobalPlace,

    /// Detailed placement.
    Place,

    /// Routing.
    Route,

    /// Static timing analysis. Reads but never mutates flow progress.
    TimingAnalysis,

    /// Power analysis. Reads but never mutates flow progress.
    PowerAnalysis,

    /// Bitstream generation.
    Bitstream,

    /// RTL-level simulation.
    SimulateRtl,

    /// Post-synthesis (gate-level) simulation.
    SimulateGate,

    /// Post-place-and-route simulation.
    SimulatePnr,

    /// Bitstream-level simulation.
    SimulateBitstream,

    /// Scripted batch execution.
    Batch,

    /// Device configuration / programming.
    Configuration,

    /// Placeholder for "no stage requested".
    NoAction,
}

impl Stage {
    /// All stages, in declaration order.
    pub const ALL: [Stage; 17] = [
        Stage::IpGenerate,
        Stage::Analyze,
        Stage::Synthesize,
        Stage::Pack,
        Stage::GlobalPlace,
        Stage::Place,
        Stage::Route,
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
    ];

    /// The artifact sub-path for this stage, relative to the project root.
    ///
    /// Returns `None` for the administrative pseudo-stages, which own no
    /// artifact directory.
    pub fn relative_dir(&self) -> Option<&'static str> {
        match self {
            Stage::IpGenerate => Some("ip_generate"),
            Stage::Analyze => Some("analysis"),
            Stage::Synthesize => Some("synth/synthesis"),
            Stage::Pack => Some("synth/packing"),
            Stage::GlobalPlace => Some("impl/global_placement"),
            Stage::Place => Some("impl/placement"),
            Stage::Route => Some("impl/routing"),
            Stage::TimingAnalysis => Some("impl/timing_analysis"),
            Stage::PowerAnalysis => Some("impl/power_analysis"),
            Stage::Bitstream => Some("impl/bitstream"),
            Stage::SimulateRtl => Some("sim/rtl"),
            Stage::SimulateGate => Some("sim/gate"),
            Stage::SimulatePnr => Some("sim/pnr"),
            Stage::SimulateBitstream => Some("sim/bitstream"),
            Stage::Batch | Stage::Configuration | Stage::NoAction => None,
        }
    }

    /// The textual command name this stage is exposed under.
    pub fn command_name(&self) -> &'static str {
        match self {
            Stage::IpGenerate => "ipgen",
            Stage::Analyze => "analyze",
            Stage::Synthesize => "synthesize",
            Stage::Pack => "pack",
            Stage::GlobalPlace => "global-place",
            Stage::Place => "place",
            Stage::Route => "route",
            Stage::TimingAnalysis => "sta",
            Stage::PowerAnalysis => "power",
            Stage::Bitstream => "bitstream",
            Stage::SimulateRtl => "sim-rtl",
            Stage::SimulateGate => "sim-gate",
            Stage::SimulatePnr => "sim-pnr",
            Stage::SimulateBitstream => "sim-bitstream",
            Stage::Batch => "batch",
            Stage::Configuration => "configure",
            Stage::NoAction => "no-action",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command_name())
    }
}

/// Per-call configuration for a single stage invocation.
///
/// `clean` inverts the stage's effect: instead of running the stage's logic,
/// previously produced artifacts are reverted and the flow state moves
/// backward. Any additional flags are opaque to the coordinator and owned by
/// the stage's own logic.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOptions {
    /// Revert artifacts and retreat the flow state instead of running.
    #[serde(default)]
    pub clean: bool,

    /// Opaque stage-specific flags, interpreted by the stage logic only.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl StageOptions {
    /// Options for a normal (non-clean) run.
    pub fn run() -> Self {
        Self::default()
    }

    /// Options for a clean run.
    pub fn clean() -> Self {
        Self {
            clean: true,
            flags: Vec::new(),
        }
    }
}
