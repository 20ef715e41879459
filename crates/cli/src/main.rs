//! `fabflow` command-line entry point.
//!
//! One subcommand per pipeline stage, plus `run` to drive the flow up to a
//! target stage, `status` to inspect a project's artifact tree, and `init`
//! to scaffold a `.fabflow/` configuration.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use fab_core::config::load_config;
use fab_core::coordinator::status::{StatusSink, TaskStatusBoard};
use fab_core::coordinator::PipelineCoordinator;
use fab_core::executor::registry::ExecutorRegistry;
use fab_core::executor::{Headless, StageExecutor};
use fab_core::init::{generate_fabflow_structure, InitOptions};
use fab_core::stages::StageSet;
use fab_protocol::flow_models::StageStatus;
use fab_protocol::stage_models::{Stage, StageOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The compilation flow, in run order.
const FLOW: [Stage; 10] = [
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
];

/// fabflow - hardware compilation pipeline driver
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project root directory
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StageArgs {
    /// Revert the stage's artifacts and retreat the flow state
    #[arg(long)]
    clean: bool,

    /// Extra flags appended to the stage's tool command (after `--`)
    #[arg(last = true)]
    flags: Vec<String>,
}

impl StageArgs {
    fn options(&self) -> StageOptions {
        StageOptions {
            clean: self.clean,
            flags: self.flags.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a .fabflow configuration in the project directory
    Init {
        /// Overwrite an existing .fabflow directory
        #[arg(long)]
        force: bool,
    },

    /// Generate configured IP instances
    Ipgen(StageArgs),

    /// Analyze the design sources
    Analyze(StageArgs),

    /// Synthesize the design into a netlist
    Synthesize(StageArgs),

    /// Pack netlist primitives into clusters
    Pack(StageArgs),

    /// Global (coarse) placement
    GlobalPlace(StageArgs),

    /// Detailed placement
    Place(StageArgs),

    /// Routing
    Route(StageArgs),

    /// Static timing analysis
    Sta(StageArgs),

    /// Power analysis
    Power(StageArgs),

    /// Bitstream generation
    Bitstream(StageArgs),

    /// RTL-level simulation
    SimRtl(StageArgs),

    /// Post-synthesis simulation
    SimGate(StageArgs),

    /// Post-place-and-route simulation
    SimPnr(StageArgs),

    /// Bitstream-level simulation
    SimBitstream(StageArgs),

    /// Run the compilation flow up to and including a target stage
    Run {
        /// Target stage (e.g. synthesize, route, bitstream)
        #[arg(long, default_value = "bitstream")]
        to: String,
    },

    /// Show the project's artifact directories
    Status {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let (stage, args) = match cli.command {
        Commands::Init { force } => {
            generate_fabflow_structure(InitOptions {
                target_dir: cli.project.clone(),
                force,
            })
            .await?;
            println!("Initialized .fabflow in {}", cli.project.display());
            return Ok(());
        }
        Commands::Status { json } => return print_status(&cli.project, json),
        Commands::Run { to } => {
            let target = parse_target(&to)?;
            return run_flow(&cli.project, target).await;
        }
        Commands::Ipgen(args) => (Stage::IpGenerate, args),
        Commands::Analyze(args) => (Stage::Analyze, args),
        Commands::Synthesize(args) => (Stage::Synthesize, args),
        Commands::Pack(args) => (Stage::Pack, args),
        Commands::GlobalPlace(args) => (Stage::GlobalPlace, args),
        Commands::Place(args) => (Stage::Place, args),
        Commands::Route(args) => (Stage::Route, args),
        Commands::Sta(args) => (Stage::TimingAnalysis, args),
        Commands::Power(args) => (Stage::PowerAnalysis, args),
        Commands::Bitstream(args) => (Stage::Bitstream, args),
        Commands::SimRtl(args) => (Stage::SimulateRtl, args),
        Commands::SimGate(args) => (Stage::SimulateGate, args),
        Commands::SimPnr(args) => (Stage::SimulatePnr, args),
        Commands::SimBitstream(args) => (Stage::SimulateBitstream, args),
    };

    let engine = Engine::open(&cli.project)?;
    let ok = engine.run_stage(stage, args.options()).await;
    engine.print_summary();
    if ok {
        Ok(())
    } else {
        Err(color_eyre::eyre::eyre!("{stage} failed"))
    }
}

/// A coordinator plus the collaborators the CLI reports through.
struct Engine {
    coordinator: Arc<PipelineCoordinator>,
    registry: Arc<ExecutorRegistry>,
    board: Arc<TaskStatusBoard>,
}

impl Engine {
    fn open(project: &Path) -> color_eyre::Result<Self> {
        let config = load_config(project)?;
        let board = Arc::new(TaskStatusBoard::new());
        let registry = Arc::new(ExecutorRegistry::new());
        let coordinator = Arc::new(
            PipelineCoordinator::new(project, StageSet::builtin(&config.tools))
                .with_monitor_interval(Duration::from_millis(config.project.monitor_interval_ms))
                .with_status_sink(Arc::clone(&board) as Arc<dyn StatusSink>)
                .with_registry(Arc::clone(&registry)),
        );
        Ok(Self {
            coordinator,
            registry,
            board,
        })
    }

    async fn run_stage(&self, stage: Stage, options: StageOptions) -> bool {
        let executor = StageExecutor::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.registry),
            Box::new(Headless),
        );
        executor.start(stage, options, None).await
    }

    fn print_summary(&self) {
        for record in self.board.all() {
            let status = match record.status {
                StageStatus::Success => "ok".green(),
                StageStatus::Fail => "FAIL".red(),
                StageStatus::InProgress => "...".yellow(),
                StageStatus::NotStarted => continue,
            };
            let utilization = record
                .utilization
                .map(|sample| {
                    format!(
                        "  ({} ms, peak {} KiB)",
                        sample.duration_ms,
                        sample.peak_memory_bytes / 1024
                    )
                })
                .unwrap_or_default();
            println!("{:>14}  {status}{utilization}", record.stage.to_string());
        }
        println!("flow state: {:?}", self.coordinator.flow_state());
    }
}

/// Resolve a `run --to` target against the compilation flow.
fn parse_target(name: &str) -> color_eyre::Result<Stage> {
    FLOW.into_iter()
        .find(|stage| stage.command_name() == name)
        .ok_or_else(|| {
            let known: Vec<_> = FLOW.iter().map(|s| s.command_name()).collect();
            color_eyre::eyre::eyre!("unknown target stage '{name}' (one of: {})", known.join(", "))
        })
}

/// Run the compilation flow up to and including `target`, stopping at the
/// first failure.
async fn run_flow(project: &Path, target: Stage) -> color_eyre::Result<()> {
    let engine = Engine::open(project)?;
    for stage in FLOW {
        if !engine.run_stage(stage, StageOptions::run()).await {
            engine.print_summary();
            return Err(color_eyre::eyre::eyre!("{stage} failed"));
        }
        if stage == target {
            break;
        }
    }
    engine.print_summary();
    Ok(())
}

/// Report which stage artifact directories exist under the project.
fn print_status(project: &Path, json: bool) -> color_eyre::Result<()> {
    if json {
        let mut report = serde_json::Map::new();
        for stage in Stage::ALL {
            let Some(rel) = stage.relative_dir() else { continue };
            report.insert(
                stage.command_name().to_string(),
                serde_json::json!({
                    "directory": rel,
                    "exists": project.join(rel).exists(),
                }),
            );
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::Value::Object(report))?
        );
        return Ok(());
    }

    for stage in Stage::ALL {
        let Some(rel) = stage.relative_dir() else { continue };
        let marker = if project.join(rel).exists() {
            "present".green()
        } else {
            "absent".dimmed()
        };
        println!("{:>14}  {rel:<24} {marker}", stage.to_string());
    }
    Ok(())
}
