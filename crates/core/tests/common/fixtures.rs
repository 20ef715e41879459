//! Test fixtures for creating sample projects and coordinators.

use fab_core::config::load_config;
use fab_core::coordinator::PipelineCoordinator;
use fab_core::stages::StageSet;
use tempfile::TempDir;

/// Create a temporary project directory with a `.fabflow/` configuration.
///
/// Each entry in `tool_profiles` is written as one `tools/*.yaml` file.
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project(tool_profiles: &[(&str, &str)]) -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let fab_dir = temp_dir.path().join(".fabflow");
    std::fs::create_dir_all(fab_dir.join("tools"))?;

    std::fs::write(
        fab_dir.join("config.toml"),
        "name = \"testproj\"\nmonitor_interval_ms = 20\n",
    )?;

    for (file_name, yaml) in tool_profiles {
        std::fs::write(fab_dir.join("tools").join(file_name), yaml)?;
    }

    Ok(temp_dir)
}

/// A coordinator over `root` with the built-in stage set, driven by whatever
/// tool profiles the project configures.
#[allow(dead_code)]
pub fn coordinator_for(root: &std::path::Path) -> PipelineCoordinator {
    let config = load_config(root).expect("test project config should load");
    PipelineCoordinator::new(root, StageSet::builtin(&config.tools)).with_monitor_interval(
        std::time::Duration::from_millis(config.project.monitor_interval_ms),
    )
}
