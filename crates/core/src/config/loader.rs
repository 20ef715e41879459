//! Configuration file loader for the `.fabflow/` directory structure.
//!
//! Layout:
//! - `config.toml`: global project settings
//! - `tools/*.yaml`: one tool profile per file, binding a stage to an
//!   external tool command line
//!
//! Missing directories or files produce defaults, not errors; a project that
//! has never been initialized still compiles with the built-in stand-ins.

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::{AppConfig, ProjectConfig, ToolCatalog, ToolProfile};
use crate::runner::tokenize::split_command_line;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// Load all configuration from `<root>/.fabflow/`.
///
/// # Errors
///
/// Returns `ConfigError` if files exist but cannot be read or parsed.
/// Absence of the `.fabflow/` directory is not an error.
pub fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let fab_dir = root.join(".fabflow");

    if !fab_dir.exists() {
        return Ok(AppConfig::default());
    }

    let project = load_project_config(&fab_dir)?;
    let tools = load_tools(&fab_dir)?;

    Ok(AppConfig { project, tools })
}

/// Loads global settings from `config.toml`.
fn load_project_config(fab_dir: &Path) -> ConfigResult<ProjectConfig> {
    let config_path = fab_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let config: ProjectConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path,
            source,
        })?;

    Ok(config)
}

/// Loads all tool profiles from `tools/*.yaml`.
fn load_tools(fab_dir: &Path) -> ConfigResult<ToolCatalog> {
    let tools_dir = fab_dir.join("tools");

    if !tools_dir.exists() {
        return Ok(ToolCatalog::new());
    }

    let mut catalog = ToolCatalog::new();

    for entry in WalkDir::new(&tools_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: tools_dir.clone(),
            source,
        })?;

        let path = entry.path();
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if !entry.file_type().is_file() || !is_yaml {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let profile: ToolProfile =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;

        if profile.command.trim().is_empty() {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: "tool profile has an empty command".to_string(),
            });
        }

        check_program_resolvable(&profile);
        catalog.insert(profile);
    }

    Ok(catalog)
}

/// Warn when a profile's program cannot be found on PATH. Loading still
/// succeeds; the failure surfaces at run time like any other spawn failure.
fn check_program_resolvable(profile: &ToolProfile) {
    if let Some((program, _args)) = split_command_line(&profile.command) {
        if which::which(&program).is_err() {
            warn!(
                "tool for stage '{}' not found on PATH: {program}",
                profile.stage
            );
        }
    }
}
