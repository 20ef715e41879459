//! Directory structure and file generation for `.fabflow/` initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for initializing a `.fabflow` directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Target directory where `.fabflow` will be created.
    pub target_dir: PathBuf,

    /// Overwrite an existing `.fabflow` directory.
    pub force: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
        }
    }
}

/// Generate a complete `.fabflow` directory structure from the embedded
/// templates.
///
/// Creates:
/// ```text
/// .fabflow/
/// ├── config.toml
/// └── tools/
///     ├── synthesis.yaml.example
///     └── routing.yaml.example
/// ```
///
/// # Errors
///
/// Fails if the `.fabflow` directory already exists (without `force`), a
/// template cannot be found, or a filesystem operation fails.
pub async fn generate_fabflow_structure(options: InitOptions) -> InitResult<()> {
    let fab_dir = options.target_dir.join(".fabflow");

    if fab_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(fab_dir));
    }

    fs::create_dir_all(fab_dir.join("tools")).map_err(|source| InitError::DirectoryCreate {
        path: fab_dir.join("tools"),
        source,
    })?;

    write_template_file(&fab_dir, "config.toml")?;
    for tool_path in list_templates("tools/") {
        write_template_file(&fab_dir, &tool_path)?;
    }

    Ok(())
}

/// Write one embedded template into the `.fabflow` directory, creating parent
/// directories as needed.
fn write_template_file(fab_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = fab_dir.join(template_path);
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path,
        source,
    })
}
