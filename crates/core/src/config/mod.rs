//! Project and tool-profile configuration.
//!
//! Everything under `<project>/.fabflow/` is loaded here: global settings
//! from `config.toml` and per-stage tool bindings from `tools/*.yaml`.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::{AppConfig, ProjectConfig, ToolCatalog, ToolProfile};
