//! Embedded template files for `.fabflow/` initialization.
//!
//! Uses `rust-embed` to embed the workspace `templates/` directory into the
//! binary at compile time, so `fabflow init` works without any external file
//! dependencies. The `debug-embed` feature makes debug builds embed too,
//! keeping test runs independent of the working directory.

use rust_embed::RustEmbed;

/// Embedded template files from the workspace `templates/` directory.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
pub struct TemplateAssets;

/// Get template file content by path relative to the templates root,
/// e.g. `"config.toml"` or `"tools/synthesis.yaml.example"`.
pub fn get_template(path: &str) -> Option<String> {
    TemplateAssets::get(path).map(|file| String::from_utf8_lossy(file.data.as_ref()).to_string())
}

/// List all template files under a directory prefix, e.g. `"tools/"`.
pub fn list_templates(prefix: &str) -> Vec<String> {
    TemplateAssets::iter()
        .filter(|path| path.starts_with(prefix))
        .map(|path| path.to_string())
        .collect()
}
