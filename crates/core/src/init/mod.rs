//! Initialization of the `.fabflow/` project directory.
//!
//! Generates a `.fabflow/` directory with pre-configured templates for:
//! - Global project settings (`config.toml`)
//! - Tool profile examples (`tools/*.yaml.example`)
//!
//! # Example
//!
//! ```no_run
//! use fab_core::init::{generate_fabflow_structure, InitOptions};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = InitOptions {
//!     target_dir: PathBuf::from("."),
//!     force: false,
//! };
//! generate_fabflow_structure(options).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
pub mod templates;

pub use error::{InitError, InitResult};
pub use generator::{generate_fabflow_structure, InitOptions};
pub use templates::{get_template, list_templates};
