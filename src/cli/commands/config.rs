//! Config Command
//!
//! Usage:
//!   docgate config show [-f json]
//!   docgate config path
//!   docgate config init [--force]

use std::path::{Path, PathBuf};

use crate::cli::ui::output::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Print the merged configuration
pub fn show(explicit: Option<&PathBuf>, format: &str) -> Result<()> {
    ConfigLoader::show_config(explicit.map(PathBuf::as_path), format == "json")
}

pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write `.docgate/config.toml` in the current directory
pub fn init(force: bool) -> Result<()> {
    let path = ConfigLoader::init_project(Path::new("."), force)?;
    Output::new().success(&format!("Project configuration at {}", path.display()));
    Ok(())
}
