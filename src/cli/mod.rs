pub mod commands;
pub mod ui;

use std::path::{Path, PathBuf};

use crate::analyzer::{FileScanner, resolve_project_type};
use crate::config::{Config, ConfigLoader, ProjectType};
use crate::types::{DocGateError, Result, SourceFile};

/// Load configuration for a project root, honouring an explicit `--config`
pub fn load_config(root: &Path, explicit: Option<&PathBuf>) -> Result<Config> {
    ConfigLoader::load_from_root(root, explicit.map(PathBuf::as_path))
}

/// Resolve the project type and read the capped source list
pub fn read_project(root: &Path, config: &Config) -> Result<(ProjectType, Vec<SourceFile>)> {
    let project_type = resolve_project_type(config.analysis.project_type, root);
    let files = FileScanner::new(root, project_type)
        .with_exclude(&config.analysis.exclude)
        .with_max_files(config.analysis.max_files)
        .read_sources()?;

    if files.is_empty() {
        return Err(DocGateError::analysis(
            root.display().to_string(),
            "no supported source files found",
        ));
    }
    Ok((project_type, files))
}
