//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/docgate/config.toml)
//! 3. Project config (.docgate/config.toml) or an explicit `--config` file
//! 4. Environment variables (DOCGATE_<SECTION>__<KEY>)
//! 5. Legacy variables (OLLAMA_API_URL, MODEL_NAME, API_TIMEOUT)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{DocGateError, Result};

const PROJECT_DIR: &str = ".docgate";
const CONFIG_FILE: &str = "config.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain, rooted at the
    /// current directory. An explicit path replaces the project file.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        Self::load_from_root(Path::new("."), explicit)
    }

    /// Same as [`ConfigLoader::load`] with the project file looked up under `root`
    pub fn load_from_root(root: &Path, explicit: Option<&Path>) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!(path = %global_path.display(), "Loading global config");
            figment = figment.merge(Toml::file(&global_path));
        }

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(DocGateError::config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), "Loading explicit config");
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let project_path = Self::project_config_path(root);
                if project_path.exists() {
                    debug!(path = %project_path.display(), "Loading project config");
                    figment = figment.merge(Toml::file(&project_path));
                }
            }
        }

        // DOCGATE_REFINEMENT__MAX_ITERATIONS -> refinement.max_iterations
        figment = figment
            .merge(Env::prefixed("DOCGATE_").split("__"))
            .merge(Self::legacy_env());

        Self::extract(figment)
    }

    /// Load configuration from a specific file only (defaults + file)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| DocGateError::config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Unprefixed variables kept for compatibility with older setups
    fn legacy_env() -> Env {
        Env::raw()
            .only(&["OLLAMA_API_URL", "MODEL_NAME", "API_TIMEOUT"])
            .map(|key| {
                if key == "OLLAMA_API_URL" {
                    "llm.api_base".into()
                } else if key == "MODEL_NAME" {
                    "llm.model".into()
                } else {
                    "llm.timeout_secs".into()
                }
            })
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/docgate/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("docgate"))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    pub fn project_config_path(root: &Path) -> PathBuf {
        root.join(PROJECT_DIR).join(CONFIG_FILE)
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path(Path::new("."));
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(explicit: Option<&Path>, as_json: bool) -> Result<()> {
        let config = Self::load(explicit)?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| DocGateError::config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write a default project config under `root`; existing files are kept
    /// unless `force` is set
    pub fn init_project(root: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = root.join(PROJECT_DIR);
        fs::create_dir_all(&project_dir)?;

        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_project_config())?;
            info!(path = %config_path.display(), "Created project config");
        } else {
            info!(path = %config_path.display(), "Project config exists");
        }

        Ok(config_path)
    }

    fn default_project_config() -> String {
        r#"# docgate project configuration
# Settings here override ~/.config/docgate/config.toml.
# Environment variables (DOCGATE_<SECTION>__<KEY>) override both.

[llm]
provider = "ollama"
model = "llama2:7b"
api_base = "http://localhost:11434"
timeout_secs = 300
temperature = 0.2

[refinement]
critique_threshold = 0.8
max_iterations = 3
max_retries = 3
retry_base_delay_seconds = 2

[cache]
capacity = 100
ttl_seconds = 86400

[analysis]
max_files = 30
project_type = "auto"
exclude = []
check_patterns = true
check_relationships = true

[output]
format = "markdown"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from_root(temp_dir.path(), None).unwrap();
        assert_eq!(config.cache.capacity, 100);
    }

    #[test]
    fn test_init_project_roundtrips() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(temp_dir.path(), false).unwrap();

        assert!(path.exists());
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.refinement.retry_base_delay_seconds, 2);
        assert_eq!(config.output.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_init_project_keeps_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_project(temp_dir.path(), false).unwrap();
        fs::write(&path, "[cache]\ncapacity = 7\n").unwrap();

        ConfigLoader::init_project(temp_dir.path(), false).unwrap();
        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.cache.capacity, 7);
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(PROJECT_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CONFIG_FILE), "[output]\nformat = \"html\"\n").unwrap();

        let config = ConfigLoader::load_from_root(temp_dir.path(), None).unwrap();
        assert_eq!(config.output.format, OutputFormat::Html);
    }

    #[test]
    fn test_invalid_file_fails_fast() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "[refinement]\ncritique_threshold = 1.5\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, DocGateError::Configuration(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(ConfigLoader::load_from_root(temp_dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_env_override() {
        let temp_dir = TempDir::new().unwrap();
        // SAFETY: no other test reads this variable
        unsafe {
            env::set_var("DOCGATE_CACHE__TTL_SECONDS", "120");
        }
        let config = ConfigLoader::load_from_root(temp_dir.path(), None).unwrap();
        assert_eq!(config.cache.ttl_seconds, 120);
        unsafe {
            env::remove_var("DOCGATE_CACHE__TTL_SECONDS");
        }
    }

    #[test]
    fn test_legacy_env_override() {
        let temp_dir = TempDir::new().unwrap();
        // SAFETY: no other test reads this variable
        unsafe {
            env::set_var("MODEL_NAME", "codellama:13b");
        }
        let config = ConfigLoader::load_from_root(temp_dir.path(), None).unwrap();
        assert_eq!(config.llm.model, "codellama:13b");
        unsafe {
            env::remove_var("MODEL_NAME");
        }
    }
}
