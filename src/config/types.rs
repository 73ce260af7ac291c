//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Every section is `#[serde(default)]` so partial files merge cleanly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{analysis, cache, gate, network, retry};
use crate::types::{DocGateError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation service settings
    pub llm: LlmConfig,

    /// Quality gate and retry settings
    pub refinement: RefinementConfig,

    /// Response cache settings
    pub cache: CacheConfig,

    /// Source analysis settings
    pub analysis: AnalysisConfig,

    /// Output settings
    pub output: OutputConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `DocGateError::Configuration` on the first violation.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.refinement.critique_threshold) {
            return Err(DocGateError::config(format!(
                "refinement.critique_threshold must be between 0.0 and 1.0, got {}",
                self.refinement.critique_threshold
            )));
        }

        if self.refinement.max_iterations == 0 {
            return Err(DocGateError::config(
                "refinement.max_iterations must be at least 1",
            ));
        }

        if self.refinement.retry_base_delay_seconds == 0 {
            return Err(DocGateError::config(
                "refinement.retry_base_delay_seconds must be at least 1",
            ));
        }

        if self.cache.capacity == 0 {
            return Err(DocGateError::config("cache.capacity must be at least 1"));
        }

        if self.cache.ttl_seconds == 0 {
            return Err(DocGateError::config("cache.ttl_seconds must be at least 1"));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DocGateError::config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(DocGateError::config(
                "llm.timeout_secs must be greater than 0",
            ));
        }

        if self.llm.model.trim().is_empty() {
            return Err(DocGateError::config("llm.model must not be empty"));
        }

        if self.analysis.max_files == 0 {
            return Err(DocGateError::config("analysis.max_files must be at least 1"));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (only "ollama" is shipped)
    pub provider: String,

    /// Model identifier, also part of every cache key
    pub model: String,

    /// Base URL of the generation service
    pub api_base: String,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: network::DEFAULT_MODEL.to_string(),
            api_base: network::DEFAULT_OLLAMA_URL.to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Refinement Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    /// Combined score a draft must reach to be accepted
    pub critique_threshold: f64,

    /// Upper bound on generate/critique iterations
    pub max_iterations: u32,

    /// Retries after the first attempt of each external call
    pub max_retries: u32,

    pub retry_base_delay_seconds: u64,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            critique_threshold: gate::DEFAULT_THRESHOLD,
            max_iterations: gate::DEFAULT_MAX_ITERATIONS,
            max_retries: retry::DEFAULT_MAX_RETRIES,
            retry_base_delay_seconds: retry::DEFAULT_BASE_DELAY_SECS,
        }
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: cache::DEFAULT_CAPACITY,
            ttl_seconds: cache::DEFAULT_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum number of files handed to the pipeline
    pub max_files: usize,

    /// Project type override; `auto` runs detection
    pub project_type: ProjectType,

    /// Extra glob patterns to exclude
    pub exclude: Vec<String>,

    /// Warn when a confidently detected pattern goes undocumented
    pub check_patterns: bool,

    /// Warn on relationship claims with no supporting graph edge
    pub check_relationships: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_files: analysis::DEFAULT_MAX_FILES,
            project_type: ProjectType::Auto,
            exclude: Vec::new(),
            check_patterns: true,
            check_relationships: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Frontend,
    Backend,
    Mixed,
    #[default]
    Auto,
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectType::Frontend => write!(f, "frontend"),
            ProjectType::Backend => write!(f, "backend"),
            ProjectType::Mixed => write!(f, "mixed"),
            ProjectType::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "frontend" => Ok(ProjectType::Frontend),
            "backend" => Ok(ProjectType::Backend),
            "mixed" => Ok(ProjectType::Mixed),
            "auto" => Ok(ProjectType::Auto),
            _ => Err(format!(
                "Invalid project type: {}. Use: frontend, backend, mixed, auto",
                s
            )),
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Output file; defaults to `<project>/docs/DOCUMENTATION.<ext>`
    pub path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Markdown,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Html => "html",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Html => write!(f, "html"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!("Invalid output format: {}. Use: markdown, html", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.refinement.critique_threshold, 0.8);
        assert_eq!(config.refinement.max_iterations, 3);
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.cache.ttl_seconds, 86_400);
        assert_eq!(config.analysis.max_files, 30);
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = Config::default();
        config.refinement.critique_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, DocGateError::Configuration(_)));
        assert!(err.to_string().contains("critique_threshold"));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut config = Config::default();
        config.refinement.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_base_delay_rejected() {
        let mut config = Config::default();
        config.refinement.retry_base_delay_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retries_allowed() {
        let mut config = Config::default();
        config.refinement.max_retries = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_project_type_parse() {
        assert_eq!("Backend".parse::<ProjectType>().unwrap(), ProjectType::Backend);
        assert!("desktop".parse::<ProjectType>().is_err());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert!("pdf".parse::<OutputFormat>().is_err());
    }
}
