//! Configuration Management
//!
//! Hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/docgate/config.toml)
//! 3. Project config (.docgate/config.toml)
//! 4. Environment variables (DOCGATE_*, plus legacy OLLAMA_API_URL / MODEL_NAME / API_TIMEOUT)
//! 5. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
