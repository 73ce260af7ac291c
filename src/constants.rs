//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Critique scoring constants
pub mod critique {
    /// Score of a dimension with no matching signal
    pub const NEUTRAL_SCORE: f64 = 0.5;

    /// Added per positive pattern match
    pub const POSITIVE_INCREMENT: f64 = 0.15;

    /// Subtracted per negative pattern match (negative feedback is the stronger signal)
    pub const NEGATIVE_DECREMENT: f64 = 0.18;

    /// Number of words before a positive phrase scanned for a negator
    pub const NEGATION_WINDOW_WORDS: usize = 3;

    /// Signal count at which the signal half of confidence saturates
    pub const CONFIDENCE_SIGNAL_SATURATION: f64 = 4.0;

    /// Word count at which the length half of confidence saturates
    pub const CONFIDENCE_LENGTH_SATURATION: f64 = 40.0;

    /// Share of confidence driven by signal count (rest by length)
    pub const CONFIDENCE_SIGNAL_SHARE: f64 = 0.6;

    /// Overall score weights; must sum to 1.0
    pub mod weights {
        pub const TECHNICAL_ACCURACY: f64 = 0.25;
        pub const COMPLETENESS: f64 = 0.20;
        pub const CLARITY: f64 = 0.20;
        pub const STRUCTURE: f64 = 0.20;
        pub const USEFULNESS: f64 = 0.15;
    }
}

/// Quality gate constants
pub mod gate {
    /// Penalty per ERROR validation issue
    pub const ERROR_PENALTY: f64 = 0.2;

    /// Penalty per WARNING validation issue
    pub const WARNING_PENALTY: f64 = 0.1;

    /// Default combined score required to accept a draft
    pub const DEFAULT_THRESHOLD: f64 = 0.8;

    /// Default maximum generate/critique iterations
    pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
}

/// Retry policy constants
pub mod retry {
    /// Default retries after the first attempt
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Default base delay for exponential backoff (seconds)
    pub const DEFAULT_BASE_DELAY_SECS: u64 = 2;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 60;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: u32 = 2;
}

/// Response cache constants
pub mod cache {
    /// Maximum cached responses
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Cache entry lifetime (24 hours)
    pub const DEFAULT_TTL_SECS: u64 = 24 * 60 * 60;
}

/// Architecture pattern constants
pub mod patterns {
    /// Confidence for one corroborating signal
    pub const ONE_SIGNAL_CONFIDENCE: f64 = 0.4;

    /// Confidence for two corroborating signals
    pub const TWO_SIGNAL_CONFIDENCE: f64 = 0.65;

    /// Confidence for three or more corroborating signals
    pub const STRONG_CONFIDENCE: f64 = 0.9;

    /// Patterns above this confidence must be mentioned by the documentation
    pub const DOCUMENTATION_THRESHOLD: f64 = 0.7;

    /// Minimum in-degree for a file to count as a hub
    pub const MIN_HUB_FAN_IN: usize = 3;
}

/// File analysis constants
pub mod analysis {
    /// Default cap on files handed to the pipeline
    pub const DEFAULT_MAX_FILES: usize = 30;

    /// Maximum file size to analyze (1MB)
    pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

    /// Characters of each file included in prompts
    pub const MAX_CONTENT_PREVIEW: usize = 2000;

    /// Central files listed in the prompt context
    pub const CENTRAL_ELEMENTS_IN_PROMPT: usize = 10;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Default Ollama endpoint
    pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

    /// Default model
    pub const DEFAULT_MODEL: &str = "llama2:7b";
}
