//! Engine configuration.
//!
//! Every field has a default, so a configuration file only needs the values
//! it changes:
//!
//! ```json
//! {"threshold": 0.8, "similarity_mode": "best_similarity"}
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Modes
// ============================================================================

/// How fresh epochs are turned into templates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMode {
    /// One template from the epoch average
    #[default]
    AverageTemplate,
    /// One template per epoch
    SingleTemplates,
    /// The average template followed by one template per epoch
    AverageAndSingleTemplates,
}

/// How pairwise template similarities are reduced to one score.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMode {
    /// Arithmetic mean over all pairs
    #[default]
    AverageSimilarity,
    /// Maximum over all pairs
    BestSimilarity,
}

// ============================================================================
// Engine Configuration
// ============================================================================

/// Errors raised while loading or saving a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration document
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Defaults used by the authentication engine when a call does not override
/// them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum similarity for acceptance
    pub threshold: f64,
    /// Template construction for enrollment and authentication
    pub template_mode: TemplateMode,
    /// Reduction of pairwise similarities
    pub similarity_mode: SimilarityMode,
    /// Epoch window before each stimulus (ms)
    pub before_event_ms: u32,
    /// Epoch window after each stimulus (ms)
    pub after_event_ms: u32,
    /// Acquisition time for enrollment (seconds)
    pub enroll_timeout_secs: f64,
    /// Acquisition time for authentication and identification (seconds)
    pub auth_timeout_secs: f64,
    /// Sleep between acquisition polls that found no data (ms)
    pub poll_interval_ms: u64,
    /// Forward engine events to the tracing log
    pub event_logging: bool,
    /// Write databases and recordings to `log_dir`
    pub file_logging: bool,
    /// Directory for file logging
    pub log_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: 0.725,
            template_mode: TemplateMode::default(),
            similarity_mode: SimilarityMode::default(),
            before_event_ms: 100,
            after_event_ms: 500,
            enroll_timeout_secs: 60.0,
            auth_timeout_secs: 10.0,
            poll_interval_ms: 1,
            event_logging: true,
            file_logging: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl EngineConfig {
    /// Set the acceptance threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the template mode.
    #[must_use]
    pub fn with_template_mode(mut self, mode: TemplateMode) -> Self {
        self.template_mode = mode;
        self
    }

    /// Set the similarity mode.
    #[must_use]
    pub fn with_similarity_mode(mut self, mode: SimilarityMode) -> Self {
        self.similarity_mode = mode;
        self
    }

    /// Set the epoch window around each stimulus.
    #[must_use]
    pub fn with_epoch_window(mut self, before_ms: u32, after_ms: u32) -> Self {
        self.before_event_ms = before_ms;
        self.after_event_ms = after_ms;
        self
    }

    /// Default enrollment acquisition time.
    #[must_use]
    pub fn enroll_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.enroll_timeout_secs).unwrap_or(Duration::ZERO)
    }

    /// Default authentication acquisition time.
    #[must_use]
    pub fn auth_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.auth_timeout_secs).unwrap_or(Duration::ZERO)
    }

    /// Idle sleep between acquisition polls.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
