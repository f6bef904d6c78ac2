//! Authentication error types.

use rootstar_erp_core::SignalError;
use thiserror::Error;

use crate::device::DeviceError;

/// Reasons an enrollment, authentication or identification is rejected.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum AuthError {
    /// Device is not connected
    #[error("Device is not connected")]
    DeviceUnavailable,

    /// Identity is not enrolled
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// Database holds no identities to identify against
    #[error("No identities enrolled")]
    NoEnrolledIdentities,

    /// Device was taken off during acquisition
    #[error("Device was removed during acquisition")]
    DeviceRemoved,

    /// Stimulus task was aborted
    #[error("Task was aborted")]
    TaskAborted,

    /// Acquisition produced no usable epoch
    #[error("No usable epochs were acquired")]
    NoEpochs,

    /// Expected a single similarity score
    #[error("Expected exactly one similarity result, got {count}")]
    AmbiguousSimilarityResult {
        /// Number of scores produced
        count: usize,
    },

    /// Similarity could not be computed
    #[error("Similarity is undefined")]
    UndefinedSimilarity,

    /// Best similarity did not reach the threshold
    #[error("Similarity {similarity:.4} is below threshold {threshold:.4}")]
    BelowThreshold {
        /// Achieved similarity
        similarity: f64,
        /// Required similarity
        threshold: f64,
    },

    /// Device failure
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Signal processing failure
    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),
}

impl AuthError {
    /// Whether the failure happened while acquiring data, as opposed to a
    /// structural rejection before acquisition or a scoring rejection after.
    #[must_use]
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            Self::DeviceRemoved | Self::TaskAborted | Self::NoEpochs | Self::Device(_) | Self::Signal(_)
        )
    }
}

/// Result type for engine operations.
pub type AuthResult<T> = Result<T, AuthError>;
