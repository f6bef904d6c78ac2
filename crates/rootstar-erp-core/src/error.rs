//! Error types for signal containers and epochs.

use thiserror::Error;

/// Errors raised while recording or slicing signals.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    /// A sample carried a different number of values than there are channels
    #[error("Sample has {got} values but the container has {expected} channels")]
    ArityMismatch {
        /// Configured channel count
        expected: usize,
        /// Values carried by the sample
        got: usize,
    },

    /// A channel name was not found
    #[error("No channel named {0:?}")]
    UnknownChannel(String),

    /// Operation needs at least one recorded sample
    #[error("Container holds no samples")]
    EmptyContainer,

    /// Two epochs could not be combined
    #[error("Epochs are incompatible: {0}")]
    EpochMismatch(String),

    /// Averaging was requested over zero epochs
    #[error("Cannot average an empty set of epochs")]
    EmptyEpochSet,

    /// A time window selected no samples
    #[error("Invalid time window: {start_ms}ms to {end_ms}ms")]
    InvalidWindow {
        /// Window start in milliseconds
        start_ms: f64,
        /// Window end in milliseconds
        end_ms: f64,
    },
}

/// Result type for signal operations.
pub type SignalResult<T> = Result<T, SignalError>;
