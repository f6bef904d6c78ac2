//! Core data types shared across the ERP pipeline.

use serde::{Deserialize, Serialize};

/// A feature vector describing one epoch (or an average of epochs).
///
/// The dimension is fixed by the feature extractor that produced it.
pub type Template = Vec<f64>;

/// One multi-channel reading from an acquisition device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Acquisition time in seconds
    pub timestamp: f64,
    /// One value per channel, in channel order
    pub values: Vec<f64>,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub fn new(timestamp: f64, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }

    /// Number of channel values carried.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.values.len()
    }
}

/// A stimulus presented by an acquisition task.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StimulusEvent {
    /// Presentation time in seconds, same time base as the device samples
    pub timestamp: f64,
    /// Whether this stimulus is the target the subject attends to
    pub is_target: bool,
}

impl StimulusEvent {
    /// Create a target stimulus.
    #[must_use]
    pub fn target(timestamp: f64) -> Self {
        Self { timestamp, is_target: true }
    }

    /// Create a non-target (distractor) stimulus.
    #[must_use]
    pub fn distractor(timestamp: f64) -> Self {
        Self { timestamp, is_target: false }
    }
}
