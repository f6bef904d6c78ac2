//! Feature extraction capability.
//!
//! A [`FeatureExtractor`] maps one epoch to a fixed-length [`Template`].
//! Extractors may keep state between calls (e.g. a fitted projection), so
//! extraction takes `&mut self`.

use rootstar_erp_core::{EventEpoch, SignalBlock, Template};

/// Maps an epoch to a feature vector.
pub trait FeatureExtractor {
    /// Extract the feature vector for one epoch.
    fn extract_features(&mut self, epoch: &EventEpoch) -> Template;
}

impl<F> FeatureExtractor for F
where
    F: FnMut(&EventEpoch) -> Template,
{
    fn extract_features(&mut self, epoch: &EventEpoch) -> Template {
        self(epoch)
    }
}

/// Concatenates the raw samples of the selected channels.
///
/// The simplest usable extractor: the template is the time-domain ERP
/// waveform itself. Channels missing from an epoch are skipped.
#[derive(Clone, Debug, Default)]
pub struct FlattenExtractor {
    channels: Vec<String>,
}

impl FlattenExtractor {
    /// Extractor over all channels, in epoch order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict extraction to the given channels, in the given order.
    #[must_use]
    pub fn with_channels(mut self, channels: Vec<String>) -> Self {
        self.channels = channels;
        self
    }
}

impl FeatureExtractor for FlattenExtractor {
    fn extract_features(&mut self, epoch: &EventEpoch) -> Template {
        if self.channels.is_empty() {
            return epoch.signals().concat();
        }
        self.channels
            .iter()
            .filter_map(|name| epoch.channel(name))
            .flat_map(|signal| signal.iter().copied())
            .collect()
    }
}
