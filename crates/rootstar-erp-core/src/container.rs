//! Streaming multi-channel signal container.
//!
//! A [`SignalContainer`] is filled sample by sample while a device streams,
//! keeps a list of registered stimulus events, and cuts [`EventEpoch`]s
//! around them.
//!
//! # Example
//!
//! ```rust
//! use rootstar_erp_core::{Sample, SignalContainer};
//!
//! let mut container = SignalContainer::new(vec!["Cz".into()], 100);
//! for i in 0..100 {
//!     container.add_sample(&Sample::new(f64::from(i) / 100.0, vec![0.0])).unwrap();
//! }
//!
//! // 50 ms before (5 samples) and 100 ms after (10 + 1 samples)
//! let epoch = container.extract_epoch(0.5, 50, 100).unwrap();
//! assert_eq!(epoch.len(), 16);
//! assert_eq!(container.events(), &[0.5]);
//! ```

use serde::{Deserialize, Serialize};

use crate::epoch::EventEpoch;
use crate::error::{SignalError, SignalResult};
use crate::math::{average_signals, nearest_index};
use crate::types::Sample;

/// Shared view over a block of equally sampled channels.
///
/// Implemented by both [`SignalContainer`] and [`EventEpoch`] so filters and
/// spectral analysis can operate on either.
pub trait SignalBlock {
    /// Channel names, in storage order.
    fn channel_names(&self) -> &[String];

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Sample timestamps in seconds.
    fn timestamps(&self) -> &[f64];

    /// One signal per channel, in channel order.
    fn signals(&self) -> &[Vec<f64>];

    /// Mutable signals. Implementations of in-place filters must keep every
    /// channel at its current length.
    fn signals_mut(&mut self) -> &mut [Vec<f64>];

    /// Index of a channel by name.
    fn channel_index(&self, name: &str) -> Option<usize> {
        self.channel_names().iter().position(|c| c == name)
    }

    /// Signal of a channel by name.
    fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channel_index(name).map(|i| self.signals()[i].as_slice())
    }

    /// Number of samples per channel.
    fn sample_count(&self) -> usize {
        self.timestamps().len()
    }
}

/// Average selected channels of any block into one merged signal.
///
/// Returns the merged channel name (source names concatenated) and signal.
pub(crate) fn merge_channels<B: SignalBlock + ?Sized>(
    block: &B,
    selection: &[&str],
) -> SignalResult<(String, Vec<f64>)> {
    if selection.is_empty() {
        let signals: Vec<&[f64]> = block.signals().iter().map(Vec::as_slice).collect();
        return Ok((block.channel_names().concat(), average_signals(&signals)));
    }

    let signals = selection
        .iter()
        .map(|name| {
            block
                .channel(name)
                .ok_or_else(|| SignalError::UnknownChannel((*name).to_string()))
        })
        .collect::<SignalResult<Vec<_>>>()?;

    Ok((selection.concat(), average_signals(&signals)))
}

/// Ordered multi-channel time series recorded from one acquisition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalContainer {
    channel_names: Vec<String>,
    sample_rate: u32,
    signals: Vec<Vec<f64>>,
    timestamps: Vec<f64>,
    events: Vec<f64>,
}

impl SignalContainer {
    /// Create an empty container for the given channels.
    ///
    /// Samples must later arrive in the same channel order.
    #[must_use]
    pub fn new(channel_names: Vec<String>, sample_rate: u32) -> Self {
        let signals = vec![Vec::new(); channel_names.len()];
        Self {
            channel_names,
            sample_rate,
            signals,
            timestamps: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Append one sample.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::ArityMismatch`] if the sample does not carry one
    /// value per channel. The container is left untouched in that case.
    pub fn add_sample(&mut self, sample: &Sample) -> SignalResult<()> {
        if sample.values.len() != self.channel_names.len() {
            return Err(SignalError::ArityMismatch {
                expected: self.channel_names.len(),
                got: sample.values.len(),
            });
        }

        self.timestamps.push(sample.timestamp);
        for (signal, &value) in self.signals.iter_mut().zip(&sample.values) {
            signal.push(value);
        }
        Ok(())
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether no samples have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Registered event times, in registration order.
    #[must_use]
    pub fn events(&self) -> &[f64] {
        &self.events
    }

    /// Register an event at the recorded timestamp nearest to `event_time`.
    ///
    /// Registration is idempotent. Returns the timestamp that was registered.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::EmptyContainer`] if nothing has been recorded.
    pub fn register_event(&mut self, event_time: f64) -> SignalResult<f64> {
        let index = self.locate(event_time)?;
        Ok(self.register_index(index))
    }

    /// Cut an epoch around the sample nearest to `event_time` and register
    /// the event.
    ///
    /// The window spans `before_ms * rate / 1000` samples before and
    /// `after_ms * rate / 1000 + 1` samples from the located sample on,
    /// clamped to the recording. Epoch timestamps are re-based so the
    /// located sample sits at `0.0`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::EmptyContainer`] if nothing has been recorded.
    pub fn extract_epoch(
        &mut self,
        event_time: f64,
        before_ms: u32,
        after_ms: u32,
    ) -> SignalResult<EventEpoch> {
        let index = self.locate(event_time)?;
        self.register_index(index);
        Ok(self.cut(index, before_ms, after_ms))
    }

    /// One epoch per registered event, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::EmptyContainer`] if events are registered but
    /// no samples exist.
    pub fn get_all_epochs(&self, before_ms: u32, after_ms: u32) -> SignalResult<Vec<EventEpoch>> {
        self.events
            .iter()
            .map(|&t| self.locate(t).map(|i| self.cut(i, before_ms, after_ms)))
            .collect()
    }

    /// New container with a single channel holding the mean of `selection`
    /// (all channels when empty). The source is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::UnknownChannel`] for an unknown name.
    pub fn average_channels(&self, selection: &[&str]) -> SignalResult<Self> {
        let (name, signal) = merge_channels(self, selection)?;
        Ok(self.with_signals(vec![name], vec![signal]))
    }

    /// New container with one averaged channel per group. An empty group
    /// list averages all channels into one.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::UnknownChannel`] for an unknown name.
    pub fn average_channel_groups(&self, groups: &[&[&str]]) -> SignalResult<Self> {
        if groups.is_empty() {
            return self.average_channels(&[]);
        }

        let (names, signals): (Vec<String>, Vec<Vec<f64>>) = groups
            .iter()
            .map(|group| merge_channels(self, group))
            .collect::<SignalResult<Vec<_>>>()?
            .into_iter()
            .unzip();
        Ok(self.with_signals(names, signals))
    }

    /// Shift timestamps and events so the first sample sits at `0.0`.
    pub fn shift_timestamps(&mut self) {
        let Some(&first) = self.timestamps.first() else {
            return;
        };
        for t in &mut self.timestamps {
            *t -= first;
        }
        for e in &mut self.events {
            *e -= first;
        }
    }

    fn with_signals(&self, channel_names: Vec<String>, signals: Vec<Vec<f64>>) -> Self {
        Self {
            channel_names,
            sample_rate: self.sample_rate,
            signals,
            timestamps: self.timestamps.clone(),
            events: self.events.clone(),
        }
    }

    fn locate(&self, event_time: f64) -> SignalResult<usize> {
        nearest_index(&self.timestamps, event_time).ok_or(SignalError::EmptyContainer)
    }

    fn register_index(&mut self, index: usize) -> f64 {
        let located = self.timestamps[index];
        if !self.events.contains(&located) {
            self.events.push(located);
        }
        located
    }

    fn cut(&self, index: usize, before_ms: u32, after_ms: u32) -> EventEpoch {
        let rate = u64::from(self.sample_rate);
        let before = usize::try_from(u64::from(before_ms) * rate / 1000).unwrap_or(usize::MAX);
        let after = usize::try_from(u64::from(after_ms) * rate / 1000 + 1).unwrap_or(usize::MAX);

        let start = index.saturating_sub(before);
        let end = index.saturating_add(after).min(self.timestamps.len());
        let origin = self.timestamps[index];

        let timestamps = self.timestamps[start..end].iter().map(|t| t - origin).collect();
        let signals = self.signals.iter().map(|s| s[start..end].to_vec()).collect();

        EventEpoch::from_parts(self.channel_names.clone(), self.sample_rate, signals, timestamps)
    }
}

impl SignalBlock for SignalContainer {
    fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    fn signals(&self) -> &[Vec<f64>] {
        &self.signals
    }

    fn signals_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn ramp(channels: &[&str], rate: u32, n: usize) -> SignalContainer {
        let names = channels.iter().map(|c| (*c).to_string()).collect();
        let mut container = SignalContainer::new(names, rate);
        for i in 0..n {
            let t = i as f64 / f64::from(rate);
            let values = (0..channels.len()).map(|c| (i * (c + 1)) as f64).collect();
            container.add_sample(&Sample::new(t, values)).unwrap();
        }
        container
    }

    #[test]
    fn test_add_sample_arity_mismatch_leaves_state() {
        let mut container = ramp(&["TP9", "TP10"], 256, 3);
        let before = container.clone();

        let err = container.add_sample(&Sample::new(1.0, vec![1.0])).unwrap_err();

        assert_eq!(err, SignalError::ArityMismatch { expected: 2, got: 1 });
        assert_eq!(container, before);
    }

    #[test]
    fn test_extract_epoch_rebases_to_event() {
        let mut container = ramp(&["Cz"], 256, 512);
        let epoch = container.extract_epoch(1.0, 100, 500).unwrap();

        // 25 samples before, 129 from the event on
        assert_eq!(epoch.len(), 25 + 129);
        assert_relative_eq!(epoch.timestamps()[25], 0.0);
        assert_relative_eq!(epoch.signals()[0][25], 256.0);
        assert_eq!(container.events(), &[1.0]);
    }

    #[test]
    fn test_extract_epoch_uses_nearest_timestamp() {
        let mut container = ramp(&["Cz"], 100, 100);
        let epoch = container.extract_epoch(0.503, 0, 0).unwrap();

        assert_eq!(epoch.len(), 1);
        assert_relative_eq!(container.events()[0], 0.5);
    }

    #[test]
    fn test_extract_epoch_clamps_at_bounds() {
        let mut container = ramp(&["Cz"], 100, 50);

        let head = container.extract_epoch(0.0, 100, 100).unwrap();
        assert_eq!(head.len(), 11);

        let tail = container.extract_epoch(0.49, 100, 100).unwrap();
        assert_eq!(tail.len(), 10 + 1);
        assert_relative_eq!(*tail.timestamps().last().unwrap(), 0.0);
    }

    #[test]
    fn test_extract_epoch_empty_container() {
        let mut container = SignalContainer::new(vec!["Cz".into()], 100);
        assert_eq!(
            container.extract_epoch(0.0, 10, 10).unwrap_err(),
            SignalError::EmptyContainer
        );
    }

    #[test]
    fn test_events_registered_once_in_order() {
        let mut container = ramp(&["Cz"], 100, 100);
        container.extract_epoch(0.2, 10, 10).unwrap();
        container.extract_epoch(0.7, 10, 10).unwrap();
        container.extract_epoch(0.2, 10, 10).unwrap();

        assert_eq!(container.events(), &[0.2, 0.7]);

        let epochs = container.get_all_epochs(10, 10).unwrap();
        assert_eq!(epochs.len(), 2);
        assert_relative_eq!(epochs[1].signals()[0][1], 70.0);
    }

    #[test]
    fn test_average_channels_all_and_selection() {
        let container = ramp(&["C1", "C2", "C3"], 100, 4);

        let all = container.average_channels(&[]).unwrap();
        assert_eq!(all.channel_names(), &["C1C2C3".to_string()]);
        assert_eq!(all.signals()[0], vec![0.0, 2.0, 4.0, 6.0]);

        let some = container.average_channels(&["C1", "C3"]).unwrap();
        assert_eq!(some.channel("C1C3").unwrap(), &[0.0, 2.0, 4.0, 6.0]);

        // source untouched
        assert_eq!(container.channel_names().len(), 3);
    }

    #[test]
    fn test_average_channel_groups() {
        let container = ramp(&["C1", "C2", "C3"], 100, 2);
        let grouped = container
            .average_channel_groups(&[&["C1", "C2"], &["C3"]])
            .unwrap();

        assert_eq!(grouped.channel_names(), &["C1C2".to_string(), "C3".to_string()]);
        assert_eq!(grouped.signals()[0], vec![0.0, 1.5]);
        assert_eq!(grouped.signals()[1], vec![0.0, 3.0]);

        let err = container.average_channel_groups(&[&["C9"]]).unwrap_err();
        assert_eq!(err, SignalError::UnknownChannel("C9".into()));
    }

    #[test]
    fn test_shift_timestamps() {
        let mut container = SignalContainer::new(vec!["Cz".into()], 10);
        for i in 0..5 {
            container
                .add_sample(&Sample::new(100.0 + f64::from(i) / 10.0, vec![0.0]))
                .unwrap();
        }
        container.register_event(100.2).unwrap();
        container.shift_timestamps();

        assert_relative_eq!(container.timestamps()[0], 0.0);
        assert_relative_eq!(container.events()[0], 0.2, epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn prop_epoch_length_matches_window(
            rate in 50u32..512,
            n in 1usize..600,
            pos in 0.0f64..1.0,
            before_ms in 0u32..400,
            after_ms in 0u32..800,
        ) {
            let mut container = ramp(&["Cz"], rate, n);
            let index = ((n - 1) as f64 * pos) as usize;
            let event = container.timestamps()[index];

            let epoch = container.extract_epoch(event, before_ms, after_ms).unwrap();

            let before = (u64::from(before_ms) * u64::from(rate) / 1000) as usize;
            let after = (u64::from(after_ms) * u64::from(rate) / 1000 + 1) as usize;
            let start = index.saturating_sub(before);
            let end = (index + after).min(n);

            prop_assert_eq!(epoch.len(), end - start);
            prop_assert_eq!(epoch.timestamps()[index - start], 0.0);
        }
    }
}
