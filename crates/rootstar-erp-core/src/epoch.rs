//! Stimulus-locked epochs.
//!
//! An [`EventEpoch`] is a fixed window cut from a
//! [`SignalContainer`](crate::SignalContainer) around one stimulus, with
//! timestamps re-based so the stimulus sits at `0.0`. Epochs are the unit fed
//! to preprocessing and feature extraction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::container::{merge_channels, SignalBlock};
use crate::error::{SignalError, SignalResult};
use crate::math::{mean, nearest_index, std_dev};

/// Amplitude above which an epoch is considered contaminated by a blink.
pub const BLINK_THRESHOLD: f64 = 100.0;

/// Default window (ms after stimulus) searched for the ERP deflection.
pub const DEFAULT_SNR_WINDOW_MS: (f64, f64) = (250.0, 400.0);

/// Multi-channel signal window centred on one stimulus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEpoch {
    channel_names: Vec<String>,
    sample_rate: u32,
    signals: Vec<Vec<f64>>,
    timestamps: Vec<f64>,
}

impl EventEpoch {
    /// Create an epoch from raw parts.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::EpochMismatch`] if the channel count differs
    /// from the number of signals, or any signal differs in length from the
    /// timestamps.
    pub fn new(
        channel_names: Vec<String>,
        sample_rate: u32,
        signals: Vec<Vec<f64>>,
        timestamps: Vec<f64>,
    ) -> SignalResult<Self> {
        if channel_names.len() != signals.len() {
            return Err(SignalError::EpochMismatch(format!(
                "{} channel names for {} signals",
                channel_names.len(),
                signals.len()
            )));
        }
        if let Some(bad) = signals.iter().position(|s| s.len() != timestamps.len()) {
            return Err(SignalError::EpochMismatch(format!(
                "channel {} has {} samples, expected {}",
                channel_names[bad],
                signals[bad].len(),
                timestamps.len()
            )));
        }
        Ok(Self::from_parts(channel_names, sample_rate, signals, timestamps))
    }

    pub(crate) fn from_parts(
        channel_names: Vec<String>,
        sample_rate: u32,
        signals: Vec<Vec<f64>>,
        timestamps: Vec<f64>,
    ) -> Self {
        Self {
            channel_names,
            sample_rate,
            signals,
            timestamps,
        }
    }

    /// Number of samples per channel.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the epoch holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Epoch with a single channel holding the mean of `selection` (all
    /// channels when empty).
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::UnknownChannel`] for an unknown name.
    pub fn average_channels(&self, selection: &[&str]) -> SignalResult<Self> {
        let (name, signal) = merge_channels(self, selection)?;
        Ok(Self::from_parts(vec![name], self.sample_rate, vec![signal], self.timestamps.clone()))
    }

    /// Epoch with one averaged channel per group. An empty group list
    /// averages all channels into one.
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
        Ok(Self::from_parts(names, self.sample_rate, signals, self.timestamps.clone()))
    }

    /// Per-channel signal-to-noise ratio.
    ///
    /// Peak amplitude inside `window_ms` (start/stop located at the nearest
    /// timestamps, stop exclusive) divided by the standard deviation of the
    /// whole channel. With `use_absolutes` the peak of `|x|` is used, for
    /// negative-going components.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::InvalidWindow`] if the window selects no
    /// samples.
    pub fn snr(&self, window_ms: (f64, f64), use_absolutes: bool) -> SignalResult<BTreeMap<String, f64>> {
        let invalid = || SignalError::InvalidWindow {
            start_ms: window_ms.0,
            end_ms: window_ms.1,
        };
        let start = nearest_index(&self.timestamps, window_ms.0 / 1000.0).ok_or_else(invalid)?;
        let stop = nearest_index(&self.timestamps, window_ms.1 / 1000.0).ok_or_else(invalid)?;
        if start >= stop {
            return Err(invalid());
        }

        Ok(self
            .channel_names
            .iter()
            .zip(&self.signals)
            .map(|(name, signal)| {
                let peak = signal[start..stop]
                    .iter()
                    .map(|&v| if use_absolutes { v.abs() } else { v })
                    .fold(f64::NEG_INFINITY, f64::max);
                (name.clone(), peak / std_dev(signal))
            })
            .collect())
    }

    /// Mean SNR over `channels` (all channels when empty).
    ///
    /// # Errors
    ///
    /// Propagates [`EventEpoch::snr`] errors and returns
    /// [`SignalError::UnknownChannel`] for an unknown name.
    pub fn avg_snr(&self, channels: &[&str], window_ms: (f64, f64), use_absolutes: bool) -> SignalResult<f64> {
        let snr = self.snr(window_ms, use_absolutes)?;
        if channels.is_empty() {
            let values: Vec<f64> = snr.values().copied().collect();
            return Ok(mean(&values));
        }

        let values = channels
            .iter()
            .map(|c| {
                snr.get(*c)
                    .copied()
                    .ok_or_else(|| SignalError::UnknownChannel((*c).to_string()))
            })
            .collect::<SignalResult<Vec<_>>>()?;
        Ok(mean(&values))
    }

    /// Whether any of `channels` (all when empty) exceeds
    /// [`BLINK_THRESHOLD`] in absolute amplitude.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::UnknownChannel`] for an unknown name.
    pub fn contains_blink(&self, channels: &[&str]) -> SignalResult<bool> {
        let exceeds = |signal: &[f64]| signal.iter().any(|v| v.abs() > BLINK_THRESHOLD);

        if channels.is_empty() {
            return Ok(self.signals.iter().any(|s| exceeds(s.as_slice())));
        }
        for name in channels {
            let signal = self
                .channel(name)
                .ok_or_else(|| SignalError::UnknownChannel((*name).to_string()))?;
            if exceeds(signal) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Elementwise sum of two epochs, matched by channel name.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::EpochMismatch`] if channel sets, lengths or
    /// sample rates differ.
    pub fn try_add(&self, other: &Self) -> SignalResult<Self> {
        if self.sample_rate != other.sample_rate {
            return Err(SignalError::EpochMismatch(format!(
                "sample rate {} vs {}",
                self.sample_rate, other.sample_rate
            )));
        }
        if self.len() != other.len() {
            return Err(SignalError::EpochMismatch(format!(
                "length {} vs {}",
                self.len(),
                other.len()
            )));
        }
        if self.channel_names.len() != other.channel_names.len() {
            return Err(SignalError::EpochMismatch("channel sets differ".into()));
        }

        let signals = self
            .channel_names
            .iter()
            .zip(&self.signals)
            .map(|(name, signal)| -> SignalResult<Vec<f64>> {
                let rhs = other
                    .channel(name)
                    .ok_or_else(|| SignalError::EpochMismatch(format!("missing channel {name}")))?;
                Ok(signal.iter().zip(rhs).map(|(a, b)| a + b).collect())
            })
            .collect::<SignalResult<Vec<Vec<f64>>>>()?;

        Ok(Self::from_parts(
            self.channel_names.clone(),
            self.sample_rate,
            signals,
            self.timestamps.clone(),
        ))
    }

    /// Epoch with every value multiplied by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        let signals = self
            .signals
            .iter()
            .map(|s| s.iter().map(|v| v * factor).collect())
            .collect();
        Self::from_parts(self.channel_names.clone(), self.sample_rate, signals, self.timestamps.clone())
    }

    /// Elementwise mean of equally shaped epochs. Timestamps are taken from
    /// the first epoch.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::EmptyEpochSet`] for an empty slice and
    /// [`SignalError::EpochMismatch`] for incompatible epochs.
    pub fn average(epochs: &[Self]) -> SignalResult<Self> {
        let (first, rest) = epochs.split_first().ok_or(SignalError::EmptyEpochSet)?;
        let sum = rest.iter().try_fold(first.clone(), |acc, e| acc.try_add(e))?;
        Ok(sum.scale(1.0 / epochs.len() as f64))
    }
}

impl SignalBlock for EventEpoch {
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
