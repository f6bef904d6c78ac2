//! Acquisition device capability.
//!
//! The engine talks to EEG hardware only through [`DeviceAdapter`]. Every
//! query (`has_data`, `is_worn`, `is_connected`) must be cheap and
//! non-blocking: the acquisition loop polls them on every iteration so it
//! can react promptly to a removed headset. Drivers that stream on their own
//! threads buffer samples internally and hand them out via `fetch_data`.
//!
//! [`ReplayDevice`] plays recorded sessions back through the same interface
//! and is used for offline verification runs and tests.
//!
//! # Example
//!
//! ```rust
//! use rootstar_erp_core::Sample;
//! use rootstar_erp_native::device::{DeviceAdapter, ReplayDevice};
//!
//! let samples = (0..4).map(|i| Sample::new(f64::from(i) / 256.0, vec![0.0, 1.0])).collect();
//! let mut device = ReplayDevice::new(vec!["TP9".into(), "TP10".into()], 256).with_session(samples);
//! let handle = device.handle();
//!
//! device.start_stream().unwrap();
//! let mut fetched = 0;
//! while device.has_data() {
//!     device.fetch_data();
//!     fetched += 1;
//! }
//! assert_eq!(fetched, 4);
//! assert_eq!(handle.stream_starts(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use rootstar_erp_core::{Sample, SignalBlock, SignalContainer};

/// Errors reported by acquisition devices.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Device is not connected
    #[error("Device is not connected")]
    NotConnected,

    /// Stream could not be started
    #[error("Failed to start stream: {0}")]
    StreamFailed(String),
}

/// Capability interface of an EEG acquisition device.
pub trait DeviceAdapter {
    /// Channel names, in the order samples carry their values.
    fn channel_names(&self) -> &[String];

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Whether the device link is up.
    fn is_connected(&self) -> bool;

    /// Whether the device is currently worn.
    fn is_worn(&self) -> bool;

    /// Time (seconds) of the most recently detected removal, `0.0` if never.
    fn removal_time_stamp(&self) -> f64;

    /// Record a detected removal.
    fn set_removal_time_stamp(&mut self, timestamp: f64);

    /// Begin buffering samples.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] if the stream cannot be opened.
    fn start_stream(&mut self) -> Result<(), DeviceError>;

    /// Stop buffering samples. Calling it on a stopped stream is a no-op.
    fn stop_stream(&mut self);

    /// Whether buffered samples are waiting.
    fn has_data(&self) -> bool;

    /// Take the oldest buffered sample.
    fn fetch_data(&mut self) -> Option<Sample>;

    /// Release the device.
    fn disconnect(&mut self);
}

#[derive(Debug)]
struct ReplayState {
    connected: AtomicBool,
    worn: AtomicBool,
    removal_time_stamp: AtomicU64,
    stream_starts: AtomicUsize,
    stream_stops: AtomicUsize,
    samples_fetched: AtomicUsize,
}

impl Default for ReplayState {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(true),
            worn: AtomicBool::new(true),
            removal_time_stamp: AtomicU64::new(0.0_f64.to_bits()),
            stream_starts: AtomicUsize::new(0),
            stream_stops: AtomicUsize::new(0),
            samples_fetched: AtomicUsize::new(0),
        }
    }
}

/// Shared view of a [`ReplayDevice`] that stays usable after the device is
/// handed to an engine.
///
/// Lets callers flip the connection and wear state and observe stream
/// activity.
#[derive(Clone, Debug, Default)]
pub struct ReplayHandle {
    state: Arc<ReplayState>,
}

impl ReplayHandle {
    /// Simulate plugging or unplugging the device.
    pub fn set_connected(&self, connected: bool) {
        self.state.connected.store(connected, Ordering::SeqCst);
    }

    /// Simulate putting on or taking off the headset.
    pub fn set_worn(&self, worn: bool) {
        self.state.worn.store(worn, Ordering::SeqCst);
    }

    /// Report a removal detected at `timestamp`, as a wear sensor would.
    pub fn set_removal_time_stamp(&self, timestamp: f64) {
        self.state.removal_time_stamp.store(timestamp.to_bits(), Ordering::SeqCst);
    }

    /// Number of `start_stream` calls so far.
    pub fn stream_starts(&self) -> usize {
        self.state.stream_starts.load(Ordering::SeqCst)
    }

    /// Number of `stop_stream` calls so far.
    pub fn stream_stops(&self) -> usize {
        self.state.stream_stops.load(Ordering::SeqCst)
    }

    /// Total samples handed out.
    pub fn samples_fetched(&self) -> usize {
        self.state.samples_fetched.load(Ordering::SeqCst)
    }
}

/// Device that replays pre-recorded sessions.
///
/// Each `start_stream` buffers the next session in turn, wrapping around
/// after the last one.
#[derive(Debug)]
pub struct ReplayDevice {
    channel_names: Vec<String>,
    sample_rate: u32,
    sessions: Vec<Vec<Sample>>,
    next_session: usize,
    buffer: VecDeque<Sample>,
    streaming: bool,
    remove_after: Option<usize>,
    fetched_in_stream: usize,
    handle: ReplayHandle,
}

impl ReplayDevice {
    /// Create a replay device without sessions.
    #[must_use]
    pub fn new(channel_names: Vec<String>, sample_rate: u32) -> Self {
        Self {
            channel_names,
            sample_rate,
            sessions: Vec::new(),
            next_session: 0,
            buffer: VecDeque::new(),
            streaming: false,
            remove_after: None,
            fetched_in_stream: 0,
            handle: ReplayHandle::default(),
        }
    }

    /// Create a replay device that plays back one recorded container.
    #[must_use]
    pub fn from_container(container: &SignalContainer) -> Self {
        let samples = (0..container.len())
            .map(|i| {
                let values = container.signals().iter().map(|s| s[i]).collect();
                Sample::new(container.timestamps()[i], values)
            })
            .collect();
        Self::new(container.channel_names().to_vec(), container.sample_rate()).with_session(samples)
    }

    /// Append a session to the playlist.
    #[must_use]
    pub fn with_session(mut self, samples: Vec<Sample>) -> Self {
        self.sessions.push(samples);
        self
    }

    /// Take the headset off after `samples` samples of every stream.
    #[must_use]
    pub fn with_removal_after(mut self, samples: usize) -> Self {
        self.remove_after = Some(samples);
        self
    }

    /// Shared handle for observing and steering this device.
    #[must_use]
    pub fn handle(&self) -> ReplayHandle {
        self.handle.clone()
    }
}

impl DeviceAdapter for ReplayDevice {
    fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_connected(&self) -> bool {
        self.handle.state.connected.load(Ordering::SeqCst)
    }

    fn is_worn(&self) -> bool {
        self.handle.state.worn.load(Ordering::SeqCst)
    }

    fn removal_time_stamp(&self) -> f64 {
        f64::from_bits(self.handle.state.removal_time_stamp.load(Ordering::SeqCst))
    }

    fn set_removal_time_stamp(&mut self, timestamp: f64) {
        self.handle.set_removal_time_stamp(timestamp);
    }

    fn start_stream(&mut self) -> Result<(), DeviceError> {
        if !self.is_connected() {
            return Err(DeviceError::NotConnected);
        }
        self.handle.state.stream_starts.fetch_add(1, Ordering::SeqCst);

        self.buffer.clear();
        if !self.sessions.is_empty() {
            let session = &self.sessions[self.next_session % self.sessions.len()];
            self.buffer.extend(session.iter().cloned());
            self.next_session += 1;
        }
        self.fetched_in_stream = 0;
        self.streaming = true;
        tracing::debug!("Replay stream started with {} buffered samples", self.buffer.len());
        Ok(())
    }

    fn stop_stream(&mut self) {
        if self.streaming {
            self.handle.state.stream_stops.fetch_add(1, Ordering::SeqCst);
        }
        self.streaming = false;
        self.buffer.clear();
    }

    fn has_data(&self) -> bool {
        self.streaming && !self.buffer.is_empty()
    }

    fn fetch_data(&mut self) -> Option<Sample> {
        if !self.streaming {
            return None;
        }
        let sample = self.buffer.pop_front()?;
        self.fetched_in_stream += 1;
        self.handle.state.samples_fetched.fetch_add(1, Ordering::SeqCst);

        if self.remove_after.is_some_and(|n| self.fetched_in_stream >= n) {
            self.handle.set_worn(false);
        }
        Some(sample)
    }

    fn disconnect(&mut self) {
        self.stop_stream();
        self.handle.set_connected(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(n: usize, offset: f64) -> Vec<Sample> {
        (0..n).map(|i| Sample::new(i as f64 / 100.0, vec![offset])).collect()
    }

    #[test]
    fn test_sessions_cycle_per_stream() {
        let mut device = ReplayDevice::new(vec!["Cz".into()], 100)
            .with_session(session(3, 1.0))
            .with_session(session(2, 2.0));

        device.start_stream().unwrap();
        assert_eq!(device.fetch_data().unwrap().values, vec![1.0]);
        device.stop_stream();
        assert!(!device.has_data());

        device.start_stream().unwrap();
        assert_eq!(device.fetch_data().unwrap().values, vec![2.0]);
        device.stop_stream();

        device.start_stream().unwrap();
        assert_eq!(device.fetch_data().unwrap().values, vec![1.0]);

        let handle = device.handle();
        assert_eq!(handle.stream_starts(), 3);
        assert_eq!(handle.stream_stops(), 2);
    }

    #[test]
    fn test_no_data_before_stream() {
        let mut device = ReplayDevice::new(vec!["Cz".into()], 100).with_session(session(3, 0.0));
        assert!(!device.has_data());
        assert!(device.fetch_data().is_none());
    }

    #[test]
    fn test_removal_after_samples() {
        let mut device = ReplayDevice::new(vec!["Cz".into()], 100)
            .with_session(session(5, 0.0))
            .with_removal_after(2);

        device.start_stream().unwrap();
        device.fetch_data();
        assert!(device.is_worn());
        device.fetch_data();
        assert!(!device.is_worn());
    }

    #[test]
    fn test_removal_time_stamp_shared_with_handle() {
        let mut device = ReplayDevice::new(vec!["Cz".into()], 100);
        let handle = device.handle();
        assert!(device.removal_time_stamp().abs() < f64::EPSILON);

        handle.set_removal_time_stamp(42.5);
        assert!((device.removal_time_stamp() - 42.5).abs() < f64::EPSILON);
        assert!(device.is_worn());

        device.set_removal_time_stamp(7.0);
        assert!((device.removal_time_stamp() - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disconnect_refuses_stream() {
        let mut device = ReplayDevice::new(vec!["Cz".into()], 100);
        device.disconnect();
        assert!(!device.is_connected());
        assert!(matches!(device.start_stream(), Err(DeviceError::NotConnected)));
    }

    #[test]
    fn test_from_container() {
        let mut container = SignalContainer::new(vec!["A".into(), "B".into()], 10);
        container.add_sample(&Sample::new(0.0, vec![1.0, 2.0])).unwrap();
        container.add_sample(&Sample::new(0.1, vec![3.0, 4.0])).unwrap();

        let mut device = ReplayDevice::from_container(&container);
        device.start_stream().unwrap();
        assert_eq!(device.fetch_data().unwrap(), Sample::new(0.0, vec![1.0, 2.0]));
        assert_eq!(device.fetch_data().unwrap(), Sample::new(0.1, vec![3.0, 4.0]));
        assert!(!device.has_data());
    }
}
