//! Acquisition procedure shared by enrollment, authentication and
//! identification.
//!
//! Streams device samples into a fresh container while the task presents
//! stimuli, then cuts one epoch per target stimulus.

use std::thread;
use std::time::{Duration, Instant};

use rootstar_erp_core::{EventEpoch, SignalContainer};

use super::error::{AuthError, AuthResult};
use super::AuthenticationEngine;

impl AuthenticationEngine {
    /// Run one acquisition and return equal-length target epochs.
    ///
    /// Polls until `timeout` elapses or the task finishes. Device stream and
    /// task are stopped on every exit path, the task only after its stimulus
    /// timings are drained.
    pub(super) fn acquire(&mut self, timeout: Duration) -> AuthResult<Vec<EventEpoch>> {
        let mut container =
            SignalContainer::new(self.device.channel_names().to_vec(), self.device.sample_rate());

        let started = self.clock.now();
        let deadline = Instant::now().checked_add(timeout);

        self.device.start_stream()?;
        self.task.start();
        tracing::debug!("Acquisition started for task '{}'", self.task.description().name);

        if let Err(e) = self.poll(&mut container, started, deadline) {
            self.stop_acquisition();
            return Err(e);
        }
        let loop_end = self.clock.now();

        // Drain stimulus timings before the task is stopped
        self.device.stop_stream();
        let mut stimuli = Vec::new();
        while self.task.has_data() {
            let Some(stimulus) = self.task.fetch_data() else {
                break;
            };
            if stimulus.is_target && stimulus.timestamp < loop_end {
                stimuli.push(stimulus.timestamp);
            }
        }
        if self.task.is_alive() {
            self.task.stop();
        }

        tracing::debug!(
            "Acquired {} samples and {} target stimuli",
            container.len(),
            stimuli.len()
        );
        if container.is_empty() || stimuli.is_empty() {
            return Err(AuthError::NoEpochs);
        }

        let before = self.config.before_event_ms;
        let after = self.config.after_event_ms;
        let mut epochs = stimuli
            .into_iter()
            .map(|t| container.extract_epoch(t, before, after))
            .collect::<Result<Vec<_>, _>>()?;

        self.logger.log_recording(&container);

        // Stimuli near the end of the recording yield truncated epochs
        let expected = epochs.first().map_or(0, EventEpoch::len);
        while epochs.last().is_some_and(|e| e.len() != expected) {
            epochs.pop();
        }
        if epochs.is_empty() || expected == 0 {
            return Err(AuthError::NoEpochs);
        }
        Ok(epochs)
    }

    fn poll(&mut self, container: &mut SignalContainer, started: f64, deadline: Option<Instant>) -> AuthResult<()> {
        let poll_interval = self.config.poll_interval();

        while !deadline.is_some_and(|d| Instant::now() >= d) && self.task.is_alive() {
            if self.device.removal_time_stamp() > started || !self.device.is_worn() {
                if !self.device.is_worn() {
                    let now = self.clock.now();
                    self.device.set_removal_time_stamp(now);
                }
                return Err(AuthError::DeviceRemoved);
            }
            if self.task.aborted() {
                return Err(AuthError::TaskAborted);
            }

            let mut drained = false;
            while self.device.has_data() {
                let Some(sample) = self.device.fetch_data() else {
                    break;
                };
                container.add_sample(&sample)?;
                drained = true;
            }
            if !drained && !poll_interval.is_zero() {
                thread::sleep(poll_interval);
            }
        }
        Ok(())
    }

    fn stop_acquisition(&mut self) {
        self.device.stop_stream();
        if self.task.is_alive() {
            self.task.stop();
        }
    }
}
