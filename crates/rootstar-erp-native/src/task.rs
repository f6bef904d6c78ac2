//! Stimulus task capability.
//!
//! An acquisition task presents stimuli (typically an oddball paradigm) while
//! the device records. The engine polls [`AcquisitionTask::is_alive`] and
//! [`AcquisitionTask::aborted`] and, once acquisition ends, drains the
//! stimulus timings to locate epochs.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use rootstar_erp_core::StimulusEvent;

/// Static description of a task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescription {
    /// Human readable task name
    pub name: String,
    /// Reference stimulus asset shown to the subject, if any
    pub reference_stimulus: Option<PathBuf>,
}

impl TaskDescription {
    /// Create a description without a reference stimulus.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference_stimulus: None,
        }
    }

    /// Attach a reference stimulus asset.
    #[must_use]
    pub fn with_reference_stimulus(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_stimulus = Some(path.into());
        self
    }
}

/// Capability interface of a stimulus presentation task.
pub trait AcquisitionTask {
    /// Begin presenting stimuli.
    fn start(&mut self);

    /// Stop presenting stimuli.
    fn stop(&mut self);

    /// Whether the task is still presenting.
    fn is_alive(&self) -> bool;

    /// Whether the subject or operator aborted the task.
    fn aborted(&self) -> bool;

    /// Whether stimulus timings are waiting.
    fn has_data(&self) -> bool;

    /// Take the oldest stimulus timing.
    fn fetch_data(&mut self) -> Option<StimulusEvent>;

    /// Static description of the task.
    fn description(&self) -> &TaskDescription;
}

#[derive(Debug, Default)]
struct TaskState {
    aborted: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

/// Shared view of a [`ScriptedTask`].
#[derive(Clone, Debug, Default)]
pub struct TaskHandle {
    state: Arc<TaskState>,
}

impl TaskHandle {
    /// Abort the running task.
    pub fn abort(&self) {
        self.state.aborted.store(true, Ordering::SeqCst);
    }

    /// Number of `start` calls so far.
    pub fn starts(&self) -> usize {
        self.state.starts.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls so far.
    pub fn stops(&self) -> usize {
        self.state.stops.load(Ordering::SeqCst)
    }
}

/// Task that emits pre-scripted stimulus timings.
///
/// Each `start` queues the next scripted session and keeps the task alive for
/// the configured duration. Sessions cycle like [`crate::ReplayDevice`]
/// sessions do, so a device and a task built from the same recordings stay
/// paired.
#[derive(Debug)]
pub struct ScriptedTask {
    description: TaskDescription,
    sessions: Vec<Vec<StimulusEvent>>,
    next_session: usize,
    queue: VecDeque<StimulusEvent>,
    duration: Duration,
    abort_after: Option<Duration>,
    started_at: Option<Instant>,
    handle: TaskHandle,
}

impl ScriptedTask {
    /// Create a task that stays alive for `duration` after each start.
    #[must_use]
    pub fn new(description: TaskDescription, duration: Duration) -> Self {
        Self {
            description,
            sessions: Vec::new(),
            next_session: 0,
            queue: VecDeque::new(),
            duration,
            abort_after: None,
            started_at: None,
            handle: TaskHandle::default(),
        }
    }

    /// Append a scripted session.
    #[must_use]
    pub fn with_session(mut self, stimuli: Vec<StimulusEvent>) -> Self {
        self.sessions.push(stimuli);
        self
    }

    /// Report an abort once `after` has elapsed since start.
    #[must_use]
    pub fn with_abort_after(mut self, after: Duration) -> Self {
        self.abort_after = Some(after);
        self
    }

    /// Shared handle for observing and steering this task.
    #[must_use]
    pub fn handle(&self) -> TaskHandle {
        self.handle.clone()
    }

    fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

impl AcquisitionTask for ScriptedTask {
    fn start(&mut self) {
        self.handle.state.starts.fetch_add(1, Ordering::SeqCst);
        self.handle.state.aborted.store(false, Ordering::SeqCst);

        self.queue.clear();
        if !self.sessions.is_empty() {
            let session = &self.sessions[self.next_session % self.sessions.len()];
            self.queue.extend(session.iter().copied());
            self.next_session += 1;
        }
        self.started_at = Some(Instant::now());
        tracing::debug!("Task '{}' started with {} stimuli", self.description.name, self.queue.len());
    }

    fn stop(&mut self) {
        self.handle.state.stops.fetch_add(1, Ordering::SeqCst);
        self.started_at = None;
    }

    fn is_alive(&self) -> bool {
        self.elapsed().is_some_and(|e| e < self.duration)
    }

    fn aborted(&self) -> bool {
        if self.handle.state.aborted.load(Ordering::SeqCst) {
            return true;
        }
        match (self.abort_after, self.elapsed()) {
            (Some(after), Some(elapsed)) => elapsed >= after,
            _ => false,
        }
    }

    fn has_data(&self) -> bool {
        !self.queue.is_empty()
    }

    fn fetch_data(&mut self) -> Option<StimulusEvent> {
        self.queue.pop_front()
    }

    fn description(&self) -> &TaskDescription {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut task = ScriptedTask::new(TaskDescription::new("oddball"), Duration::from_millis(20))
            .with_session(vec![StimulusEvent::target(0.5), StimulusEvent::distractor(0.8)]);
        assert!(!task.is_alive());

        task.start();
        assert!(task.is_alive());
        assert!(task.has_data());
        assert_eq!(task.fetch_data(), Some(StimulusEvent::target(0.5)));
        assert_eq!(task.fetch_data(), Some(StimulusEvent::distractor(0.8)));
        assert!(!task.has_data());

        std::thread::sleep(Duration::from_millis(30));
        assert!(!task.is_alive());
        task.stop();
        assert_eq!(task.handle().starts(), 1);
        assert_eq!(task.handle().stops(), 1);
    }

    #[test]
    fn test_abort_via_handle() {
        let mut task = ScriptedTask::new(TaskDescription::new("oddball"), Duration::from_secs(5));
        let handle = task.handle();
        task.start();
        assert!(!task.aborted());
        handle.abort();
        assert!(task.aborted());

        // restarting clears the flag
        task.start();
        assert!(!task.aborted());
    }

    #[test]
    fn test_abort_after_elapsed() {
        let mut task = ScriptedTask::new(TaskDescription::new("oddball"), Duration::from_secs(5))
            .with_abort_after(Duration::ZERO);
        assert!(!task.aborted());
        task.start();
        assert!(task.aborted());
    }

    #[test]
    fn test_description() {
        let task = ScriptedTask::new(
            TaskDescription::new("faces").with_reference_stimulus("assets/face.png"),
            Duration::ZERO,
        );
        assert_eq!(task.description().name, "faces");
        assert_eq!(
            task.description().reference_stimulus.as_deref(),
            Some(std::path::Path::new("assets/face.png"))
        );
    }
}
