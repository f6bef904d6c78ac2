//! Rootstar ERP Native - host-side authentication engine
//!
//! This crate turns the signal model of `rootstar-erp-core` into an
//! identity verification system:
//! - Capability traits for acquisition devices, stimulus tasks,
//!   preprocessing and feature extraction
//! - A persistent [`TemplateDatabase`] of enrolled identities
//! - The [`AuthenticationEngine`] driving acquisition, templating,
//!   similarity scoring and continuous authentication
//! - CSV recordings, spectral analysis and event logging
//!
//! # Modules
//!
//! - [`device`]: Acquisition device capability and a replay implementation
//! - [`task`]: Stimulus task capability and a scripted implementation
//! - [`preprocessing`]: In-place filter chains
//! - [`extractor`]: Feature extraction capability
//! - [`database`]: Template store with JSON persistence
//! - [`engine`]: Enrollment, authentication and identification
//! - [`recording`]: CSV import/export of signal containers
//! - [`spectrum`]: FFT amplitude spectra
//! - [`logging`]: Event and file logging sink
//! - [`config`]: Engine configuration
//! - [`clock`]: Wall-clock abstraction

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod clock;
pub mod config;
pub mod database;
pub mod device;
pub mod engine;
pub mod extractor;
pub mod logging;
pub mod preprocessing;
pub mod recording;
pub mod spectrum;
pub mod task;

// Re-export key types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, EngineConfig, SimilarityMode, TemplateMode};
pub use database::{DatabaseError, TemplateDatabase};
pub use device::{DeviceAdapter, DeviceError, ReplayDevice, ReplayHandle};
pub use engine::{AuthError, AuthOptions, AuthResult, AuthenticationEngine, IdentityMatch, Session, Verdict};
pub use extractor::{FeatureExtractor, FlattenExtractor};
pub use logging::EventLogger;
pub use preprocessing::{Filter, PreprocessingPipeline};
pub use recording::{load_recording, save_recording, RecordingError};
pub use spectrum::{PowerSpectrum, SpectralAnalyzer};
pub use task::{AcquisitionTask, ScriptedTask, TaskDescription, TaskHandle};
