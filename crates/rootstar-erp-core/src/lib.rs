//! Rootstar ERP Core - signal model and scoring primitives
//!
//! This crate provides the data model for event-related potential (ERP)
//! biometrics: streaming signal containers, stimulus-locked epochs, feature
//! templates, similarity metrics and the evaluation rates used to tune
//! acceptance thresholds.
//!
//! # Modules
//!
//! - [`types`]: Samples, templates and stimulus events
//! - [`container`]: Streaming multi-channel [`SignalContainer`]
//! - [`epoch`]: Stimulus-locked [`EventEpoch`] windows
//! - [`math`]: Statistics shared by containers and epochs
//! - [`similarity`]: Template similarity metrics
//! - [`metrics`]: TPR/FPR/FNR/TNR, ROC, AUC and EER
//! - [`error`]: Error types for signal handling
//!
//! # Example
//!
//! ```rust
//! use rootstar_erp_core::{Sample, SignalContainer};
//!
//! let mut container = SignalContainer::new(vec!["TP9".into(), "TP10".into()], 256);
//! for i in 0..512 {
//!     let t = f64::from(i) / 256.0;
//!     container.add_sample(&Sample::new(t, vec![1.0, 2.0])).unwrap();
//! }
//!
//! let epoch = container.extract_epoch(0.5, 100, 500).unwrap();
//! assert_eq!(epoch.len(), 25 + 129);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod container;
pub mod epoch;
pub mod error;
pub mod math;
pub mod metrics;
pub mod similarity;
pub mod types;

// Re-export commonly used types at crate root
pub use container::{SignalBlock, SignalContainer};
pub use epoch::EventEpoch;
pub use error::{SignalError, SignalResult};
pub use similarity::SimilarityMetric;
pub use types::{Sample, StimulusEvent, Template};
