//! ERP authentication engine.
//!
//! The [`AuthenticationEngine`] owns one device, one stimulus task, the
//! processing strategies and the template database, and runs:
//!
//! - **Enrollment**: acquire epochs, build templates, store them
//! - **Authentication**: verify a claimed identity against its templates
//! - **Identification**: find the best matching enrolled identity
//!
//! # Continuous authentication
//!
//! A successful enrollment or authentication is remembered in the engine's
//! [`Session`]. While the device stays worn, a continuous authentication for
//! the same identity is accepted without a new acquisition. Taking the
//! device off moves its removal time stamp past the session, which ends the
//! fast path.
//!
//! # Failures
//!
//! [`enroll`](AuthenticationEngine::enroll),
//! [`authenticate`](AuthenticationEngine::authenticate) and
//! [`identification`](AuthenticationEngine::identification) never return
//! errors: rejections are logged and kept as
//! [`last_failure`](AuthenticationEngine::last_failure). The `try_*`
//! variants return the [`AuthError`] directly.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut engine = AuthenticationEngine::new(
//!     device,
//!     task,
//!     PreprocessingPipeline::new(),
//!     FlattenExtractor::new(),
//!     bounded_cosine_similarity,
//!     TemplateDatabase::load("templates.json")?,
//!     EngineConfig::default(),
//! );
//!
//! if engine.authenticate("alice", &AuthOptions::default().continuous()) {
//!     unlock();
//! }
//! ```

mod acquisition;
mod error;
mod session;
mod templating;

use std::time::Duration;

use rootstar_erp_core::{EventEpoch, SimilarityMetric, Template};

use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, SimilarityMode, TemplateMode};
use crate::database::TemplateDatabase;
use crate::device::DeviceAdapter;
use crate::extractor::FeatureExtractor;
use crate::logging::EventLogger;
use crate::preprocessing::PreprocessingPipeline;
use crate::task::AcquisitionTask;

pub use error::{AuthError, AuthResult};
pub use session::Session;

use templating::{aggregate_similarity, build_templates};

// ============================================================================
// Call Options and Outcomes
// ============================================================================

/// Per-call overrides for authentication and identification.
///
/// Unset values fall back to the engine's [`EngineConfig`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthOptions {
    /// Accept a still-worn device for the last authenticated identity
    pub continuous: bool,
    /// Acquisition time
    pub timeout: Option<Duration>,
    /// Acceptance threshold
    pub threshold: Option<f64>,
    /// Template construction
    pub template_mode: Option<TemplateMode>,
    /// Similarity reduction
    pub similarity_mode: Option<SimilarityMode>,
}

impl AuthOptions {
    /// Enable continuous authentication.
    #[must_use]
    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    /// Override the acquisition time.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the acceptance threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Override the template mode.
    #[must_use]
    pub fn with_template_mode(mut self, mode: TemplateMode) -> Self {
        self.template_mode = Some(mode);
        self
    }

    /// Override the similarity mode.
    #[must_use]
    pub fn with_similarity_mode(mut self, mode: SimilarityMode) -> Self {
        self.similarity_mode = Some(mode);
        self
    }
}

/// How an authentication was accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    /// Accepted from the session without acquisition
    Continuous,
    /// Accepted after acquisition and scoring
    Verified {
        /// Aggregated similarity
        similarity: f64,
    },
}

/// Accepted identification.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityMatch {
    /// Best matching identity
    pub identity: String,
    /// Its aggregated similarity
    pub similarity: f64,
}

// ============================================================================
// Engine
// ============================================================================

/// Enrollment and authentication over one device and task.
pub struct AuthenticationEngine {
    device: Box<dyn DeviceAdapter>,
    task: Box<dyn AcquisitionTask>,
    preprocessing: PreprocessingPipeline,
    extractor: Box<dyn FeatureExtractor>,
    metric: Box<dyn SimilarityMetric>,
    database: TemplateDatabase,
    config: EngineConfig,
    session: Session,
    logger: EventLogger,
    clock: Box<dyn Clock>,
    last_failure: Option<AuthError>,
}

impl AuthenticationEngine {
    /// Create an engine using the system clock.
    #[must_use]
    pub fn new(
        device: impl DeviceAdapter + 'static,
        task: impl AcquisitionTask + 'static,
        preprocessing: PreprocessingPipeline,
        extractor: impl FeatureExtractor + 'static,
        metric: impl SimilarityMetric + 'static,
        database: TemplateDatabase,
        config: EngineConfig,
    ) -> Self {
        let logger = EventLogger::new(config.event_logging, config.file_logging, config.log_dir.clone());
        Self {
            device: Box::new(device),
            task: Box::new(task),
            preprocessing,
            extractor: Box::new(extractor),
            metric: Box::new(metric),
            database,
            config,
            session: Session::default(),
            logger,
            clock: Box::new(SystemClock),
            last_failure: None,
        }
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // ========================================================================
    // Enrollment
    // ========================================================================

    /// Enroll `identity` from a fresh acquisition.
    ///
    /// `timeout` and `mode` default to the engine configuration. Returns
    /// whether templates were stored.
    pub fn enroll(&mut self, identity: &str, timeout: Option<Duration>, mode: Option<TemplateMode>) -> bool {
        let result = self.try_enroll(identity, timeout, mode);
        self.settle("Enrollment", identity, result).is_some()
    }

    /// Enroll `identity`, returning the number of templates stored.
    ///
    /// The session counts the enrollment as a fresh authentication.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DeviceUnavailable`] without touching the device
    /// when it is disconnected, or the acquisition failure.
    pub fn try_enroll(
        &mut self,
        identity: &str,
        timeout: Option<Duration>,
        mode: Option<TemplateMode>,
    ) -> AuthResult<usize> {
        self.logger.log_database(&self.database);
        if !self.device.is_connected() {
            return Err(AuthError::DeviceUnavailable);
        }
        let timeout = timeout.unwrap_or_else(|| self.config.enroll_timeout());
        let mode = mode.unwrap_or(self.config.template_mode);

        self.logger.log_info(&format!("Enrolling '{identity}'"));
        let epochs = self.acquire(timeout)?;
        let templates = self.fresh_templates(epochs, mode)?;
        let count = templates.len();
        for template in templates {
            self.database.add_template(identity, template);
        }

        let now = self.clock.now();
        self.session.record_success(identity, now);
        self.logger.log_info(&format!("Enrolled '{identity}' with {count} templates"));
        self.logger.log_database(&self.database);
        Ok(count)
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Verify that the wearer is `identity`.
    pub fn authenticate(&mut self, identity: &str, options: &AuthOptions) -> bool {
        let result = self.try_authenticate(identity, options);
        self.settle("Authentication", identity, result).is_some()
    }

    /// Verify that the wearer is `identity`, reporting how.
    ///
    /// A failed acquisition invalidates the session; a rejected score does
    /// not.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DeviceUnavailable`] or
    /// [`AuthError::UnknownIdentity`] before any device or task
    /// interaction, otherwise the acquisition or scoring failure.
    pub fn try_authenticate(&mut self, identity: &str, options: &AuthOptions) -> AuthResult<Verdict> {
        self.logger.log_database(&self.database);
        if !self.device.is_connected() {
            return Err(AuthError::DeviceUnavailable);
        }
        if !self.database.contains(identity) {
            return Err(AuthError::UnknownIdentity(identity.to_string()));
        }

        let timeout = options.timeout.unwrap_or_else(|| self.config.auth_timeout());
        let threshold = options.threshold.unwrap_or(self.config.threshold);
        let template_mode = options.template_mode.unwrap_or(self.config.template_mode);
        let similarity_mode = options.similarity_mode.unwrap_or(self.config.similarity_mode);

        if options.continuous && self.session.last_auth_time() > self.device.removal_time_stamp() {
            if !self.device.is_worn() {
                let now = self.clock.now();
                self.device.set_removal_time_stamp(now);
                return Err(AuthError::DeviceRemoved);
            }
            if self.session.vouches_for(identity) {
                self.logger.log_info(&format!("Continuous authentication of '{identity}'"));
                return Ok(Verdict::Continuous);
            }
        }

        self.logger.log_info(&format!("Authenticating '{identity}'"));
        let epochs = match self.acquire(timeout) {
            Ok(epochs) => epochs,
            Err(e) => {
                self.session.invalidate();
                return Err(e);
            }
        };
        let templates = self.fresh_templates(epochs, template_mode)?;

        let scores = self.score(&[identity], &templates, similarity_mode);
        let [(_, score)] = scores.as_slice() else {
            return Err(AuthError::AmbiguousSimilarityResult { count: scores.len() });
        };
        let similarity = score.ok_or(AuthError::UndefinedSimilarity)?;
        if similarity < threshold {
            return Err(AuthError::BelowThreshold { similarity, threshold });
        }

        let now = self.clock.now();
        self.session.record_success(identity, now);
        self.logger
            .log_info(&format!("Authenticated '{identity}' with similarity {similarity:.4}"));
        Ok(Verdict::Verified { similarity })
    }

    // ========================================================================
    // Identification
    // ========================================================================

    /// Find the enrolled identity of the wearer.
    ///
    /// Only `timeout`, `threshold` and the modes of `options` apply.
    pub fn identification(&mut self, options: &AuthOptions) -> Option<String> {
        let result = self.try_identify(options);
        self.settle("Identification", "", result).map(|m| m.identity)
    }

    /// Find the enrolled identity of the wearer, with its similarity.
    ///
    /// Identities whose similarity is undefined are left out of the ranking.
    /// Failures leave the session untouched; success records the identity
    /// like an authentication.
    ///
    /// A successful identification therefore also opens the continuous
    /// authentication fast path for the identified wearer.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DeviceUnavailable`] or
    /// [`AuthError::NoEnrolledIdentities`] before any device or task
    /// interaction, otherwise the acquisition or scoring failure.
    pub fn try_identify(&mut self, options: &AuthOptions) -> AuthResult<IdentityMatch> {
        self.logger.log_database(&self.database);
        if !self.device.is_connected() {
            return Err(AuthError::DeviceUnavailable);
        }
        if self.database.is_empty() {
            return Err(AuthError::NoEnrolledIdentities);
        }

        let timeout = options.timeout.unwrap_or_else(|| self.config.auth_timeout());
        let threshold = options.threshold.unwrap_or(self.config.threshold);
        let template_mode = options.template_mode.unwrap_or(self.config.template_mode);
        let similarity_mode = options.similarity_mode.unwrap_or(self.config.similarity_mode);

        self.logger.log_info("Identifying wearer");
        let epochs = self.acquire(timeout)?;
        let templates = self.fresh_templates(epochs, template_mode)?;

        let identities = self.database.list_identities();
        let candidates: Vec<&str> = identities.iter().map(String::as_str).collect();
        let mut ranking: Vec<(String, f64)> = self
            .score(&candidates, &templates, similarity_mode)
            .into_iter()
            .filter_map(|(identity, score)| score.map(|s| (identity, s)))
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));

        let Some((identity, similarity)) = ranking.into_iter().next() else {
            return Err(AuthError::UndefinedSimilarity);
        };
        if similarity < threshold {
            return Err(AuthError::BelowThreshold { similarity, threshold });
        }

        let now = self.clock.now();
        self.session.record_success(&identity, now);
        self.logger
            .log_info(&format!("Identified '{identity}' with similarity {similarity:.4}"));
        Ok(IdentityMatch { identity, similarity })
    }

    // ========================================================================
    // Session and Store
    // ========================================================================

    /// Forget the last authentication.
    pub fn reset_session(&mut self) {
        self.session.reset();
    }

    /// Swap in another template store, returning the previous one. The
    /// session is reset.
    pub fn replace_database(&mut self, database: TemplateDatabase) -> TemplateDatabase {
        self.session.reset();
        std::mem::replace(&mut self.database, database)
    }

    /// Template store.
    #[must_use]
    pub fn database(&self) -> &TemplateDatabase {
        &self.database
    }

    /// Mutable template store, e.g. to remove identities.
    pub fn database_mut(&mut self) -> &mut TemplateDatabase {
        &mut self.database
    }

    /// Continuous-authentication state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Engine defaults.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reason of the most recent rejection, cleared by the next success.
    #[must_use]
    pub fn last_failure(&self) -> Option<&AuthError> {
        self.last_failure.as_ref()
    }

    /// Toggle event and file logging.
    pub fn configure_logging(&mut self, event_logging: bool, file_logging: bool) {
        self.config.event_logging = event_logging;
        self.config.file_logging = file_logging;
        self.logger.configure(event_logging, file_logging);
    }

    /// Release the device.
    pub fn disconnect(&mut self) {
        self.device.disconnect();
        self.logger.log_info("Device disconnected");
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn fresh_templates(&mut self, mut epochs: Vec<EventEpoch>, mode: TemplateMode) -> AuthResult<Vec<Template>> {
        for epoch in &mut epochs {
            self.preprocessing.apply(epoch);
        }
        build_templates(&epochs, self.extractor.as_mut(), mode)
    }

    fn score(&self, identities: &[&str], fresh: &[Template], mode: SimilarityMode) -> Vec<(String, Option<f64>)> {
        identities
            .iter()
            .filter_map(|&identity| {
                let stored = self.database.get_templates(identity)?;
                Some((identity.to_string(), aggregate_similarity(stored, fresh, self.metric.as_ref(), mode)))
            })
            .collect()
    }

    fn settle<T>(&mut self, operation: &str, identity: &str, result: AuthResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_failure = None;
                Some(value)
            }
            Err(e) => {
                if identity.is_empty() {
                    self.logger.log_fail(&format!("{operation} failed: {e}"));
                } else {
                    self.logger.log_fail(&format!("{operation} of '{identity}' failed: {e}"));
                }
                self.last_failure = Some(e);
                None
            }
        }
    }
}

impl std::fmt::Debug for AuthenticationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationEngine")
            .field("identities", &self.database.len())
            .field("config", &self.config)
            .field("session", &self.session)
            .field("last_failure", &self.last_failure)
            .finish_non_exhaustive()
    }
}
