//! Engine event log.
//!
//! Event logging forwards engine messages to `tracing`. File logging
//! additionally snapshots the template database (JSON) and every acquired
//! recording (CSV) into a log directory, one file per snapshot named
//! `<kind>_<unix ms>_<sequence>.<ext>`. Snapshot failures are reported as
//! warnings and never abort the operation being logged.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rootstar_erp_core::SignalContainer;

use crate::database::TemplateDatabase;
use crate::recording::save_recording;

/// Sink for engine events and snapshots.
#[derive(Clone, Debug)]
pub struct EventLogger {
    event_logging: bool,
    file_logging: bool,
    log_dir: PathBuf,
    sequence: u64,
}

impl EventLogger {
    /// Create a logger writing snapshots to `log_dir`.
    #[must_use]
    pub fn new(event_logging: bool, file_logging: bool, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            event_logging,
            file_logging,
            log_dir: log_dir.into(),
            sequence: 0,
        }
    }

    /// Toggle event and file logging.
    pub fn configure(&mut self, event_logging: bool, file_logging: bool) {
        self.event_logging = event_logging;
        self.file_logging = file_logging;
    }

    /// Whether event logging is on.
    #[must_use]
    pub fn event_logging(&self) -> bool {
        self.event_logging
    }

    /// Whether file logging is on.
    #[must_use]
    pub fn file_logging(&self) -> bool {
        self.file_logging
    }

    /// Snapshot directory.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Log an informational event.
    pub fn log_info(&self, message: &str) {
        if self.event_logging {
            tracing::info!("{}", message);
        }
    }

    /// Log a rejected or failed operation.
    pub fn log_fail(&self, message: &str) {
        if self.event_logging {
            tracing::warn!("{}", message);
        }
    }

    /// Snapshot the template database. Returns the written path.
    pub fn log_database(&mut self, database: &TemplateDatabase) -> Option<PathBuf> {
        let path = self.snapshot_path("database", "json")?;
        match database.save(&path) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Failed to write database snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Snapshot an acquired recording. Returns the written path.
    pub fn log_recording(&mut self, container: &SignalContainer) -> Option<PathBuf> {
        let path = self.snapshot_path("recording", "csv")?;
        match save_recording(container, &path) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!("Failed to write recording snapshot {}: {}", path.display(), e);
                None
            }
        }
    }

    fn snapshot_path(&mut self, kind: &str, extension: &str) -> Option<PathBuf> {
        if !self.file_logging {
            return None;
        }
        if let Err(e) = fs::create_dir_all(&self.log_dir) {
            tracing::warn!("Failed to create log directory {}: {}", self.log_dir.display(), e);
            return None;
        }

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let sequence = self.sequence;
        self.sequence += 1;
        Some(self.log_dir.join(format!("{kind}_{millis}_{sequence}.{extension}")))
    }
}

impl Default for EventLogger {
    fn default() -> Self {
        Self::new(true, false, "logs")
    }
}
