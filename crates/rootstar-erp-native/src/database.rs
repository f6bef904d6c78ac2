//! Template database of enrolled identities.
//!
//! Maps each identity to the templates recorded for it. The database lives
//! in memory; persistence is copy-in/copy-out through JSON, either as a
//! string or as a file.
//!
//! # Persisted format
//!
//! A JSON object keyed by identity, each value an array of templates, each
//! template an array of numbers:
//!
//! ```json
//! {"p1": [[1.0, 2.0, 3.0, 4.0, 5.0], [0.4, 0.5, 6.0, 6.0]], "p2": [[5.0, 6.0, 7.0, 8.0, 9.0]]}
//! ```
//!
//! # Example
//!
//! ```rust
//! use rootstar_erp_native::TemplateDatabase;
//!
//! let mut db = TemplateDatabase::new();
//! db.add_template("alice", vec![0.1, 0.2]);
//!
//! let restored = TemplateDatabase::from_json(&db.to_json().unwrap()).unwrap();
//! assert_eq!(restored, db);
//! ```

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use rootstar_erp_core::Template;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during database persistence.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Persisted data is not a valid template database
    #[error("Malformed persisted data: {0}")]
    MalformedPersistedData(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DatabaseError>;

// ============================================================================
// Database
// ============================================================================

/// In-memory store of identity templates.
///
/// Identities never map to an empty template list: an identity exists only
/// while it has at least one template.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplateDatabase {
    entries: BTreeMap<String, Vec<Template>>,
}

impl TemplateDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from an identity map. Identities with no templates
    /// are dropped.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, Vec<Template>>) -> Self {
        let entries = map.into_iter().filter(|(_, templates)| !templates.is_empty()).collect();
        Self { entries }
    }

    /// Append a template to an identity, creating the identity if needed.
    pub fn add_template(&mut self, identity: impl Into<String>, template: Template) {
        self.entries.entry(identity.into()).or_default().push(template);
    }

    /// Templates of an identity, `None` if it is not enrolled.
    #[must_use]
    pub fn get_templates(&self, identity: &str) -> Option<&[Template]> {
        self.entries.get(identity).map(Vec::as_slice)
    }

    /// Remove an identity and all its templates. Unknown identities are
    /// ignored.
    pub fn remove_identity(&mut self, identity: &str) {
        if self.entries.remove(identity).is_some() {
            tracing::debug!("Removed identity '{}'", identity);
        }
    }

    /// Enrolled identities, sorted.
    #[must_use]
    pub fn list_identities(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Whether an identity is enrolled.
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Number of enrolled identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no identity is enrolled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every identity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over identities and their templates, sorted by identity.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Template])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Serialize to the persisted JSON format.
    ///
    /// Non-finite template values are written as `null` and will be rejected
    /// when loaded back.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> DbResult<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Parse the persisted JSON format.
    ///
    /// Either the whole document is accepted or nothing is.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::MalformedPersistedData`] if the text is not a
    /// JSON object of arrays of numeric arrays.
    pub fn from_json(json: &str) -> DbResult<Self> {
        let map: BTreeMap<String, Vec<Template>> =
            serde_json::from_str(json).map_err(|e| DatabaseError::MalformedPersistedData(e.to_string()))?;
        Ok(Self::from_map(map))
    }

    /// Write the database to a file. `.json` is appended when the path has
    /// no such extension. Returns the path actually written.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> DbResult<PathBuf> {
        let path = json_path(path.as_ref());
        fs::write(&path, self.to_json()?)?;
        tracing::info!("Saved {} identities to {}", self.len(), path.display());
        Ok(path)
    }

    /// Read a database from a file. `.json` is appended when the path has no
    /// such extension.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Io`] if the file cannot be read, or
    /// [`DatabaseError::MalformedPersistedData`] if its content is invalid.
    pub fn load(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = json_path(path.as_ref());
        let db = Self::from_json(&fs::read_to_string(&path)?)?;
        tracing::info!("Loaded {} identities from {}", db.len(), path.display());
        Ok(db)
    }
}

fn json_path(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "json") {
        return path.to_path_buf();
    }
    let mut raw = OsString::from(path.as_os_str());
    raw.push(".json");
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_map() -> BTreeMap<String, Vec<Template>> {
        BTreeMap::from([
            ("p1".to_string(), vec![vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![0.4, 0.5, 6.0, 6.0]]),
            ("p2".to_string(), vec![vec![5.0, 6.0, 7.0, 8.0, 9.0]]),
        ])
    }

    #[test]
    fn test_from_map_and_incremental_agree() {
        let from_map = TemplateDatabase::from_map(sample_map());

        let mut incremental = TemplateDatabase::new();
        for (identity, templates) in sample_map() {
            for template in templates {
                incremental.add_template(identity.clone(), template);
            }
        }

        assert_eq!(from_map, incremental);
        assert_eq!(from_map.get_templates("p1").unwrap().len(), 2);
        assert_eq!(from_map.get_templates("p1").unwrap()[1], vec![0.4, 0.5, 6.0, 6.0]);
    }

    #[test]
    fn test_remove_identity() {
        let mut db = TemplateDatabase::from_map(sample_map());
        db.remove_identity("p1");

        assert!(db.get_templates("p1").is_none());
        assert_eq!(db.get_templates("p2").unwrap(), &[vec![5.0, 6.0, 7.0, 8.0, 9.0]]);

        // removing again is a no-op
        db.remove_identity("p1");
        assert_eq!(db.list_identities(), vec!["p2".to_string()]);
    }

    #[test]
    fn test_from_map_drops_empty_identities() {
        let mut map = sample_map();
        map.insert("ghost".to_string(), Vec::new());
        let db = TemplateDatabase::from_map(map);
        assert!(!db.contains("ghost"));
        assert_eq!(db.len(), 2);
    }

    #[test]
    fn test_json_roundtrip() {
        let db = TemplateDatabase::from_map(sample_map());
        let restored = TemplateDatabase::from_json(&db.to_json().unwrap()).unwrap();
        assert_eq!(restored, db);
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        for bad in [
            "not json",
            "[1, 2, 3]",
            r#"{"p1": [1.0, 2.0]}"#,
            r#"{"p1": [[1.0, "x"]]}"#,
            r#"{"p1": [[1.0, null]]}"#,
        ] {
            assert!(
                matches!(TemplateDatabase::from_json(bad), Err(DatabaseError::MalformedPersistedData(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn test_file_roundtrip_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        let db = TemplateDatabase::from_map(sample_map());

        let written = db.save(dir.path().join("templates")).unwrap();
        assert_eq!(written, dir.path().join("templates.json"));
        assert!(written.exists());

        let loaded = TemplateDatabase::load(dir.path().join("templates")).unwrap();
        assert_eq!(loaded, db);
        let loaded = TemplateDatabase::load(&written).unwrap();
        assert_eq!(loaded, db);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TemplateDatabase::load(dir.path().join("missing")),
            Err(DatabaseError::Io(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_json_roundtrip_exact(
            map in prop::collection::btree_map(
                "[a-z]{1,8}",
                prop::collection::vec(prop::collection::vec(-1.0e6f64..1.0e6, 0..8), 1..4),
                0..5,
            )
        ) {
            let db = TemplateDatabase::from_map(map);
            let restored = TemplateDatabase::from_json(&db.to_json().unwrap()).unwrap();
            prop_assert_eq!(restored, db);
        }
    }
}
