//! Continuous-authentication session state.

use serde::{Deserialize, Serialize};

/// Who was last authenticated, and when.
///
/// A `last_auth_time` of `0.0` means no valid authentication.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    last_identity: Option<String>,
    last_auth_time: f64,
}

impl Session {
    /// Identity of the last successful authentication.
    #[must_use]
    pub fn last_identity(&self) -> Option<&str> {
        self.last_identity.as_deref()
    }

    /// Time (seconds) of the last successful authentication, `0.0` if none.
    #[must_use]
    pub fn last_auth_time(&self) -> f64 {
        self.last_auth_time
    }

    /// Whether `identity` is the last authenticated identity.
    #[must_use]
    pub fn vouches_for(&self, identity: &str) -> bool {
        self.last_identity.as_deref() == Some(identity)
    }

    /// Record a successful authentication.
    pub fn record_success(&mut self, identity: &str, now: f64) {
        self.last_identity = Some(identity.to_string());
        self.last_auth_time = now;
    }

    /// Drop the authentication time, keeping the identity.
    pub fn invalidate(&mut self) {
        self.last_auth_time = 0.0;
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_transitions() {
        let mut session = Session::default();
        assert_eq!(session.last_identity(), None);

        session.record_success("alice", 12.5);
        assert!(session.vouches_for("alice"));
        assert!(!session.vouches_for("bob"));
        assert!((session.last_auth_time() - 12.5).abs() < f64::EPSILON);

        session.invalidate();
        assert_eq!(session.last_identity(), Some("alice"));
        assert!(session.last_auth_time().abs() < f64::EPSILON);

        session.reset();
        assert_eq!(session, Session::default());
    }
}
