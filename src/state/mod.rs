//! Durable Mode State
//!
//! Per-mode JSON records persisted at two scopes (project-local and global).
//! A state file's existence implies a well-formed document; absence means the
//! mode is inactive. Documents are a small closed set of tagged variants:
//! plain capability state vs loop state carrying an optional verification
//! record.

pub mod contract;
pub mod fs;
pub mod paths;

pub use contract::{Scope, StateStore};
pub use fs::FsStateStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Mode;

/// Default iteration ceiling for loop-type modes.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Default completion-promise token for loop-type modes.
pub const DEFAULT_COMPLETION_PROMISE: &str = "COMPLETE";

const DEFAULT_MAX_VERIFICATION_ATTEMPTS: u32 = 3;

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_completion_promise() -> String {
    DEFAULT_COMPLETION_PROMISE.to_string()
}

fn default_max_verification_attempts() -> u32 {
    DEFAULT_MAX_VERIFICATION_ATTEMPTS
}

/// Core per-mode state. Missing fields default explicitly on read; unknown
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeState {
    pub active: bool,
    #[serde(default = "unix_epoch")]
    pub started_at: DateTime<Utc>,
    /// Original (unsanitized) activating prompt.
    #[serde(default)]
    pub prompt: String,
    /// Session the state is bound to; unbound states restore anywhere.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub reinforcement_count: u32,
    #[serde(default)]
    pub iteration: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_completion_promise")]
    pub completion_promise: String,
    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,
}

impl ModeState {
    /// Fresh activation record bound to `session_id`, counters zeroed.
    pub fn activate(
        prompt: &str,
        session_id: Option<&str>,
        max_iterations: u32,
        completion_promise: &str,
    ) -> Self {
        Self {
            active: true,
            started_at: Utc::now(),
            prompt: prompt.to_string(),
            session_id: session_id.map(str::to_string),
            reinforcement_count: 0,
            iteration: 0,
            max_iterations,
            completion_promise: completion_promise.to_string(),
            last_checked: None,
        }
    }

    /// Whether this state may restore into `session_id`. Unbound states
    /// restore unconditionally.
    pub fn restores_into(&self, session_id: Option<&str>) -> bool {
        match (&self.session_id, session_id) {
            (Some(bound), Some(current)) => bound == current,
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Oracle-verification record attached 1:1 to a loop-type state. While
/// `pending`, the owning loop must not advance its iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationState {
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default = "default_max_verification_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub claim: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// The persisted document: plain capability state, or loop state with an
/// optional verification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateDoc {
    Mode(ModeState),
    Loop {
        #[serde(flatten)]
        state: ModeState,
        #[serde(default)]
        verification: Option<VerificationState>,
    },
}

impl StateDoc {
    /// Build the right document variant for a mode activation.
    pub fn for_mode(mode: Mode, state: ModeState) -> Self {
        if mode.is_loop() {
            StateDoc::Loop {
                state,
                verification: None,
            }
        } else {
            StateDoc::Mode(state)
        }
    }

    pub fn state(&self) -> &ModeState {
        match self {
            StateDoc::Mode(state) => state,
            StateDoc::Loop { state, .. } => state,
        }
    }

    pub fn state_mut(&mut self) -> &mut ModeState {
        match self {
            StateDoc::Mode(state) => state,
            StateDoc::Loop { state, .. } => state,
        }
    }

    pub fn verification(&self) -> Option<&VerificationState> {
        match self {
            StateDoc::Mode(_) => None,
            StateDoc::Loop { verification, .. } => verification.as_ref(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_record_has_zeroed_counters() {
        let state = ModeState::activate("fix the build", Some("s-1"), 10, "COMPLETE");
        assert!(state.active);
        assert_eq!(state.reinforcement_count, 0);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.session_id.as_deref(), Some("s-1"));
        assert!(state.last_checked.is_none());
    }

    #[test]
    fn test_session_binding() {
        let bound = ModeState::activate("x", Some("s-1"), 10, "COMPLETE");
        assert!(bound.restores_into(Some("s-1")));
        assert!(!bound.restores_into(Some("s-2")));
        assert!(!bound.restores_into(None));

        let unbound = ModeState::activate("x", None, 10, "COMPLETE");
        assert!(unbound.restores_into(Some("anything")));
        assert!(unbound.restores_into(None));
    }

    #[test]
    fn test_loop_doc_for_loop_modes() {
        let state = ModeState::activate("x", None, 10, "COMPLETE");
        assert!(matches!(
            StateDoc::for_mode(Mode::Ralph, state.clone()),
            StateDoc::Loop { .. }
        ));
        assert!(matches!(
            StateDoc::for_mode(Mode::Ultrawork, state),
            StateDoc::Mode(_)
        ));
    }

    #[test]
    fn test_missing_fields_default_on_read() {
        let doc: StateDoc =
            serde_json::from_str(r#"{"kind":"loop","active":true}"#).expect("parse");
        let state = doc.state();
        assert!(state.active);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(state.completion_promise, DEFAULT_COMPLETION_PROMISE);
        assert!(doc.verification().is_none());
    }

    #[test]
    fn test_unknown_fields_ignored_on_read() {
        let doc: StateDoc = serde_json::from_str(
            r#"{"kind":"mode","active":false,"someday_field":42}"#,
        )
        .expect("parse");
        assert!(!doc.is_active());
    }
}
