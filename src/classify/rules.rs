//! Mode Vocabulary and Rule Matcher
//!
//! The fixed mode vocabulary, its per-mode metadata, and the ordered keyword
//! rule set evaluated against sanitized prompt text. Declaration order of
//! [`Mode`] is the total priority order (highest first) used by the conflict
//! resolver.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Behavioral mode vocabulary, declared in priority order (highest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Cancel,
    Ralph,
    Autopilot,
    Team,
    Ultrawork,
    Ecomode,
    Pipeline,
    Ralplan,
    Plan,
    Tdd,
    Research,
    Ultrathink,
    Deepsearch,
    Analyze,
    Gemini,
    Codex,
}

/// What a mode activation means for the synthesizer and the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    /// Clears every active mode; never persists state.
    Control,
    /// Instructs the agent to load a named instruction set; persists state.
    Capability,
    /// Extends reasoning depth; prepended text, never a capability load.
    Reasoning,
    /// Hands the task off to an external reasoning provider via
    /// discovery-then-call; never a capability load.
    Delegation,
}

impl Mode {
    /// Every mode, in priority order.
    pub const ALL: [Mode; 16] = [
        Mode::Cancel,
        Mode::Ralph,
        Mode::Autopilot,
        Mode::Team,
        Mode::Ultrawork,
        Mode::Ecomode,
        Mode::Pipeline,
        Mode::Ralplan,
        Mode::Plan,
        Mode::Tdd,
        Mode::Research,
        Mode::Ultrathink,
        Mode::Deepsearch,
        Mode::Analyze,
        Mode::Gemini,
        Mode::Codex,
    ];

    /// Loop-type modes, consulted by the continuation gate in this order.
    pub const LOOPS: [Mode; 2] = [Mode::Ralph, Mode::Ralplan];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Cancel => "cancel",
            Mode::Ralph => "ralph",
            Mode::Autopilot => "autopilot",
            Mode::Team => "team",
            Mode::Ultrawork => "ultrawork",
            Mode::Ecomode => "ecomode",
            Mode::Pipeline => "pipeline",
            Mode::Ralplan => "ralplan",
            Mode::Plan => "plan",
            Mode::Tdd => "tdd",
            Mode::Research => "research",
            Mode::Ultrathink => "ultrathink",
            Mode::Deepsearch => "deepsearch",
            Mode::Analyze => "analyze",
            Mode::Gemini => "gemini",
            Mode::Codex => "codex",
        }
    }

    pub fn kind(self) -> ModeKind {
        match self {
            Mode::Cancel => ModeKind::Control,
            Mode::Ultrathink => ModeKind::Reasoning,
            Mode::Gemini | Mode::Codex => ModeKind::Delegation,
            _ => ModeKind::Capability,
        }
    }

    /// Whether a prompt match persists a state file for this mode.
    pub fn is_durable(self) -> bool {
        self.kind() == ModeKind::Capability
    }

    /// Loop-type modes advance an iteration counter at every stop attempt.
    pub fn is_loop(self) -> bool {
        matches!(self, Mode::Ralph | Mode::Ralplan)
    }

    /// Position in the total priority order; lower is higher priority.
    pub fn priority(self) -> u8 {
        self as u8
    }
}

/// One mode match: the mode plus the first captured argument, if any rule
/// produced one (numeric count phrases such as `ralph 25`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeMatch {
    pub mode: Mode,
    pub arg: Option<String>,
}

impl ModeMatch {
    pub fn new(mode: Mode) -> Self {
        Self { mode, arg: None }
    }
}

/// Ordered rule set. Every rule is evaluated; multiple rules may map to the
/// same mode. A single optional capture group carries the rule's argument.
const RULES: &[(Mode, &str)] = &[
    (Mode::Cancel, r"\bcancelomc\b"),
    (Mode::Cancel, r"\bcancel\s+omc\b"),
    (Mode::Cancel, r"\bomc\s*[:,]?\s*cancel\b"),
    (Mode::Ralph, r"\bralph\b(?:\s*x?\s*(\d{1,4})\b)?"),
    (Mode::Ralph, r"\bdon'?t\s+stop\s+until\b"),
    (Mode::Ralph, r"\bkeep\s+(?:working|going)\s+until\s+(?:done|finished|complete)\b"),
    (Mode::Autopilot, r"\bauto-?pilot\b"),
    (Mode::Team, r"\bteam\b(?:\s+of\s+(\d{1,2})\b)?"),
    (Mode::Ultrawork, r"\bultrawork\b"),
    (Mode::Ultrawork, r"\bulw\b"),
    (Mode::Ecomode, r"\beco-?mode\b"),
    (Mode::Pipeline, r"\bpipeline\b"),
    (Mode::Ralplan, r"\bralplan\b"),
    (Mode::Plan, r"\bplan\b"),
    (Mode::Plan, r"\bplanning\s+mode\b"),
    (Mode::Tdd, r"\btdd\b"),
    (Mode::Tdd, r"\btest[\s-]driven\b"),
    (Mode::Research, r"\bresearch\b"),
    (Mode::Ultrathink, r"\bultrathink\b"),
    (Mode::Deepsearch, r"\bdeep-?search\b"),
    (Mode::Analyze, r"\banaly[sz]e\b"),
    (Mode::Gemini, r"\b(?:ask\s+)?gemini\b"),
    (Mode::Codex, r"\b(?:ask\s+)?codex\b"),
];

static COMPILED_RULES: Lazy<Vec<(Mode, Regex)>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|(mode, pattern)| (*mode, Regex::new(pattern).expect("rule pattern")))
        .collect()
});

/// Evaluate every rule against sanitized text.
///
/// Matches are deduplicated by mode in first-encounter order; the first rule
/// that produces a captured argument for a mode wins that mode's argument.
pub fn match_modes(sanitized: &str) -> Vec<ModeMatch> {
    let mut matches: Vec<ModeMatch> = Vec::new();
    for (mode, regex) in COMPILED_RULES.iter() {
        let Some(caps) = regex.captures(sanitized) else {
            continue;
        };
        let arg = caps.get(1).map(|m| m.as_str().to_string());
        match matches.iter_mut().find(|m| m.mode == *mode) {
            Some(existing) => {
                if existing.arg.is_none() {
                    existing.arg = arg;
                }
            }
            None => matches.push(ModeMatch { mode: *mode, arg }),
        }
    }
    matches
}
