//! Prompt Classification
//!
//! Turns raw prompt text into a resolved sequence of mode activations:
//! sanitize structural noise out of the text, evaluate the keyword rule set,
//! reduce the match set through the conflict-resolution policy, and render
//! one outbound instruction payload.

pub mod message;
pub mod resolve;
pub mod rules;
pub mod sanitize;

pub use message::synthesize;
pub use resolve::resolve;
pub use rules::{match_modes, Mode, ModeKind, ModeMatch};
pub use sanitize::sanitize;

/// Run the full pipeline: sanitize, match, resolve.
pub fn classify(raw: &str) -> Vec<ModeMatch> {
    let sanitized = sanitize(raw);
    resolve(match_modes(&sanitized))
}
