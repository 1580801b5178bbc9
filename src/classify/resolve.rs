//! Conflict Resolver
//!
//! Reduces a match set into a deterministic, priority-ordered activation
//! sequence. The policy is declarative: a cancellation short-circuit, two
//! (winner, loser) pair tables, and the fixed priority order carried by
//! [`Mode`] declaration order.

use super::rules::{Mode, ModeMatch};

/// Absorption pairs: the winner already implies the loser's behavior, so the
/// loser is dropped when both are present.
pub const ABSORPTIONS: &[(Mode, Mode)] = &[
    (Mode::Ralplan, Mode::Ralph),
    (Mode::Ralplan, Mode::Plan),
    (Mode::Autopilot, Mode::Plan),
    (Mode::Autopilot, Mode::Ultrawork),
];

/// Override pairs: the two modes conflict and the winner takes precedence.
pub const OVERRIDES: &[(Mode, Mode)] = &[(Mode::Ultrawork, Mode::Ecomode)];

/// Reduce a match set to its resolved activation sequence.
///
/// Pure function of set membership: the same input set always yields the
/// same output sequence regardless of match order.
pub fn resolve(matches: Vec<ModeMatch>) -> Vec<ModeMatch> {
    if let Some(cancel) = matches.iter().find(|m| m.mode == Mode::Cancel) {
        return vec![cancel.clone()];
    }

    let present = |mode: Mode| matches.iter().any(|m| m.mode == mode);
    let mut resolved: Vec<ModeMatch> = matches
        .iter()
        .filter(|m| {
            !ABSORPTIONS
                .iter()
                .chain(OVERRIDES.iter())
                .any(|(winner, loser)| *loser == m.mode && present(*winner))
        })
        .cloned()
        .collect();

    resolved.sort_by_key(|m| m.mode.priority());
    resolved
}
