//! Continuation Gate
//!
//! The stop-time decision procedure. A strict priority chain where each layer
//! encodes a strictly stronger completion contract than the one beneath it:
//! abort bypass, then loop iteration (suspended while a verification is
//! pending), then reinforcement, then baseline continuation. Collapsing the
//! order would let a weaker check satisfy an unmet stronger obligation, so
//! the chain is evaluated top-down and the first applicable branch wins.
//!
//! The core is a pure function of (stop signal, durable state, aggregate
//! counts); it returns the verdict plus the state mutation the caller must
//! persist, never writing anything itself.

use chrono::{DateTime, Utc};

use crate::backlog::BacklogCount;
use crate::classify::Mode;
use crate::state::StateDoc;

/// Stop reasons that signal context or resource exhaustion; stopping for one
/// of these is never blocked.
pub const EXHAUSTION_REASONS: &[&str] = &[
    "context_exhausted",
    "context_limit",
    "context_window_exceeded",
    "token_limit",
    "out_of_context",
    "compact",
];

/// The stop attempt as reported on the wire.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    pub user_requested: bool,
    pub reason: Option<String>,
}

impl StopSignal {
    /// Explicit user cancellation or resource exhaustion; the gate must
    /// never block these.
    pub fn is_abort(&self) -> bool {
        self.user_requested
            || self
                .reason
                .as_deref()
                .is_some_and(|reason| EXHAUSTION_REASONS.contains(&reason))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Allow,
    Block(String),
}

/// A state document the caller must persist back to the store it was read
/// from before exiting.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub mode: Mode,
    pub doc: StateDoc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    pub mutation: Option<Mutation>,
}

impl Decision {
    fn allow() -> Self {
        Self {
            verdict: Verdict::Allow,
            mutation: None,
        }
    }

    fn block(reason: String) -> Self {
        Self {
            verdict: Verdict::Block(reason),
            mutation: None,
        }
    }

    fn block_with(reason: String, mutation: Mutation) -> Self {
        Self {
            verdict: Verdict::Block(reason),
            mutation: Some(mutation),
        }
    }
}

/// Evaluate the stop-time priority chain.
///
/// `loop_state` is the highest-priority active loop-type document, if any;
/// `ultrawork` the active ultrawork document, if any. Inactive documents are
/// ignored here regardless of what the caller passes.
pub fn evaluate(
    signal: &StopSignal,
    loop_state: Option<(Mode, &StateDoc)>,
    ultrawork: Option<&StateDoc>,
    backlog: &BacklogCount,
    now: DateTime<Utc>,
) -> Decision {
    // P0: abort bypass.
    if signal.is_abort() {
        return Decision::allow();
    }

    // P1: loop iteration, suspended while verification is pending.
    if let Some((mode, doc)) = loop_state {
        if doc.is_active() {
            if let Some(decision) = evaluate_loop(mode, doc, now) {
                return decision;
            }
        }
    }

    // P2: reinforcement while work remains.
    if let Some(doc) = ultrawork {
        if doc.is_active() && backlog.total() > 0 {
            let mut updated = doc.clone();
            {
                let state = updated.state_mut();
                state.reinforcement_count += 1;
                state.last_checked = Some(now);
            }
            let reason = reinforcement_message(&updated, backlog);
            return Decision::block_with(
                reason,
                Mutation {
                    mode: Mode::Ultrawork,
                    doc: updated,
                },
            );
        }
    }

    // P3: baseline continuation.
    if backlog.total() > 0 {
        return Decision::block(baseline_message(backlog));
    }

    // P4: nothing left to enforce.
    Decision::allow()
}

fn evaluate_loop(mode: Mode, doc: &StateDoc, now: DateTime<Utc>) -> Option<Decision> {
    if let Some(verification) = doc.verification() {
        if verification.pending {
            // Iteration must not advance while the oracle has the claim.
            return Some(Decision::block(verification_message(doc)));
        }
    }

    let state = doc.state();
    if state.iteration < state.max_iterations {
        let mut updated = doc.clone();
        {
            let state = updated.state_mut();
            state.iteration += 1;
            state.last_checked = Some(now);
        }
        let reason = loop_message(updated.state());
        return Some(Decision::block_with(reason, Mutation { mode, doc: updated }));
    }

    // Iteration ceiling reached: fall through to the weaker layers.
    None
}

fn verification_message(doc: &StateDoc) -> String {
    let state = doc.state();
    let verification = match doc.verification() {
        Some(v) => v,
        None => return loop_message(state),
    };
    let mut message = format!(
        "A completion claim is under verification (attempt {}/{}).\n\
         Original task: {}\n\
         Claim: {}",
        verification.attempts,
        verification.max_attempts,
        if verification.task.is_empty() {
            state.prompt.as_str()
        } else {
            verification.task.as_str()
        },
        verification.claim.as_deref().unwrap_or("(none recorded)"),
    );
    if let Some(feedback) = verification.feedback.as_deref() {
        message.push_str(&format!("\nVerifier feedback: {feedback}"));
    }
    message.push_str("\nDo not stop. Address the feedback and resubmit the claim for verification.");
    message
}

fn loop_message(state: &crate::state::ModeState) -> String {
    format!(
        "Loop iteration {}/{}. The loop ends only when you emit the completion promise \"{}\".\n\
         Original request: {}",
        state.iteration, state.max_iterations, state.completion_promise, state.prompt
    )
}

fn reinforcement_message(doc: &StateDoc, backlog: &BacklogCount) -> String {
    let state = doc.state();
    format!(
        "Ultrawork reinforcement #{}: {} incomplete item(s) remain. Keep working them to completion.\n\
         Original request: {}",
        state.reinforcement_count,
        backlog.total(),
        state.prompt
    )
}

fn baseline_message(backlog: &BacklogCount) -> String {
    format!(
        "{} incomplete {}(s) remain. Finish them before stopping.",
        backlog.total(),
        backlog.label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ModeState, VerificationState};

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn loop_doc(iteration: u32, max: u32) -> StateDoc {
        let mut state = ModeState::activate("ship the feature", Some("s-1"), max, "COMPLETE");
        state.iteration = iteration;
        StateDoc::for_mode(Mode::Ralph, state)
    }

    fn ultra_doc() -> StateDoc {
        StateDoc::for_mode(
            Mode::Ultrawork,
            ModeState::activate("clear the backlog", Some("s-1"), 10, "COMPLETE"),
        )
    }

    fn no_backlog() -> BacklogCount {
        BacklogCount::default()
    }

    fn backlog(tasks: usize, todos: usize) -> BacklogCount {
        BacklogCount { tasks, todos }
    }

    #[test]
    fn test_p0_user_requested_stop_bypasses_everything() {
        let doc = loop_doc(3, 10);
        let signal = StopSignal {
            user_requested: true,
            reason: None,
        };
        let decision = evaluate(
            &signal,
            Some((Mode::Ralph, &doc)),
            None,
            &backlog(4, 0),
            now(),
        );
        assert_eq!(decision.verdict, Verdict::Allow);
        assert!(decision.mutation.is_none());
    }

    #[test]
    fn test_p0_exhaustion_reason_bypasses_everything() {
        let doc = loop_doc(3, 10);
        let signal = StopSignal {
            user_requested: false,
            reason: Some("context_limit".into()),
        };
        let decision = evaluate(&signal, Some((Mode::Ralph, &doc)), None, &no_backlog(), now());
        assert_eq!(decision.verdict, Verdict::Allow);
    }

    #[test]
    fn test_unknown_reason_does_not_bypass() {
        let signal = StopSignal {
            user_requested: false,
            reason: Some("finished".into()),
        };
        let decision = evaluate(&signal, None, None, &backlog(1, 0), now());
        assert!(matches!(decision.verdict, Verdict::Block(_)));
    }

    #[test]
    fn test_p1_loop_advances_iteration_and_blocks() {
        let doc = loop_doc(3, 10);
        let decision = evaluate(
            &StopSignal::default(),
            Some((Mode::Ralph, &doc)),
            None,
            &no_backlog(),
            now(),
        );
        let Verdict::Block(reason) = &decision.verdict else {
            panic!("expected block");
        };
        assert!(reason.contains("4/10"));
        assert!(reason.contains("COMPLETE"));
        assert!(reason.contains("ship the feature"));

        let mutation = decision.mutation.expect("iteration must persist");
        assert_eq!(mutation.mode, Mode::Ralph);
        assert_eq!(mutation.doc.state().iteration, 4);
        assert!(mutation.doc.state().last_checked.is_some());
    }

    #[test]
    fn test_p1_pending_verification_blocks_without_advancing() {
        let mut doc = loop_doc(3, 10);
        if let StateDoc::Loop { verification, .. } = &mut doc {
            *verification = Some(VerificationState {
                pending: true,
                attempts: 1,
                max_attempts: 3,
                task: "ship the feature".into(),
                claim: Some("all tests pass".into()),
                feedback: Some("integration suite not run".into()),
            });
        }
        let decision = evaluate(
            &StopSignal::default(),
            Some((Mode::Ralph, &doc)),
            None,
            &no_backlog(),
            now(),
        );
        let Verdict::Block(reason) = &decision.verdict else {
            panic!("expected block");
        };
        assert!(reason.contains("attempt 1/3"));
        assert!(reason.contains("all tests pass"));
        assert!(reason.contains("integration suite not run"));
        assert!(decision.mutation.is_none());
    }

    #[test]
    fn test_p1_exhausted_loop_falls_through_to_allow() {
        let doc = loop_doc(10, 10);
        let decision = evaluate(
            &StopSignal::default(),
            Some((Mode::Ralph, &doc)),
            None,
            &no_backlog(),
            now(),
        );
        assert_eq!(decision.verdict, Verdict::Allow);
    }

    #[test]
    fn test_p1_exhausted_loop_falls_through_to_baseline() {
        let doc = loop_doc(10, 10);
        let decision = evaluate(
            &StopSignal::default(),
            Some((Mode::Ralph, &doc)),
            None,
            &backlog(0, 2),
            now(),
        );
        let Verdict::Block(reason) = &decision.verdict else {
            panic!("expected block");
        };
        assert!(reason.contains("2 incomplete todo(s)"));
    }

    #[test]
    fn test_inactive_loop_is_ignored() {
        let mut doc = loop_doc(3, 10);
        doc.state_mut().active = false;
        let decision = evaluate(
            &StopSignal::default(),
            Some((Mode::Ralph, &doc)),
            None,
            &no_backlog(),
            now(),
        );
        assert_eq!(decision.verdict, Verdict::Allow);
    }

    #[test]
    fn test_p2_reinforcement_increments_and_blocks() {
        let doc = ultra_doc();
        let decision = evaluate(
            &StopSignal::default(),
            None,
            Some(&doc),
            &backlog(2, 1),
            now(),
        );
        let Verdict::Block(reason) = &decision.verdict else {
            panic!("expected block");
        };
        assert!(reason.contains("reinforcement #1"));
        assert!(reason.contains("3 incomplete item(s)"));
        assert!(reason.contains("clear the backlog"));

        let mutation = decision.mutation.expect("count must persist");
        assert_eq!(mutation.mode, Mode::Ultrawork);
        assert_eq!(mutation.doc.state().reinforcement_count, 1);
    }

    #[test]
    fn test_p2_skipped_when_backlog_empty() {
        let doc = ultra_doc();
        let decision = evaluate(&StopSignal::default(), None, Some(&doc), &no_backlog(), now());
        assert_eq!(decision.verdict, Verdict::Allow);
        assert!(decision.mutation.is_none());
    }

    #[test]
    fn test_p3_baseline_blocks_with_task_label_precedence() {
        let decision = evaluate(&StopSignal::default(), None, None, &backlog(1, 3), now());
        let Verdict::Block(reason) = &decision.verdict else {
            panic!("expected block");
        };
        assert!(reason.contains("4 incomplete task(s)"));
    }

    #[test]
    fn test_p4_allows_when_nothing_applies() {
        let decision = evaluate(&StopSignal::default(), None, None, &no_backlog(), now());
        assert_eq!(decision.verdict, Verdict::Allow);
        assert!(decision.mutation.is_none());
    }

    #[test]
    fn test_p1_outranks_p2_and_p3() {
        let loop_doc = loop_doc(0, 10);
        let ultra = ultra_doc();
        let decision = evaluate(
            &StopSignal::default(),
            Some((Mode::Ralph, &loop_doc)),
            Some(&ultra),
            &backlog(5, 5),
            now(),
        );
        let mutation = decision.mutation.expect("loop mutation");
        assert_eq!(mutation.mode, Mode::Ralph);
    }
}
