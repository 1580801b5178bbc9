//! Message Synthesizer
//!
//! Renders a resolved activation sequence into one outbound instruction
//! payload. Capability invocations instruct the agent to load named
//! instruction sets in order; delegations instruct a discovery-then-call
//! handoff to an external reasoning provider; a reasoning-extension match is
//! hoisted to the front of the payload.

use super::rules::{Mode, ModeKind, ModeMatch};

const ULTRATHINK_TEXT: &str = "Engage maximum reasoning depth for this task: \
enumerate assumptions, weigh alternatives, and verify each step before acting.";

/// One-line behavioral summary per capability mode.
fn capability_summary(mode: Mode) -> &'static str {
    match mode {
        Mode::Ralph => "self-looping execution; keep iterating until the completion promise is emitted",
        Mode::Autopilot => "full autonomous delivery; plan, implement, verify, and ship without pausing for confirmation",
        Mode::Team => "coordinated multi-agent execution of the task",
        Mode::Ultrawork => "maximum-effort execution; work every open item to completion",
        Mode::Ecomode => "token-frugal execution; prefer targeted reads and minimal edits",
        Mode::Pipeline => "staged execution; design the stage sequence, then run each stage in order",
        Mode::Ralplan => "planning interview followed by self-looping execution of the approved plan",
        Mode::Plan => "produce and confirm a plan before any implementation",
        Mode::Tdd => "test-driven flow; write failing tests first, then make them pass",
        Mode::Research => "gather evidence from the codebase and docs before acting",
        Mode::Deepsearch => "exhaustive multi-angle search of the workspace",
        Mode::Analyze => "root-cause analysis; diagnose before changing anything",
        _ => "",
    }
}

fn capability_line(m: &ModeMatch) -> String {
    match &m.arg {
        Some(arg) => format!(
            "`{}`: {} (requested count: {})",
            m.mode.name(),
            capability_summary(m.mode),
            arg
        ),
        None => format!("`{}`: {}", m.mode.name(), capability_summary(m.mode)),
    }
}

fn delegation_block(mode: Mode) -> String {
    format!(
        "Delegate to {provider}: list the available external tools, locate the \
{provider} consultation tool, then call it with the complete task context and \
constraints. Report its answer before proceeding.",
        provider = mode.name()
    )
}

fn capability_section(capabilities: &[&ModeMatch]) -> String {
    if capabilities.len() == 1 {
        format!("Activate {}.", capability_line(capabilities[0]))
    } else {
        let listed = capabilities
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {}", i + 1, capability_line(m)))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Activate the following capabilities:\n{listed}\nInvoke each capability in order; do not skip any."
        )
    }
}

/// Build the outbound payload for a resolved sequence, if any.
///
/// Returns `None` for an empty sequence (pass-through). Control matches are
/// handled upstream and ignored here.
pub fn synthesize(resolved: &[ModeMatch]) -> Option<String> {
    let think = resolved.iter().find(|m| m.mode.kind() == ModeKind::Reasoning);
    let capabilities: Vec<&ModeMatch> = resolved
        .iter()
        .filter(|m| m.mode.kind() == ModeKind::Capability)
        .collect();
    let delegations: Vec<&ModeMatch> = resolved
        .iter()
        .filter(|m| m.mode.kind() == ModeKind::Delegation)
        .collect();

    let mut sections: Vec<String> = Vec::new();

    match (capabilities.is_empty(), delegations.is_empty()) {
        (false, false) => {
            sections.push(format!("## Capability invocations\n{}", capability_section(&capabilities)));
            let blocks = delegations
                .iter()
                .map(|m| delegation_block(m.mode))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(format!("## Delegations\n{blocks}"));
            sections.push("Complete every section above in order.".to_string());
        }
        (false, true) => sections.push(capability_section(&capabilities)),
        (true, false) => sections.extend(delegations.iter().map(|m| delegation_block(m.mode))),
        (true, true) => {}
    }

    let body = sections.join("\n\n");
    match (think, body.is_empty()) {
        (Some(_), true) => Some(ULTRATHINK_TEXT.to_string()),
        (Some(_), false) => Some(format!("{ULTRATHINK_TEXT}\n\n{body}")),
        (None, true) => None,
        (None, false) => Some(body),
    }
}
