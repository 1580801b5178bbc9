//! Session Restorer
//!
//! At session start, prepends opaque context blocks from external
//! collaborators and re-announces every active mode whose state survives from
//! an earlier invocation. A state bound to a session id restores only into
//! that session; unbound states restore unconditionally.

use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::Mode;
use crate::state::StateStore;

/// An external collaborator that contributes an opaque text block at session
/// start. The content is prepended verbatim, never interpreted.
pub trait ContextSource {
    fn name(&self) -> &'static str;
    fn provide(&self) -> Option<String>;
}

/// Context source backed by a plain text file.
pub struct FileContextSource {
    name: &'static str,
    path: PathBuf,
}

impl ContextSource for FileContextSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn provide(&self) -> Option<String> {
        let content = fs::read_to_string(&self.path).ok()?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// The update-availability collaborator's notice file.
pub fn update_notice_source(home: &Path) -> FileContextSource {
    FileContextSource {
        name: "update-notice",
        path: home.join(".omc").join("update-notice"),
    }
}

/// The priority-context collaborator's notepad file.
pub fn priority_context_source(project: &Path) -> FileContextSource {
    FileContextSource {
        name: "priority-context",
        path: project.join(".omc").join("notepad.md"),
    }
}

/// Re-announce active, session-compatible durable modes.
///
/// Stores are consulted in the order given; the first store holding a mode's
/// state wins, so a project-scope record shadows a global one.
pub fn restore_modes(stores: &[&dyn StateStore], session_id: Option<&str>) -> Vec<String> {
    let mut announcements = Vec::new();
    for mode in Mode::ALL {
        if !mode.is_durable() {
            continue;
        }
        let Some(doc) = stores.iter().find_map(|store| store.read(mode)) else {
            continue;
        };
        let state = doc.state();
        if !state.active || !state.restores_into(session_id) {
            continue;
        }
        announcements.push(format!(
            "[{}] mode is active (since {}). Original request: {}",
            mode.name(),
            state.started_at.format("%Y-%m-%d %H:%M UTC"),
            state.prompt
        ));
    }
    announcements
}

/// Assemble the full session-start context: collaborator blocks first, then
/// mode announcements. Returns `None` when nothing applies.
pub fn session_context(
    sources: &[&dyn ContextSource],
    stores: &[&dyn StateStore],
    session_id: Option<&str>,
) -> Option<String> {
    let mut blocks: Vec<String> = sources.iter().filter_map(|s| s.provide()).collect();
    blocks.extend(restore_modes(stores, session_id));
    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FsStateStore, ModeState, StateDoc};
    use tempfile::TempDir;

    fn activate(store: &FsStateStore, mode: Mode, session: Option<&str>) {
        let state = ModeState::activate("finish the migration", session, 10, "COMPLETE");
        store.write(mode, &StateDoc::for_mode(mode, state));
    }

    #[test]
    fn test_unbound_state_restores_anywhere() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        activate(&store, Mode::Ultrawork, None);
        let announcements = restore_modes(&[&store], Some("other-session"));
        assert_eq!(announcements.len(), 1);
        assert!(announcements[0].contains("[ultrawork]"));
    }

    #[test]
    fn test_bound_state_restores_only_into_its_session() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        activate(&store, Mode::Ralph, Some("s-1"));
        assert!(restore_modes(&[&store], Some("s-2")).is_empty());
        assert!(restore_modes(&[&store], None).is_empty());
        assert_eq!(restore_modes(&[&store], Some("s-1")).len(), 1);
    }

    #[test]
    fn test_project_scope_shadows_global() {
        let tmp = TempDir::new().unwrap();
        let project = FsStateStore::project(&tmp.path().join("repo"));
        let global = FsStateStore::global_at(&tmp.path().join("home"));
        activate(&project, Mode::Ultrawork, None);
        activate(&global, Mode::Ultrawork, None);
        let announcements = restore_modes(&[&project, &global], None);
        assert_eq!(announcements.len(), 1);
    }

    #[test]
    fn test_collaborator_blocks_come_first_verbatim() {
        let tmp = TempDir::new().unwrap();
        let home = tmp.path().join("home");
        let project = tmp.path().join("repo");
        fs::create_dir_all(home.join(".omc")).unwrap();
        fs::create_dir_all(project.join(".omc")).unwrap();
        fs::write(home.join(".omc/update-notice"), "omc 0.4.0 is available\n").unwrap();
        fs::write(project.join(".omc/notepad.md"), "# Remember\nuse the staging db").unwrap();

        let store = FsStateStore::project(&project);
        activate(&store, Mode::Tdd, None);

        let update = update_notice_source(&home);
        let notepad = priority_context_source(&project);
        let context =
            session_context(&[&update, &notepad], &[&store], None).expect("context");

        let update_pos = context.find("0.4.0 is available").expect("update block");
        let notepad_pos = context.find("staging db").expect("notepad block");
        let mode_pos = context.find("[tdd]").expect("mode announcement");
        assert!(update_pos < notepad_pos);
        assert!(notepad_pos < mode_pos);
    }

    #[test]
    fn test_nothing_applicable_yields_none() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        let update = update_notice_source(tmp.path());
        assert!(session_context(&[&update], &[&store], None).is_none());
    }
}
