//! Filesystem state store backend.
//!
//! One implementation serves both scopes; constructors pick the root. Writes
//! go to a temporary sibling and are moved into place with an atomic rename,
//! so a concurrent reader never observes a partial document. Reads and
//! deletes tolerate the file disappearing at any moment between invocations.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::classify::Mode;
use crate::error::StateError;

use super::contract::{Scope, StateStore};
use super::paths;
use super::StateDoc;

pub struct FsStateStore {
    dir: PathBuf,
    scope: Scope,
}

impl FsStateStore {
    /// Store rooted at `<project>/.omc/state`.
    pub fn project(project_root: &Path) -> Self {
        Self {
            dir: paths::project_state_dir(project_root),
            scope: Scope::Project,
        }
    }

    /// Store rooted at `<home>/.omc/state`.
    pub fn global_at(home: &Path) -> Self {
        Self {
            dir: paths::global_state_dir(home),
            scope: Scope::Global,
        }
    }

    /// Global store at the platform home directory, when resolvable.
    pub fn global() -> Option<Self> {
        paths::home_dir().map(|home| Self::global_at(&home))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file(&self, mode: Mode) -> PathBuf {
        paths::state_file(&self.dir, mode)
    }

    fn try_read(&self, mode: Mode) -> Result<Option<StateDoc>, StateError> {
        let path = self.file(mode);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::Read { path, source: e }),
        };
        match serde_json::from_str(&content) {
            Ok(doc) => Ok(Some(doc)),
            // Corrupt is indistinguishable from absent by contract.
            Err(e) => {
                tracing::warn!("corrupt state file {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn try_write(&self, mode: Mode, doc: &StateDoc) -> Result<(), StateError> {
        let path = self.file(mode);
        fs::create_dir_all(&self.dir).map_err(|e| StateError::Write {
            path: self.dir.clone(),
            source: e,
        })?;

        let serialized =
            serde_json::to_string_pretty(doc).map_err(|e| StateError::Serialize {
                path: path.clone(),
                source: e,
            })?;

        // Write-then-rename keeps readers from ever seeing a partial document.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serialized).map_err(|e| StateError::Write {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| StateError::Write { path, source: e })
    }
}

impl StateStore for FsStateStore {
    fn scope(&self) -> Scope {
        self.scope
    }

    fn read(&self, mode: Mode) -> Option<StateDoc> {
        match self.try_read(mode) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!("treating unreadable state as absent: {}", e);
                None
            }
        }
    }

    fn write(&self, mode: Mode, doc: &StateDoc) {
        if let Err(e) = self.try_write(mode, doc) {
            tracing::warn!("state write failed ({} scope): {}", self.scope.name(), e);
        }
    }

    fn delete(&self, mode: Mode) {
        let path = self.file(mode);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!("state delete failed {}: {}", path.display(), e);
            }
        }
    }

    fn clear(&self) {
        for mode in Mode::ALL {
            if mode.is_durable() {
                self.delete(mode);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ModeState;
    use tempfile::TempDir;

    fn doc() -> StateDoc {
        StateDoc::for_mode(
            Mode::Ultrawork,
            ModeState::activate("refactor the parser", Some("s-1"), 10, "COMPLETE"),
        )
    }

    #[test]
    fn test_read_after_write_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        let written = doc();
        store.write(Mode::Ultrawork, &written);
        assert_eq!(store.read(Mode::Ultrawork), Some(written));
    }

    #[test]
    fn test_read_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        assert_eq!(store.read(Mode::Ralph), None);
    }

    #[test]
    fn test_read_corrupt_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join("ralph-state.json"), "{truncated").unwrap();
        assert_eq!(store.read(Mode::Ralph), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        store.write(Mode::Ultrawork, &doc());
        store.delete(Mode::Ultrawork);
        store.delete(Mode::Ultrawork);
        store.delete(Mode::Plan);
        assert_eq!(store.read(Mode::Ultrawork), None);
    }

    #[test]
    fn test_clear_removes_every_durable_mode_file() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        store.write(Mode::Ultrawork, &doc());
        store.write(
            Mode::Ralph,
            &StateDoc::for_mode(Mode::Ralph, ModeState::activate("x", None, 10, "COMPLETE")),
        );
        store.clear();
        assert_eq!(store.read(Mode::Ultrawork), None);
        assert_eq!(store.read(Mode::Ralph), None);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let store = FsStateStore::project(tmp.path());
        store.write(Mode::Ultrawork, &doc());
        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_scopes_are_distinct_roots() {
        let tmp = TempDir::new().unwrap();
        let project = FsStateStore::project(&tmp.path().join("repo"));
        let global = FsStateStore::global_at(&tmp.path().join("home"));
        project.write(Mode::Ultrawork, &doc());
        assert_eq!(global.read(Mode::Ultrawork), None);
        assert_eq!(project.scope(), Scope::Project);
        assert_eq!(global.scope(), Scope::Global);
    }
}
