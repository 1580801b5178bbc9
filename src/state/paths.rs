//! State file path construction.

use std::path::{Path, PathBuf};

use crate::classify::Mode;

/// Directory name shared by both scopes: `.omc/state`.
fn omc_state_dir(root: &Path) -> PathBuf {
    root.join(".omc").join("state")
}

pub fn project_state_dir(project_root: &Path) -> PathBuf {
    omc_state_dir(project_root)
}

pub fn global_state_dir(home: &Path) -> PathBuf {
    omc_state_dir(home)
}

/// `<dir>/<mode>-state.json`
pub fn state_file(dir: &Path, mode: Mode) -> PathBuf {
    dir.join(format!("{}-state.json", mode.name()))
}

/// Platform home directory, if resolvable.
pub fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_file_layout() {
        let dir = project_state_dir(Path::new("/work/repo"));
        assert_eq!(dir, PathBuf::from("/work/repo/.omc/state"));
        assert_eq!(
            state_file(&dir, Mode::Ultrawork),
            PathBuf::from("/work/repo/.omc/state/ultrawork-state.json")
        );
    }
}
