//! Path utilities for finding data directories

use std::env;
use std::path::{Path, PathBuf};

/// Folders that mark a directory as the application's data root
const MARKER_DIRS: [&str; 2] = ["config", "resources"];

/// Returns the folder where config, templates and debug output live.
/// Uses the executable directory when it ships with `config/` or `resources/`,
/// otherwise the current working directory.
pub fn get_data_dir() -> PathBuf {
    if let Ok(exe_path) = env::current_exe() {
        if let Some(parent) = exe_path.parent() {
            if is_data_root(parent) {
                return parent.to_path_buf();
            }
        }
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn is_data_root(dir: &Path) -> bool {
    MARKER_DIRS.iter().any(|marker| dir.join(marker).is_dir())
}

/// Directory holding the template images
pub fn resources_dir() -> PathBuf {
    get_data_dir().join("resources")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_data_dir() {
        let dir = get_data_dir();
        assert!(dir.exists() || dir == PathBuf::from("."));
    }

    #[test]
    fn test_is_data_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_data_root(dir.path()));
        std::fs::create_dir(dir.path().join("resources")).unwrap();
        assert!(is_data_root(dir.path()));
    }
}
