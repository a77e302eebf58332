// src/transfer/scratch.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::errors::{ExecError, Result};

/// The only place the framework is allowed to delete things from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchRoot {
    root: PathBuf,
}

impl ScratchRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The system temporary directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, uniquely named directory under the root. The caller
    /// owns it from then on (it is not removed automatically).
    pub fn create_dir(&self, prefix: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(&self.root)?;
        let path = dir.keep();
        debug!(dir = ?path, "scratch directory created");
        Ok(path)
    }

    /// `true` if `path` exists and resolves to something strictly below the
    /// root (symlinks and `..` are resolved first).
    pub fn contains(&self, path: &Path) -> bool {
        match (fs::canonicalize(&self.root), fs::canonicalize(path)) {
            (Ok(root), Ok(p)) => p != root && p.starts_with(&root),
            _ => false,
        }
    }

    /// Recursively delete `path`, refusing anything outside the root.
    ///
    /// A path that does not exist is not an error.
    pub fn remove(&self, path: &Path) -> Result<()> {
        if fs::symlink_metadata(path).is_err() {
            return Ok(());
        }
        if !self.contains(path) {
            return Err(ExecError::ValidationError(format!(
                "refusing to remove {path:?}: not under scratch root {:?}",
                self.root
            )));
        }
        trace!(path = ?path, "removing scratch path");
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl Default for ScratchRoot {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_directories_under_root() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchRoot::new(root.path());
        let dir = scratch.create_dir("zip-").unwrap();
        fs::write(dir.join("a.txt"), b"a").unwrap();

        assert!(scratch.contains(&dir));
        scratch.remove(&dir).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn refuses_paths_outside_root() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let victim = elsewhere.path().join("keep.txt");
        fs::write(&victim, b"precious").unwrap();

        let scratch = ScratchRoot::new(root.path().join("scratch"));
        fs::create_dir_all(scratch.path()).unwrap();

        let err = scratch.remove(&victim).unwrap_err();
        assert!(matches!(err, ExecError::ValidationError(_)));
        assert!(victim.exists());
    }

    #[test]
    fn refuses_escape_through_parent_components() {
        let root = tempfile::tempdir().unwrap();
        let scratch_dir = root.path().join("scratch");
        fs::create_dir_all(&scratch_dir).unwrap();
        let sibling = root.path().join("data.txt");
        fs::write(&sibling, b"x").unwrap();

        let scratch = ScratchRoot::new(&scratch_dir);
        let sneaky = scratch_dir.join("..").join("data.txt");
        assert!(scratch.remove(&sneaky).is_err());
        assert!(sibling.exists());
    }

    #[test]
    fn refuses_the_root_itself() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchRoot::new(root.path());
        assert!(scratch.remove(root.path()).is_err());
        assert!(root.path().exists());
    }
}
