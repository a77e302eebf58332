// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(u64),
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem. Only sizes are stored, not contents.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file of `len` bytes, creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, len: u64) {
        let path = path.as_ref();
        let mut files = self.files.lock().unwrap();
        files.insert(path.to_path_buf(), MockEntry::File(len));
        link_to_parent(&mut files, path);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut files = self.files.lock().unwrap();
        ensure_dir_entry(&mut files, path);
    }
}

fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if !files.contains_key(path) {
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        link_to_parent(files, path);
    }
}

fn link_to_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    if parent == path {
        return;
    }
    ensure_dir_entry(files, parent);
    if let (Some(MockEntry::Dir(children)), Some(name)) = (
        files.get_mut(parent),
        path.file_name().and_then(|n| n.to_str()),
    ) {
        if !children.iter().any(|c| c == name) {
            children.push(name.to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        matches!(files.get(path), Some(MockEntry::Dir(_)))
    }

    fn file_len(&self, path: &Path) -> Result<u64> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::File(len)) => Ok(*len),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                let mut entries: Vec<PathBuf> =
                    children.iter().map(|name| path.join(name)).collect();
                entries.sort();
                Ok(entries)
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
