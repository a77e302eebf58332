// src/transfer/staged.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};

use crate::errors::{ExecError, Result};

/// An invocation-private file that becomes visible at its final path only
/// through [`StagedFile::commit`].
///
/// Dropping an uncommitted `StagedFile` deletes it, so a failed or abandoned
/// invocation never leaves anything at the final path.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
}

impl StagedFile {
    /// Stage next to `target`, creating its parent directories first. Being
    /// on the same filesystem as the target keeps the final rename atomic.
    pub fn new_for(target: &Path) -> Result<Self> {
        let dir = parent_dir(target);
        fs::create_dir_all(&dir)?;
        Self::in_dir(&dir, &stage_prefix(target))
    }

    /// Stage inside `dir` (which must exist) with the given name prefix.
    pub fn in_dir(dir: &Path, prefix: &str) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(".part");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o644));
        }
        let file = builder.tempfile_in(dir)?;
        let path = file.into_temp_path();
        debug!(staged = ?&*path, "staged file created");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the staged content in bytes.
    pub fn len(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Move the staged content to `target` with a single rename.
    ///
    /// - `overwrite = false`: fails with `DestinationExists` if `target`
    ///   exists, leaving it untouched (checked atomically by the rename).
    /// - `overwrite = true`: an existing `target` is replaced in one step;
    ///   readers see either the old or the new content.
    ///
    /// Parent directories of `target` are created as needed. If the rename
    /// cannot be done directly (staged file on another filesystem) the content
    /// is first copied next to the target and renamed from there.
    pub fn commit(self, target: &Path, overwrite: bool) -> Result<PathBuf> {
        fs::create_dir_all(parent_dir(target))?;

        let persisted = if overwrite {
            self.path.persist(target)
        } else {
            self.path.persist_noclobber(target)
        };

        match persisted {
            Ok(()) => {
                debug!(target = ?target, overwrite, "staged file committed");
                Ok(target.to_path_buf())
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists && !overwrite => {
                Err(ExecError::DestinationExists(target.to_path_buf()))
            }
            Err(e) if e.error.kind() == io::ErrorKind::CrossesDevices => {
                warn!(target = ?target, "staged file on another filesystem; copying before rename");
                let staged = e.path;
                let local = copy_beside(&staged, target)?;
                local.commit(target, overwrite)
            }
            Err(e) => Err(ExecError::IoError(e.error)),
        }
    }
}

/// Copy `source` into a new `StagedFile` in the directory of `target`.
fn copy_beside(source: &Path, target: &Path) -> Result<StagedFile> {
    let local = StagedFile::new_for(target)?;
    let mut reader = fs::File::open(source)?;
    let mut writer = fs::OpenOptions::new().write(true).truncate(true).open(local.path())?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    Ok(local)
}

/// Longest part of the target name kept in a staged name. The rest of the
/// staged name adds 13 bytes, well under the usual 255-byte limit.
const MAX_STAGE_NAME: usize = 64;

/// `.<name>.` with `name` cut to at most `MAX_STAGE_NAME` bytes.
fn stage_prefix(target: &Path) -> String {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "staged".to_string());
    let mut end = name.len().min(MAX_STAGE_NAME);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!(".{}.", &name[..end])
}

fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Create a staged file and fill it from `write`, for content produced
/// in-process rather than by a child.
pub fn stage_with<F>(target: &Path, write: F) -> Result<StagedFile>
where
    F: FnOnce(&mut fs::File) -> Result<()>,
{
    let staged = StagedFile::new_for(target)?;
    let mut file = fs::OpenOptions::new().write(true).truncate(true).open(staged.path())?;
    write(&mut file)?;
    file.sync_all()?;
    Ok(staged)
}
