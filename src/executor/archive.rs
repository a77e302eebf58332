// src/executor/archive.rs

//! Zip handling, done in-process with the `zip` crate. Everything here is
//! blocking and runs on `spawn_blocking`.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::Result;
use crate::exec::StatusReport;
use crate::transfer::stage_with;

/// Expand every file entry of `archive` into `dest_dir`.
///
/// Entry paths are flattened to their last component and lowercased, so the
/// whole archive lands in one directory. Each entry is staged and committed
/// on its own; an existing file of the same name is replaced.
pub(crate) fn extract(archive: &Path, dest_dir: &Path) -> Result<StatusReport> {
    let start = Instant::now();
    let mut report = StatusReport::new();
    report.insert("Source", display_name(archive));
    report.insert("Size", archive.metadata()?.len());

    std::fs::create_dir_all(dest_dir)?;
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut files = 0usize;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = flattened_name(entry.name()) else {
            debug!(entry = entry.name(), "skipping entry without a usable file name");
            continue;
        };
        if name.as_str() != entry.name() {
            debug!(entry = entry.name(), target = %name, "flattening archive entry");
        }
        let target = dest_dir.join(&name);
        let staged = stage_with(&target, |f| {
            io::copy(&mut entry, f)?;
            Ok(())
        })?;
        staged.commit(&target, true)?;
        files += 1;
    }

    report.insert("Directory", dest_dir.display());
    report.insert("Files", files);
    report.insert("Duration", start.elapsed().as_millis());
    Ok(report)
}

/// Pack `files` (regular files, stored under their own names) into a zip at
/// `target`.
pub(crate) fn create(
    source_dir: &Path,
    files: &[PathBuf],
    target: &Path,
    overwrite: bool,
) -> Result<StatusReport> {
    let start = Instant::now();
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let staged = stage_with(target, |f| {
        let mut writer = ZipWriter::new(f);
        for path in files {
            let name = display_name(path);
            writer.start_file(name.as_str(), options)?;
            let mut input = File::open(path)?;
            io::copy(&mut input, &mut writer)?;
        }
        writer.finish()?;
        Ok(())
    })?;
    let size = staged.len()?;
    let archive = staged.commit(target, overwrite)?;

    let mut report = StatusReport::new();
    report.insert("Source", source_dir.display());
    report.insert("Archive", archive.display());
    report.insert("Files", files.len());
    report.insert("Size", size);
    report.insert("Duration", start.elapsed().as_millis());
    Ok(report)
}

/// Last path component of an entry name, lowercased. `None` for names that
/// would not be a plain file name.
fn flattened_name(entry: &str) -> Option<String> {
    let last = entry.rsplit(['/', '\\']).next()?;
    match last {
        "" | "." | ".." => None,
        name => Some(name.to_lowercase()),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    #[test]
    fn flattening_rules() {
        assert_eq!(flattened_name("a/b/Data.TXT").as_deref(), Some("data.txt"));
        assert_eq!(flattened_name("plain.csv").as_deref(), Some("plain.csv"));
        assert_eq!(flattened_name("dir\\Win.DAT").as_deref(), Some("win.dat"));
        assert_eq!(flattened_name("dir/"), None);
        assert_eq!(flattened_name("../.."), None);
    }

    #[test]
    fn extract_flattens_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("Facility.zip");
        write_zip(
            &archive,
            &[
                ("docs/", ""),
                ("docs/README.TXT", "read me"),
                ("EN.dat", "1|2|3\n"),
                ("../escape.txt", "nope"),
            ],
        );
        let out = dir.path().join("out");

        let report = extract(&archive, &out).unwrap();
        assert_eq!(report.get("Source"), Some("Facility.zip"));
        assert_eq!(report.get("Files"), Some("3"));
        assert_eq!(fs::read(out.join("readme.txt")).unwrap(), b"read me");
        assert_eq!(fs::read(out.join("en.dat")).unwrap(), b"1|2|3\n");
        assert_eq!(fs::read(out.join("escape.txt")).unwrap(), b"nope");
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn create_then_extract() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.txt"), b"alpha").unwrap();
        fs::write(src.join("b.txt"), b"beta").unwrap();
        let files = vec![src.join("a.txt"), src.join("b.txt")];

        let target = dir.path().join("bundle.zip");
        let report = create(&src, &files, &target, false).unwrap();
        assert_eq!(report.get("Files"), Some("2"));
        assert!(target.exists());

        let err = create(&src, &files, &target, false).unwrap_err();
        assert!(matches!(err, crate::errors::ExecError::DestinationExists(_)));

        let out = dir.path().join("out");
        extract(&target, &out).unwrap();
        assert_eq!(fs::read(out.join("b.txt")).unwrap(), b"beta");
    }
}
