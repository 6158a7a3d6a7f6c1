//! Image-directory walking and the start-after resume filter.

use std::path::{Path, PathBuf};

use crate::error::{RunError, RunResult};

/// Collects every file under `dir` recursively. Entries are sorted at
/// each level so the sequence (and therefore the resume marker) is
/// stable across runs.
pub fn collect_images(dir: &Path) -> RunResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(dir, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> RunResult<()> {
    let scan_err = |source| RunError::Scan {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(scan_err)?
        .collect::<Result<_, _>>()
        .map_err(scan_err)?;
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();
        if entry.file_type().map_err(scan_err)?.is_dir() {
            walk(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Drops every entry up to and including the first exact match of
/// `start_after`. A marker that never matches skips everything, which is
/// surfaced as a warning rather than an error.
pub fn skip_through(files: Vec<PathBuf>, start_after: Option<&str>) -> Vec<PathBuf> {
    let Some(marker) = start_after else {
        return files;
    };
    let marker_os = std::ffi::OsStr::new(marker);
    match files.iter().position(|f| f.as_os_str() == marker_os) {
        Some(index) => files.into_iter().skip(index + 1).collect(),
        None => {
            tracing::warn!(marker, "start-after marker matched no image; nothing left to do");
            Vec::new()
        }
    }
}
