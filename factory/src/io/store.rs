//! Artifact persistence.
//!
//! Phase handlers never touch the filesystem directly; they go through an
//! [`ArtifactStore`] so tests can substitute an in-memory store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Destination for generated files.
pub trait ArtifactStore {
    /// Write `contents` to `path`, creating parent directories.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Read `path`, or `None` when it does not exist.
    fn read(&self, path: &Path) -> Result<Option<String>>;

    /// True when `dir` exists and holds at least one entry.
    fn has_entries(&self, dir: &Path) -> Result<bool>;

    /// Files directly inside `dir`, sorted. Empty when `dir` does not exist.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Writes artifacts to the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactStore;

impl ArtifactStore for FsArtifactStore {
    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
        debug!(path = %path.display(), bytes = contents.len(), "artifact written");
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Ok(Some(contents))
    }

    fn has_entries(&self, dir: &Path) -> Result<bool> {
        if !dir.is_dir() {
            return Ok(false);
        }
        let mut entries =
            fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;
        Ok(entries.next().is_some())
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in
            fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?
        {
            let path = entry
                .with_context(|| format!("read entry in {}", dir.display()))?
                .path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Write each `(relative path, contents)` pair under `root`.
///
/// Returns the relative paths in write order. Stops at the first failure;
/// files already written stay in place.
pub fn write_tree<S: ArtifactStore + ?Sized>(
    store: &S,
    root: &Path,
    files: &[(PathBuf, String)],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for (relative, contents) in files {
        store.write(&root.join(relative), contents)?;
        written.push(relative.clone());
    }
    Ok(written)
}
