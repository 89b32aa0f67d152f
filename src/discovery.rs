//! Locating worker logs inside a run directory.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Find every file called `file_name` in the subdirectories of `run_dir`.
///
/// Files directly inside `run_dir` are ignored; that is where the aggregate
/// results file of earlier runs may live. Paths come back sorted.
pub fn discover_result_files(run_dir: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = subdirectories(run_dir)?;

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to list directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && entry.file_name() == file_name {
                found.push(path);
            }
        }
    }

    found.sort();
    debug!(
        "Discovered {} {} files under {}",
        found.len(),
        file_name,
        run_dir.display()
    );
    Ok(found)
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to list directory {}", dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}
