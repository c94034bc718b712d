//! Local cleanup of session log files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::session_log_file;

/// Truncate a session's log file to empty. The file must already exist.
pub fn clear(project_dir: &Path, log_subdir: &str, session: &str) -> Result<PathBuf> {
    let path = existing(project_dir, log_subdir, session)?;
    fs::write(&path, "")?;
    Ok(path)
}

/// Delete a session's log file. The file must already exist.
pub fn remove(project_dir: &Path, log_subdir: &str, session: &str) -> Result<PathBuf> {
    let path = existing(project_dir, log_subdir, session)?;
    fs::remove_file(&path)?;
    Ok(path)
}

fn existing(project_dir: &Path, log_subdir: &str, session: &str) -> Result<PathBuf> {
    let path = session_log_file(project_dir, log_subdir, session);
    if !path.is_file() {
        bail!("Log file not found: {}", path.display());
    }
    Ok(path)
}
