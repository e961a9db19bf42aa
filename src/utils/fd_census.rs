/// Open file descriptor census
///
/// Counting entries in /proc/self/fd gives the kernel's view of how many
/// handles the process is holding, independent of what the leak collections
/// claim.
use crate::config::types::{ProbeError, Result};
use std::fs;
use std::path::Path;

const FD_DIR: &str = "/proc/self/fd";

/// Get list of open file descriptors
pub fn get_open_fds() -> Result<Vec<i32>> {
    let entries = fs::read_dir(FD_DIR)
        .map_err(|e| ProbeError::Evidence(format!("Failed to read {}: {}", FD_DIR, e)))?;

    let mut fds = Vec::new();

    for entry in entries.flatten() {
        if let Ok(file_name) = entry.file_name().into_string() {
            if let Ok(fd) = file_name.parse::<i32>() {
                fds.push(fd);
            }
        }
    }

    fds.sort();
    Ok(fds)
}

/// Number of open descriptors, or None where /proc is unavailable
pub fn open_fd_count() -> Option<usize> {
    match get_open_fds() {
        Ok(fds) => Some(fds.len()),
        Err(e) => {
            log::debug!("fd census unavailable: {}", e);
            None
        }
    }
}

/// Descriptors whose /proc/self/fd link resolves to `path`
///
/// Lets a caller prove a specific file is still held open after the code that
/// opened it has returned.
pub fn fds_pointing_at(path: &Path) -> Result<Vec<i32>> {
    let target = fs::canonicalize(path)?;
    let fds = get_open_fds()?;

    Ok(fds
        .into_iter()
        .filter(|fd| {
            fs::read_link(Path::new(FD_DIR).join(fd.to_string()))
                .map(|link| link == target)
                .unwrap_or(false)
        })
        .collect())
}
