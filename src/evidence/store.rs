/// Evidence file I/O
///
/// Every path is attempted independently. A failure is recorded in that
/// path's outcome and logged; it never stops the remaining paths.
use log::{info, warn};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Result of appending one evidence line to one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AppendOutcome {
    Written { path: PathBuf, bytes: usize },
    Failed { path: PathBuf, error: String },
}

impl AppendOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written { path, .. } | Self::Failed { path, .. } => path,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// What was found at one checked path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvidenceCheck {
    Present {
        path: PathBuf,
        size_bytes: u64,
        lines: usize,
    },
    Absent {
        path: PathBuf,
    },
    Unreadable {
        path: PathBuf,
        error: String,
    },
}

/// Append `line` to `path`, creating the file but not its parent directory
pub fn append_line(path: &Path, line: &str) -> std::io::Result<usize> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.flush()?;
    Ok(line.len())
}

/// Append `line` to every path, one outcome per path in input order
pub fn append_to_all(paths: &[PathBuf], line: &str) -> Vec<AppendOutcome> {
    paths
        .iter()
        .map(|path| match append_line(path, line) {
            Ok(bytes) => {
                info!("Evidence written to {} ({} bytes)", path.display(), bytes);
                AppendOutcome::Written {
                    path: path.clone(),
                    bytes,
                }
            }
            Err(e) => {
                warn!("Failed to write evidence to {}: {}", path.display(), e);
                AppendOutcome::Failed {
                    path: path.clone(),
                    error: e.to_string(),
                }
            }
        })
        .collect()
}

/// Inspect a single path for earlier evidence
pub fn inspect(path: &Path) -> EvidenceCheck {
    let unreadable = |e: std::io::Error| EvidenceCheck::Unreadable {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return EvidenceCheck::Absent {
                path: path.to_path_buf(),
            }
        }
        Err(e) => return unreadable(e),
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => return unreadable(e),
    };

    let mut lines = 0;
    for chunk in BufReader::new(file).split(b'\n') {
        if let Err(e) = chunk {
            return unreadable(e);
        }
        lines += 1;
    }

    EvidenceCheck::Present {
        path: path.to_path_buf(),
        size_bytes: metadata.len(),
        lines,
    }
}

/// Inspect every path, one result per path in input order
pub fn inspect_all(paths: &[PathBuf]) -> Vec<EvidenceCheck> {
    paths
        .iter()
        .map(|path| {
            let check = inspect(path);
            match &check {
                EvidenceCheck::Present {
                    size_bytes, lines, ..
                } => info!(
                    "Existing evidence at {}: {} bytes, {} lines",
                    path.display(),
                    size_bytes,
                    lines
                ),
                EvidenceCheck::Absent { .. } => {
                    info!("No existing evidence at {}", path.display())
                }
                EvidenceCheck::Unreadable { error, .. } => {
                    warn!("Failed to read evidence at {}: {}", path.display(), error)
                }
            }
            check
        })
        .collect()
}
