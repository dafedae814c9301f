use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type for every filesystem-facing operation of the explorer core.
pub type FsResult<T> = std::result::Result<T, FsError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from terminal setup or log files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Logging or configuration setup failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The starting directory could not be listed.
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// Failure kinds surfaced by directory loads, walks and file operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The selected entry was removed or replaced after it was selected.
    #[error("{} changed on disk since it was selected", .0.display())]
    StaleTarget(PathBuf),

    #[error("I/O failure on {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an `io::Error` raised while touching `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => FsError::AccessDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(
                path.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string()),
            ),
            _ => FsError::IoFailure {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Short text for the status bar.
    pub fn notice(&self) -> String {
        match self {
            FsError::NotFound(p) => format!("Not found: {}", display_name(p)),
            FsError::AccessDenied(p) => format!("Permission denied: {}", display_name(p)),
            FsError::AlreadyExists(name) => format!("'{}' already exists", name),
            FsError::InvalidName(reason) => format!("Invalid name: {}", reason),
            FsError::StaleTarget(p) => {
                format!("{} changed on disk, operation skipped", display_name(p))
            }
            FsError::IoFailure { path, source } => {
                format!("Error on {}: {}", display_name(path), source)
            }
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
