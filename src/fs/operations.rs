use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{FsError, FsResult};
use crate::fs::listing::{DirectoryListing, Entry, EntryKind, FileId};

/// An entry captured when the user picked it, re-checked before mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path: PathBuf,
    pub name: String,
    pub kind: EntryKind,
    file_id: Option<FileId>,
}

impl Target {
    pub fn from_entry(dir: &Path, entry: &Entry) -> Self {
        Self {
            path: dir.join(&entry.name),
            name: entry.name.clone(),
            kind: entry.kind,
            file_id: entry.file_id,
        }
    }

    /// Fail with `StaleTarget` if the entry vanished or was replaced.
    pub fn verify(&self) -> FsResult<()> {
        let meta = match fs::symlink_metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FsError::StaleTarget(self.path.clone()));
            }
            Err(e) => return Err(FsError::from_io(&self.path, e)),
        };
        let current = Entry::from_metadata(self.name.clone(), &meta);
        if current.kind != self.kind {
            return Err(FsError::StaleTarget(self.path.clone()));
        }
        match (self.file_id, current.file_id) {
            (Some(then), Some(now)) if then != now => Err(FsError::StaleTarget(self.path.clone())),
            _ => Ok(()),
        }
    }

    pub fn parent(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("/"))
    }
}

/// Check a proposed entry name against the listing it will land in.
///
/// `exclude` names the entry being renamed, which may keep its own name.
/// Returns the trimmed name.
pub fn validate_name(
    raw: &str,
    listing: &DirectoryListing,
    exclude: Option<&str>,
) -> FsResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FsError::InvalidName("name is empty".into()));
    }
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(FsError::InvalidName("name contains a path separator".into()));
    }
    if name == "." || name == ".." {
        return Err(FsError::InvalidName(format!("'{}' is reserved", name)));
    }
    if name.contains('\0') {
        return Err(FsError::InvalidName("name contains a NUL byte".into()));
    }
    if exclude != Some(name) && listing.contains_name(name) {
        return Err(FsError::AlreadyExists(name.to_string()));
    }
    Ok(name.to_string())
}

/// Create an empty file. Never truncates an existing file.
pub fn create_file(dir: &Path, name: &str) -> FsResult<PathBuf> {
    let path = dir.join(name);
    let result = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path);
    match result {
        Ok(_) => {
            info!(path = %path.display(), "created file");
            Ok(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "create file failed");
            Err(FsError::from_io(&path, e))
        }
    }
}

/// Create a new directory.
pub fn create_dir(dir: &Path, name: &str) -> FsResult<PathBuf> {
    let path = dir.join(name);
    match fs::create_dir(&path) {
        Ok(()) => {
            info!(path = %path.display(), "created directory");
            Ok(path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "create directory failed");
            Err(FsError::from_io(&path, e))
        }
    }
}

/// Rename `target` within its directory. Refuses to overwrite.
pub fn rename(target: &Target, new_name: &str) -> FsResult<PathBuf> {
    target.verify()?;
    let dest = target.parent().join(new_name);
    if dest != target.path && fs::symlink_metadata(&dest).is_ok() {
        return Err(FsError::AlreadyExists(new_name.to_string()));
    }
    match fs::rename(&target.path, &dest) {
        Ok(()) => {
            info!(from = %target.path.display(), to = %dest.display(), "renamed");
            Ok(dest)
        }
        Err(e) => {
            warn!(path = %target.path.display(), error = %e, "rename failed");
            Err(FsError::from_io(&target.path, e))
        }
    }
}

/// Delete `target`. Directories are removed recursively; symlinks are
/// removed themselves, never their destination.
pub fn delete(target: &Target) -> FsResult<()> {
    target.verify()?;
    let result = match target.kind {
        EntryKind::Directory => fs::remove_dir_all(&target.path),
        EntryKind::File | EntryKind::Symlink => fs::remove_file(&target.path),
    };
    match result {
        Ok(()) => {
            info!(path = %target.path.display(), "deleted");
            Ok(())
        }
        Err(e) => {
            warn!(path = %target.path.display(), error = %e, "delete failed");
            Err(FsError::from_io(&target.path, e))
        }
    }
}
