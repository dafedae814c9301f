use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::SearchLimits;
use crate::error::{FsError, FsResult};
use crate::fs::listing::{Entry, EntryKind};

/// An entry found below the walk root.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub entry: Entry,
    /// Path relative to the walk root, including the entry's own name.
    pub relative: PathBuf,
}

/// Everything one walk collected.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub entries: Vec<WalkEntry>,
    /// The scan cap was hit before the subtree was exhausted.
    pub truncated: bool,
    /// Subdirectories that could not be read.
    pub unreadable: usize,
}

/// Breadth-first walk of the subtree under `root`.
///
/// `limits.max_depth` is the number of directory levels descended below
/// the root (0 lists the root's children only). Directories are entered at
/// most once by canonical path, so symlink cycles terminate. Hidden entries
/// are skipped (and not descended into) unless `show_hidden` is set.
pub fn walk(root: &Path, limits: &SearchLimits, show_hidden: bool) -> FsResult<WalkOutcome> {
    let mut outcome = WalkOutcome::default();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut queue: VecDeque<(PathBuf, PathBuf, usize)> = VecDeque::new();

    let real_root = fs::canonicalize(root).map_err(|e| FsError::from_io(root, e))?;
    visited.insert(real_root);
    queue.push_back((root.to_path_buf(), PathBuf::new(), 0));

    while let Some((dir, relative, depth)) = queue.pop_front() {
        let read = match fs::read_dir(&dir) {
            Ok(r) => r,
            Err(e) if depth == 0 => return Err(FsError::from_io(&dir, e)),
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "walk skipped unreadable directory");
                outcome.unreadable += 1;
                continue;
            }
        };

        let mut children: Vec<(PathBuf, Entry)> = read
            .filter_map(|dirent| dirent.ok())
            .filter_map(|dirent| {
                let name = dirent.file_name().to_string_lossy().to_string();
                let meta = fs::symlink_metadata(dirent.path()).ok()?;
                Some((dirent.path(), Entry::from_metadata(name, &meta)))
            })
            .filter(|(_, entry)| show_hidden || !entry.is_hidden)
            .collect();
        children.sort_by(|a, b| a.1.name.cmp(&b.1.name));

        for (path, entry) in children {
            if outcome.entries.len() >= limits.max_scanned {
                outcome.truncated = true;
                debug!(root = %root.display(), cap = limits.max_scanned, "walk hit scan cap");
                return Ok(outcome);
            }

            let child_relative = relative.join(&entry.name);
            if depth < limits.max_depth && descends(&path, entry.kind, limits.follow_symlinks) {
                match fs::canonicalize(&path) {
                    Ok(real) => {
                        if visited.insert(real) {
                            queue.push_back((path.clone(), child_relative.clone(), depth + 1));
                        } else {
                            debug!(path = %path.display(), "walk skipped already-visited directory");
                        }
                    }
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "walk could not resolve directory");
                        outcome.unreadable += 1;
                    }
                }
            }

            outcome.entries.push(WalkEntry {
                entry,
                relative: child_relative,
            });
        }
    }

    debug!(
        root = %root.display(),
        found = outcome.entries.len(),
        unreadable = outcome.unreadable,
        "walk finished"
    );
    Ok(outcome)
}

fn descends(path: &Path, kind: EntryKind, follow_symlinks: bool) -> bool {
    match kind {
        EntryKind::Directory => true,
        EntryKind::Symlink if follow_symlinks => fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn limits(max_depth: usize) -> SearchLimits {
        SearchLimits {
            max_depth,
            ..SearchLimits::default()
        }
    }

    fn relatives(outcome: &WalkOutcome) -> Vec<String> {
        outcome
            .entries
            .iter()
            .map(|w| w.relative.to_string_lossy().to_string())
            .collect()
    }

    fn setup_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a").join("b").join("c")).unwrap();
        fs::write(dir.path().join("top.txt"), "").unwrap();
        fs::write(dir.path().join("a").join("mid.txt"), "").unwrap();
        fs::write(dir.path().join("a").join("b").join("deep.txt"), "").unwrap();
        fs::write(dir.path().join("a").join("b").join("c").join("deeper.txt"), "").unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git").join("HEAD"), "").unwrap();
        dir
    }

    #[test]
    fn walk_is_breadth_first() {
        let dir = setup_tree();
        let out = walk(dir.path(), &limits(10), false).unwrap();
        let rels = relatives(&out);
        let top = rels.iter().position(|r| r == "top.txt").unwrap();
        let mid = rels.iter().position(|r| r == "a/mid.txt").unwrap();
        let deep = rels.iter().position(|r| r == "a/b/deep.txt").unwrap();
        assert!(top < mid && mid < deep);
        assert!(!out.truncated);
    }

    #[test]
    fn walk_respects_depth() {
        let dir = setup_tree();
        let out = walk(dir.path(), &limits(1), false).unwrap();
        let rels = relatives(&out);
        assert!(rels.contains(&"a/mid.txt".to_string()));
        assert!(rels.contains(&"a/b".to_string()));
        assert!(!rels.contains(&"a/b/deep.txt".to_string()));

        let shallow = walk(dir.path(), &limits(0), false).unwrap();
        assert_eq!(relatives(&shallow), vec!["a", "top.txt"]);
    }

    #[test]
    fn walk_skips_hidden_unless_enabled() {
        let dir = setup_tree();
        let out = walk(dir.path(), &limits(3), false).unwrap();
        assert!(!relatives(&out).iter().any(|r| r.starts_with(".git")));

        let out = walk(dir.path(), &limits(3), true).unwrap();
        assert!(relatives(&out).contains(&".git/HEAD".to_string()));
    }

    #[test]
    fn walk_stops_at_scan_cap() {
        let dir = setup_tree();
        let capped = SearchLimits {
            max_depth: 10,
            max_scanned: 2,
            ..SearchLimits::default()
        };
        let out = walk(dir.path(), &capped, false).unwrap();
        assert_eq!(out.entries.len(), 2);
        assert!(out.truncated);
    }

    #[test]
    fn walk_missing_root_is_error() {
        let dir = setup_tree();
        assert!(matches!(
            walk(&dir.path().join("missing"), &limits(3), false),
            Err(FsError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn walk_terminates_on_symlink_cycle() {
        let dir = setup_tree();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("a").join("loop")).unwrap();
        let out = walk(dir.path(), &limits(50), false).unwrap();
        let rels = relatives(&out);
        assert!(rels.contains(&"a/loop".to_string()));
        assert!(!rels.iter().any(|r| r.starts_with("a/loop/")));
    }
}
