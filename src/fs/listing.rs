use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::config::Preferences;
use crate::error::{FsError, FsResult};

/// Type of filesystem entry. Symlinks are classified without following them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    fn from_metadata(metadata: &Metadata) -> Self {
        let ft = metadata.file_type();
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::File => "File",
            EntryKind::Directory => "Directory",
            EntryKind::Symlink => "Symlink",
        }
    }
}

/// One direct child of a directory with cached metadata.
///
/// Equality is by `(name, kind)`; metadata is ignored.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_hidden: bool,
    /// Unix mode bits (synthesized from the read-only flag elsewhere).
    pub permissions: u32,
    /// Device/inode pair where the platform provides one.
    pub file_id: Option<FileId>,
}

/// Identity of the underlying filesystem object, used to notice that an
/// entry was replaced behind our back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    pub dev: u64,
    pub ino: u64,
}

impl FileId {
    #[cfg(unix)]
    pub fn of(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn of(_metadata: &Metadata) -> Option<Self> {
        None
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for Entry {}

impl Entry {
    /// Stat `path` without following a final symlink.
    pub fn from_path(path: &Path) -> FsResult<Self> {
        let metadata = fs::symlink_metadata(path).map_err(|e| FsError::from_io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self::from_metadata(name, &metadata))
    }

    pub fn from_metadata(name: String, metadata: &Metadata) -> Self {
        let is_hidden = is_hidden_name(&name);
        Self {
            kind: EntryKind::from_metadata(metadata),
            size: metadata.len(),
            modified: metadata.modified().ok(),
            permissions: permission_bits(metadata),
            file_id: FileId::of(metadata),
            is_hidden,
            name,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Dot-prefixed names are hidden.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Sort criteria for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    /// Alphabetical (case-insensitive), default.
    Name,
    /// By file size (largest first).
    Size,
    /// By modification time (newest first).
    Modified,
}

impl SortBy {
    /// Parse sort_by from config string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "size" => SortBy::Size,
            "modified" => SortBy::Modified,
            _ => SortBy::Name,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Name => "Name",
            SortBy::Size => "Size",
            SortBy::Modified => "Modified",
        }
    }

    /// Cycle to the next sort option.
    pub fn next(&self) -> Self {
        match self {
            SortBy::Name => SortBy::Size,
            SortBy::Size => SortBy::Modified,
            SortBy::Modified => SortBy::Name,
        }
    }
}

/// Listing comparator. Always a total order: ties fall back to the
/// case-insensitive name and then the exact name.
pub fn compare_entries(a: &Entry, b: &Entry, sort_by: SortBy, dirs_first: bool) -> Ordering {
    let mut cmp = Ordering::Equal;

    if dirs_first {
        cmp = b.is_dir().cmp(&a.is_dir());
    }

    cmp.then_with(|| match sort_by {
        SortBy::Name => Ordering::Equal,
        SortBy::Size => b.size.cmp(&a.size),
        SortBy::Modified => b.modified.cmp(&a.modified),
    })
    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    .then_with(|| a.name.cmp(&b.name))
}

/// Immutable snapshot of one directory's direct children.
#[derive(Debug, Clone)]
pub struct DirectoryListing {
    pub path: PathBuf,
    pub entries: Vec<Entry>,
    pub generation: u64,
}

impl DirectoryListing {
    /// Read the direct children of `path` and sort them.
    ///
    /// Hidden entries are always collected. Children that vanish between
    /// `read_dir` and `stat` are skipped.
    pub fn load(path: &Path, prefs: &Preferences, generation: u64) -> FsResult<Self> {
        let read = fs::read_dir(path).map_err(|e| FsError::from_io(path, e))?;

        let mut entries = Vec::new();
        for dirent in read {
            let dirent = match dirent {
                Ok(d) => d,
                Err(e) => {
                    warn!(dir = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let name = dirent.file_name().to_string_lossy().to_string();
            match fs::symlink_metadata(dirent.path()) {
                Ok(meta) => entries.push(Entry::from_metadata(name, &meta)),
                Err(e) => debug!(entry = %name, error = %e, "entry vanished during load"),
            }
        }

        entries.sort_by(|a, b| compare_entries(a, b, prefs.sort_by, prefs.dirs_first));
        debug!(dir = %path.display(), count = entries.len(), generation, "listing loaded");

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            generation,
        })
    }

    /// Same entries under a new sort preference, without touching the disk.
    pub fn resorted(&self, prefs: &Preferences, generation: u64) -> Self {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| compare_entries(a, b, prefs.sort_by, prefs.dirs_first));
        Self {
            path: self.path.clone(),
            entries,
            generation,
        }
    }

    /// Indices of entries that are visible under the hidden-files toggle.
    pub fn visible_indices(&self, show_hidden: bool) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| show_hidden || !e.is_hidden)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn hidden_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_hidden).count()
    }

    pub fn entry_path(&self, entry: &Entry) -> PathBuf {
        self.path.join(&entry.name)
    }
}

const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Directory cache keyed by path. A rebuild replaces the slot with a new
/// generation; readers hold an `Arc` to the snapshot they were given.
#[derive(Debug)]
pub struct ListingCache {
    slots: HashMap<PathBuf, Arc<DirectoryListing>>,
    next_generation: u64,
    capacity: usize,
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ListingCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            next_generation: 1,
            capacity: capacity.max(1),
        }
    }

    /// Read `path` from disk and replace its slot. On failure the slot
    /// (and any previous snapshot) is left untouched.
    pub fn load(&mut self, path: &Path, prefs: &Preferences) -> FsResult<Arc<DirectoryListing>> {
        let generation = self.bump();
        let listing = DirectoryListing::load(path, prefs, generation)?;
        Ok(self.store(listing))
    }

    /// Re-sort the cached snapshot for `path` under new preferences.
    pub fn resort(&mut self, path: &Path, prefs: &Preferences) -> Option<Arc<DirectoryListing>> {
        let current = self.slots.get(path)?.clone();
        let generation = self.bump();
        Some(self.store(current.resorted(prefs, generation)))
    }

    #[cfg(test)]
    pub fn get(&self, path: &Path) -> Option<Arc<DirectoryListing>> {
        self.slots.get(path).cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    fn store(&mut self, listing: DirectoryListing) -> Arc<DirectoryListing> {
        let listing = Arc::new(listing);
        self.slots.insert(listing.path.clone(), listing.clone());

        while self.slots.len() > self.capacity {
            let oldest = self
                .slots
                .iter()
                .filter(|(p, _)| **p != listing.path)
                .min_by_key(|(_, l)| l.generation)
                .map(|(p, _)| p.clone());
            match oldest {
                Some(p) => {
                    self.slots.remove(&p);
                }
                None => break,
            }
        }
        listing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::create_dir(dir.path().join("Beta")).unwrap();
        File::create(dir.path().join("file_a.txt")).unwrap();
        File::create(dir.path().join("File_b.rs")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        dir
    }

    fn names(listing: &DirectoryListing) -> Vec<&str> {
        listing.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn entry_from_path_file() {
        let dir = setup_test_dir();
        let entry = Entry::from_path(&dir.path().join("file_a.txt")).unwrap();
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.name, "file_a.txt");
        assert!(!entry.is_hidden);
    }

    #[test]
    fn entry_from_path_missing_is_not_found() {
        let dir = setup_test_dir();
        let err = Entry::from_path(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[test]
    fn entry_equality_ignores_metadata() {
        let dir = setup_test_dir();
        let a = Entry::from_path(&dir.path().join("file_a.txt")).unwrap();
        let mut b = a.clone();
        b.size = 999;
        assert_eq!(a, b);
        b.kind = EntryKind::Directory;
        assert_ne!(a, b);
    }

    #[test]
    fn load_collects_hidden_and_sorts_dirs_first() {
        let dir = setup_test_dir();
        let listing = DirectoryListing::load(dir.path(), &Preferences::default(), 1).unwrap();
        assert_eq!(
            names(&listing),
            vec!["alpha", "Beta", ".hidden", "file_a.txt", "File_b.rs"]
        );
        assert!(listing.entries[2].is_hidden);
        assert_eq!(listing.hidden_count(), 1);
    }

    #[test]
    fn load_is_deterministic() {
        let dir = setup_test_dir();
        let prefs = Preferences::default();
        let first = DirectoryListing::load(dir.path(), &prefs, 1).unwrap();
        let second = DirectoryListing::load(dir.path(), &prefs, 2).unwrap();
        assert_eq!(names(&first), names(&second));
    }

    #[test]
    fn load_missing_dir_is_not_found() {
        let dir = setup_test_dir();
        let err = DirectoryListing::load(&dir.path().join("missing"), &Preferences::default(), 1)
            .unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_is_classified_without_following() {
        let dir = setup_test_dir();
        std::os::unix::fs::symlink(dir.path().join("alpha"), dir.path().join("link")).unwrap();
        let listing = DirectoryListing::load(dir.path(), &Preferences::default(), 1).unwrap();
        let link = &listing.entries[listing.position("link").unwrap()];
        assert_eq!(link.kind, EntryKind::Symlink);
    }

    #[test]
    fn visible_indices_respect_toggle() {
        let dir = setup_test_dir();
        let listing = DirectoryListing::load(dir.path(), &Preferences::default(), 1).unwrap();
        assert_eq!(listing.visible_indices(false).len(), 4);
        assert_eq!(listing.visible_indices(true).len(), 5);
    }

    #[test]
    fn sort_by_size_breaks_ties_by_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "12").unwrap();
        fs::write(dir.path().join("a.txt"), "12").unwrap();
        fs::write(dir.path().join("big.txt"), "123456789").unwrap();
        let prefs = Preferences {
            sort_by: SortBy::Size,
            ..Preferences::default()
        };
        let listing = DirectoryListing::load(dir.path(), &prefs, 1).unwrap();
        assert_eq!(names(&listing), vec!["big.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn resorted_keeps_entries_and_changes_order() {
        let dir = setup_test_dir();
        let listing = DirectoryListing::load(dir.path(), &Preferences::default(), 1).unwrap();
        let flat = Preferences {
            dirs_first: false,
            ..Preferences::default()
        };
        let resorted = listing.resorted(&flat, 2);
        assert_eq!(resorted.generation, 2);
        assert_eq!(resorted.entries.len(), listing.entries.len());
        assert_eq!(
            names(&resorted),
            vec![".hidden", "alpha", "Beta", "file_a.txt", "File_b.rs"]
        );
    }

    #[test]
    fn cycle_sort_changes_mode() {
        assert_eq!(SortBy::Name.next(), SortBy::Size);
        assert_eq!(SortBy::Size.next(), SortBy::Modified);
        assert_eq!(SortBy::Modified.next(), SortBy::Name);
    }

    #[test]
    fn cache_generations_increase() {
        let dir = setup_test_dir();
        let mut cache = ListingCache::default();
        let prefs = Preferences::default();
        let first = cache.load(dir.path(), &prefs).unwrap();
        let second = cache.load(dir.path(), &prefs).unwrap();
        assert!(second.generation > first.generation);
        assert_eq!(cache.get(dir.path()).unwrap().generation, second.generation);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_failure_keeps_previous_snapshot() {
        let dir = setup_test_dir();
        let sub = dir.path().join("alpha");
        let mut cache = ListingCache::default();
        let prefs = Preferences::default();
        let before = cache.load(&sub, &prefs).unwrap();
        fs::remove_dir(&sub).unwrap();
        assert!(cache.load(&sub, &prefs).is_err());
        assert_eq!(cache.get(&sub).unwrap().generation, before.generation);
    }

    #[test]
    fn cache_evicts_oldest_slot() {
        let dir = setup_test_dir();
        let mut cache = ListingCache::new(1);
        let prefs = Preferences::default();
        cache.load(dir.path(), &prefs).unwrap();
        cache.load(&dir.path().join("alpha"), &prefs).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.get(dir.path()).is_none());
    }
}
