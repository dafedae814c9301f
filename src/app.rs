use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, Preferences, SearchLimits};
use crate::fs::listing::{DirectoryListing, Entry, EntryKind, ListingCache};
use crate::fs::operations::{self, Target};
use crate::nav::cursor::SelectionCursor;
use crate::nav::history::NavigationStack;
use crate::preview::{self, Preview, Property};
use crate::search::{SearchMatch, SearchMode, SearchState};
use crate::services::Services;

/// How long a status notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);
/// Rows moved per mouse wheel step.
pub const SCROLL_STEP: isize = 3;

// ── File operation state ─────────────────────────────────────────────────────

/// What a name prompt will do once confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePurpose {
    CreateFile,
    CreateDirectory,
    Rename { target: Target },
}

impl NamePurpose {
    pub fn title(&self) -> String {
        match self {
            NamePurpose::CreateFile => "New file".to_string(),
            NamePurpose::CreateDirectory => "New directory".to_string(),
            NamePurpose::Rename { target } => format!("Rename '{}'", target.name),
        }
    }
}

/// Text input for a new or changed entry name. `cursor` is a byte offset
/// that always sits on a char boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePrompt {
    pub purpose: NamePurpose,
    pub input: String,
    pub cursor: usize,
    /// Validation failure from the last confirm, cleared on edit.
    pub error: Option<String>,
}

impl NamePrompt {
    /// Rename prompts start with the current name.
    pub fn new(purpose: NamePurpose) -> Self {
        let input = match &purpose {
            NamePurpose::Rename { target } => target.name.clone(),
            _ => String::new(),
        };
        Self {
            cursor: input.len(),
            purpose,
            input,
            error: None,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        self.error = None;
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_back(&mut self) {
        if let Some(prev) = self.input[..self.cursor].chars().next_back() {
            self.cursor -= prev.len_utf8();
            self.input.remove(self.cursor);
            self.error = None;
        }
    }

    /// Delete the character under the cursor.
    pub fn delete_forward(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
            self.error = None;
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.input[..self.cursor].chars().next_back() {
            self.cursor -= prev.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.input[self.cursor..].chars().next() {
            self.cursor += next.len_utf8();
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.input.len();
    }
}

/// A file operation holding exclusive control of input until resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOperation {
    AwaitingName(NamePrompt),
    AwaitingDeleteConfirm { target: Target },
}

// ── Context menu ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    OpenDefault,
    OpenInEditor,
    Rename,
    Delete,
    CopyPath,
    Properties,
}

impl MenuAction {
    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::OpenDefault => "Open with default app",
            MenuAction::OpenInEditor => "Open in editor",
            MenuAction::Rename => "Rename",
            MenuAction::Delete => "Delete",
            MenuAction::CopyPath => "Copy path",
            MenuAction::Properties => "Properties",
        }
    }
}

/// Menu entries in display order; digits 1-6 pick them directly.
pub const MENU_ACTIONS: [MenuAction; 6] = [
    MenuAction::OpenDefault,
    MenuAction::OpenInEditor,
    MenuAction::Rename,
    MenuAction::Delete,
    MenuAction::CopyPath,
    MenuAction::Properties,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenu {
    pub target: Target,
    pub selected: usize,
}

// ── Dispatcher modes ─────────────────────────────────────────────────────────

/// Exactly one is active. Leaving `Searching` drops the search state.
pub enum Mode {
    Browsing,
    Searching(SearchState),
    FileOp(PendingOperation),
    ContextMenu(ContextMenu),
    Help,
    Properties(Vec<Property>),
}

/// Payload-free tag of [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Browsing,
    Searching,
    AwaitingName,
    AwaitingDeleteConfirm,
    ContextMenu,
    Help,
    Properties,
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Browsing => ModeKind::Browsing,
            Mode::Searching(_) => ModeKind::Searching,
            Mode::FileOp(PendingOperation::AwaitingName(_)) => ModeKind::AwaitingName,
            Mode::FileOp(PendingOperation::AwaitingDeleteConfirm { .. }) => {
                ModeKind::AwaitingDeleteConfirm
            }
            Mode::ContextMenu(_) => ModeKind::ContextMenu,
            Mode::Help => ModeKind::Help,
            Mode::Properties(_) => ModeKind::Properties,
        }
    }
}

// ── Notices and viewport ─────────────────────────────────────────────────────

/// Transient status line message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
    created: Instant,
}

impl Notice {
    pub fn new(text: String, is_error: bool) -> Self {
        Self {
            text,
            is_error,
            created: Instant::now(),
        }
    }

    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= NOTICE_TTL
    }
}

/// Where the renderer last drew the entry list, and its scroll offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub area: Rect,
    pub offset: usize,
}

impl Viewport {
    pub fn height(&self) -> usize {
        self.area.height as usize
    }

    /// Scroll just enough to keep `cursor` on screen.
    pub fn follow(&mut self, cursor: Option<usize>) {
        let height = self.height();
        match cursor {
            None => self.offset = 0,
            Some(_) if height == 0 => {}
            Some(i) if i < self.offset => self.offset = i,
            Some(i) if i >= self.offset + height => self.offset = i + 1 - height,
            Some(_) => {}
        }
    }

    /// Row index under a terminal cell, if the cell is inside the list.
    pub fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        let a = self.area;
        let inside = column >= a.x
            && column < a.x.saturating_add(a.width)
            && row >= a.y
            && row < a.y.saturating_add(a.height);
        inside.then(|| self.offset + (row - a.y) as usize)
    }
}

// ── Render intent ────────────────────────────────────────────────────────────

/// One displayed row.
#[derive(Debug, Clone)]
pub enum RowView {
    /// Index into `RenderIntent::listing.entries`.
    Listing(usize),
    Match(SearchMatch),
}

/// Mode-specific state the renderer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeView {
    Browsing,
    Searching {
        query: String,
        mode: SearchMode,
        matches: usize,
        truncated: bool,
    },
    Prompt {
        title: String,
        input: String,
        cursor: usize,
        error: Option<String>,
    },
    ConfirmDelete {
        name: String,
        kind: EntryKind,
    },
    ContextMenu {
        name: String,
        selected: usize,
    },
    Help,
    Properties {
        rows: Vec<Property>,
    },
}

/// What changed since the previous intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub listing_replaced: bool,
    pub cursor_moved: bool,
    pub mode_changed: bool,
    /// The terminal was handed to another program and must be repainted.
    pub full_redraw: bool,
}

/// Everything the renderer draws. The dispatcher never draws itself.
#[derive(Debug, Clone)]
pub struct RenderIntent {
    pub listing: Arc<DirectoryListing>,
    pub rows: Vec<RowView>,
    pub cursor: Option<usize>,
    pub scroll_offset: usize,
    pub view: ModeView,
    pub status: Option<Notice>,
    pub preview: Option<Arc<Preview>>,
    pub prefs: Preferences,
    /// Directories `go_back` can still return to.
    pub history: usize,
    pub changes: Changes,
    pub quit: bool,
}

/// State captured before an event, compared afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    generation: u64,
    cursor: Option<usize>,
    mode: ModeKind,
}

struct Selected {
    entry: Entry,
    path: PathBuf,
    /// Identity within the displayed rows: the name, or the relative path
    /// of a search match.
    key: PathBuf,
}

struct CachedPreview {
    path: PathBuf,
    generation: u64,
    preview: Arc<Preview>,
}

// ── App ──────────────────────────────────────────────────────────────────────

/// Main application state: the current listing, cursor, history and mode.
pub struct App {
    pub cwd: PathBuf,
    pub prefs: Preferences,
    pub cursor: SelectionCursor,
    pub mode: Mode,
    pub viewport: Viewport,
    pub should_quit: bool,
    listing: Arc<DirectoryListing>,
    cache: ListingCache,
    history: NavigationStack,
    limits: SearchLimits,
    services: Services,
    notice: Option<Notice>,
    last_click: Option<(usize, Instant)>,
    double_click: Duration,
    preview_cache: Option<CachedPreview>,
    redraw: bool,
}

impl App {
    /// Load `start` and begin browsing it.
    pub fn new(start: &Path, config: &AppConfig, services: Services) -> crate::error::FsResult<Self> {
        let prefs = config.preferences();
        let mut cache = ListingCache::default();
        let listing = cache.load(start, &prefs)?;
        let visible = listing.visible_indices(prefs.show_hidden).len();
        info!(path = %listing.path.display(), entries = listing.entries.len(), "explorer started");

        Ok(Self {
            cwd: listing.path.clone(),
            cursor: SelectionCursor::new(visible),
            mode: Mode::Browsing,
            viewport: Viewport::default(),
            should_quit: false,
            listing,
            cache,
            history: NavigationStack::new(config.history_depth()),
            limits: config.search_limits(),
            services,
            notice: None,
            last_click: None,
            double_click: Duration::from_millis(config.double_click_ms()),
            preview_cache: None,
            redraw: false,
            prefs,
        })
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_modal(&self) -> bool {
        matches!(
            self.mode,
            Mode::FileOp(_) | Mode::ContextMenu(_) | Mode::Properties(_)
        )
    }

    pub fn quit(&mut self) {
        info!("quit requested");
        self.should_quit = true;
    }

    // ── Rows and selection ──────────────────────────────────────────────────

    fn visible_entries(&self) -> impl Iterator<Item = &Entry> {
        let show_hidden = self.prefs.show_hidden;
        self.listing
            .entries
            .iter()
            .filter(move |e| show_hidden || !e.is_hidden)
    }

    /// Number of rows currently displayed.
    pub fn row_count(&self) -> usize {
        match &self.mode {
            Mode::Searching(search) => search.matches.len(),
            _ => self.visible_entries().count(),
        }
    }

    fn find_row(&self, key: &Path) -> Option<usize> {
        match &self.mode {
            Mode::Searching(search) => search.matches.iter().position(|m| m.source_path == key),
            _ => {
                let name = key.to_str()?;
                self.visible_entries().position(|e| e.name == name)
            }
        }
    }

    fn selected(&self) -> Option<Selected> {
        let index = self.cursor.index()?;
        match &self.mode {
            Mode::Searching(search) => {
                let m = search.matches.get(index)?;
                Some(Selected {
                    entry: m.entry.clone(),
                    path: search.listing().path.join(&m.source_path),
                    key: m.source_path.clone(),
                })
            }
            _ => {
                let entry = self.visible_entries().nth(index)?;
                Some(Selected {
                    path: self.listing.entry_path(entry),
                    key: PathBuf::from(&entry.name),
                    entry: entry.clone(),
                })
            }
        }
    }

    #[cfg(test)]
    pub fn selected_name(&self) -> Option<String> {
        self.selected().map(|s| s.entry.name)
    }

    pub fn selected_path(&self) -> Option<PathBuf> {
        self.selected().map(|s| s.path)
    }

    fn selection_key(&self) -> Option<PathBuf> {
        self.selected().map(|s| s.key)
    }

    fn selected_target(&self) -> Option<Target> {
        let sel = self.selected()?;
        let dir = sel.path.parent().unwrap_or(&self.cwd).to_path_buf();
        Some(Target::from_entry(&dir, &sel.entry))
    }

    /// Re-clamp the cursor to the displayed rows, keeping `key` selected
    /// when it is still there.
    fn rebind(&mut self, key: Option<&Path>) {
        let len = self.row_count();
        let found = key.and_then(|k| self.find_row(k));
        self.cursor.rebind(len, found);
        self.viewport.follow(self.cursor.index());
    }

    // ── Movement ────────────────────────────────────────────────────────────

    pub fn move_cursor(&mut self, delta: isize) {
        match delta {
            1 => self.cursor.move_down(),
            -1 => self.cursor.move_up(),
            _ => self.cursor.move_by(delta),
        }
        self.viewport.follow(self.cursor.index());
    }

    pub fn cursor_first(&mut self) {
        self.cursor.first();
        self.viewport.follow(self.cursor.index());
    }

    pub fn cursor_last(&mut self) {
        self.cursor.last();
        self.viewport.follow(self.cursor.index());
    }

    /// Rows per PageUp/PageDown.
    pub fn page_size(&self) -> isize {
        self.viewport.height().max(1) as isize
    }

    pub fn select_row(&mut self, row: usize) {
        self.cursor.set_to(row);
        self.viewport.follow(self.cursor.index());
    }

    /// Record where the renderer drew the list.
    pub fn set_list_area(&mut self, area: Rect) {
        self.viewport.area = area;
        self.viewport.follow(self.cursor.index());
    }

    /// Displayed row under a terminal cell.
    pub fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        self.viewport
            .row_at(column, row)
            .filter(|r| *r < self.row_count())
    }

    /// Select `row`; returns true when this completes a double click.
    pub fn click_row(&mut self, row: usize, now: Instant) -> bool {
        self.select_row(row);
        let double = matches!(
            self.last_click,
            Some((last, at)) if last == row && now.saturating_duration_since(at) <= self.double_click
        );
        self.last_click = if double { None } else { Some((row, now)) };
        double
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    fn install_listing(&mut self, listing: Arc<DirectoryListing>, key: Option<PathBuf>) {
        if listing.path != self.cwd {
            self.viewport.offset = 0;
            self.last_click = None;
        }
        self.cwd = listing.path.clone();
        self.listing = listing;
        self.rebind(key.as_deref());
    }

    /// Load `path`, pushing the current directory. On failure the history
    /// is left untouched and a notice is shown.
    fn navigate_to(&mut self, path: PathBuf, select: Option<String>) -> bool {
        self.leave_search();
        let cache = &mut self.cache;
        let prefs = &self.prefs;
        match self.history.transition(&self.cwd, || cache.load(&path, prefs)) {
            Ok(listing) => {
                debug!(from = %self.cwd.display(), to = %path.display(), "entered directory");
                self.install_listing(listing, select.map(PathBuf::from));
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot enter directory");
                self.notify_error(e.notice());
                false
            }
        }
    }

    /// Activate the selected row: enter directories, edit files. In search
    /// mode the row's directory is opened with the row selected.
    pub fn activate(&mut self) {
        let Some(sel) = self.selected() else {
            return;
        };
        let is_dir = leads_to_dir(&sel.entry, &sel.path);
        if matches!(self.mode, Mode::Searching(_)) {
            if is_dir {
                self.navigate_to(sel.path, None);
                return;
            }
            let parent = sel.path.parent().map(Path::to_path_buf);
            match parent {
                Some(dir) if dir != self.cwd => {
                    self.navigate_to(dir, Some(sel.entry.name));
                }
                _ => self.end_search_selecting(Some(PathBuf::from(sel.entry.name))),
            }
        } else if is_dir {
            self.navigate_to(sel.path, None);
        } else {
            self.edit_path(sel.path);
        }
    }

    /// Enter the selected row if it is a directory; double click on a file
    /// opens it with the system default.
    pub fn activate_by_click(&mut self) {
        match self.selected() {
            Some(sel) if !leads_to_dir(&sel.entry, &sel.path) && !matches!(self.mode, Mode::Searching(_)) => {
                self.open_default_path(&sel.path)
            }
            Some(_) => self.activate(),
            None => {}
        }
    }

    /// Return to the previous directory; a no-op with no history.
    pub fn go_back(&mut self) {
        let Some(previous) = self.history.pop() else {
            debug!("history empty, go back ignored");
            return;
        };
        self.leave_search();
        match self.cache.load(&previous, &self.prefs) {
            Ok(listing) => {
                let select = child_toward(&previous, &self.cwd);
                debug!(to = %previous.display(), "went back");
                self.install_listing(listing, select);
            }
            Err(e) => {
                warn!(path = %previous.display(), error = %e, "history entry unreadable");
                self.notify_error(format!("{} (removed from history)", e.notice()));
            }
        }
    }

    pub fn go_parent(&mut self) {
        let Some(parent) = self.cwd.parent().map(Path::to_path_buf) else {
            return;
        };
        let name = self.cwd.file_name().map(|n| n.to_string_lossy().to_string());
        self.navigate_to(parent, name);
    }

    /// Re-read the current directory, keeping `key` selected if possible.
    /// On failure the previous listing stays.
    fn rebuild(&mut self, key: Option<PathBuf>) -> bool {
        match self.cache.load(&self.cwd, &self.prefs) {
            Ok(listing) => {
                self.install_listing(listing, key);
                true
            }
            Err(e) => {
                warn!(path = %self.cwd.display(), error = %e, "rebuild failed");
                self.notify_error(e.notice());
                false
            }
        }
    }

    pub fn refresh(&mut self) {
        let key = self.selection_key();
        if self.rebuild(key) {
            self.notify("Refreshed".to_string());
        }
    }

    pub fn toggle_hidden(&mut self) {
        let key = self.selection_key();
        self.prefs.show_hidden = !self.prefs.show_hidden;
        self.rebind(key.as_deref());
        self.notify(if self.prefs.show_hidden {
            "Showing hidden files".to_string()
        } else {
            "Hiding hidden files".to_string()
        });
    }

    fn resort(&mut self) {
        let key = self.selection_key();
        if let Some(listing) = self.cache.resort(&self.cwd, &self.prefs) {
            self.listing = listing;
        }
        self.rebind(key.as_deref());
    }

    pub fn cycle_sort(&mut self) {
        self.prefs.sort_by = self.prefs.sort_by.next();
        self.resort();
        self.notify(format!("Sort: {}", self.prefs.sort_by.label()));
    }

    pub fn toggle_dirs_first(&mut self) {
        self.prefs.dirs_first = !self.prefs.dirs_first;
        self.resort();
        self.notify(if self.prefs.dirs_first {
            "Directories first".to_string()
        } else {
            "Directories mixed with files".to_string()
        });
    }

    // ── Search ──────────────────────────────────────────────────────────────

    pub fn begin_search(&mut self, mode: SearchMode) {
        let key = self.selection_key();
        let state = SearchState::begin(mode, self.listing.clone(), self.prefs.clone(), self.limits);
        debug!(?mode, "entering search");
        self.mode = Mode::Searching(state);
        self.rebind(key.as_deref());
    }

    /// Apply `edit` to the query and recompute matches. The cursor moves to
    /// the best match.
    pub fn edit_query(&mut self, edit: impl FnOnce(&mut String)) {
        let Mode::Searching(search) = &mut self.mode else {
            return;
        };
        let mut query = search.query.clone();
        edit(&mut query);
        if query == search.query {
            return;
        }
        let result = search.update_query(&query).map(|m| m.len());
        self.after_search_update(result);
    }

    pub fn toggle_search_mode(&mut self) {
        let Mode::Searching(search) = &mut self.mode else {
            return;
        };
        let next = search.mode.toggled();
        let result = search.set_mode(next).map(|m| m.len());
        self.after_search_update(result);
    }

    fn after_search_update(&mut self, result: crate::error::FsResult<usize>) {
        match result {
            Ok(len) => {
                self.cursor.rebind(len, None);
                self.viewport.follow(self.cursor.index());
            }
            Err(e) => {
                warn!(error = %e, "search failed");
                self.notify_error(e.notice());
                self.leave_search();
            }
        }
    }

    /// Exit search, keeping the selected entry if it lives in this listing.
    pub fn end_search(&mut self) {
        let key = self.selection_key();
        self.end_search_selecting(key);
    }

    fn end_search_selecting(&mut self, key: Option<PathBuf>) {
        if matches!(self.mode, Mode::Searching(_)) {
            debug!("leaving search");
            self.mode = Mode::Browsing;
            self.rebind(key.as_deref());
        }
    }

    fn leave_search(&mut self) {
        self.end_search();
    }

    // ── File operations ─────────────────────────────────────────────────────

    pub fn start_create(&mut self, directory: bool) {
        let purpose = if directory {
            NamePurpose::CreateDirectory
        } else {
            NamePurpose::CreateFile
        };
        self.mode = Mode::FileOp(PendingOperation::AwaitingName(NamePrompt::new(purpose)));
    }

    pub fn start_rename(&mut self) {
        if let Some(target) = self.selected_target() {
            self.start_rename_for(target);
        }
    }

    fn start_rename_for(&mut self, target: Target) {
        self.mode = Mode::FileOp(PendingOperation::AwaitingName(NamePrompt::new(
            NamePurpose::Rename { target },
        )));
    }

    pub fn start_delete(&mut self) {
        if let Some(target) = self.selected_target() {
            self.mode = Mode::FileOp(PendingOperation::AwaitingDeleteConfirm { target });
        }
    }

    pub fn prompt_mut(&mut self) -> Option<&mut NamePrompt> {
        match &mut self.mode {
            Mode::FileOp(PendingOperation::AwaitingName(prompt)) => Some(prompt),
            _ => None,
        }
    }

    /// Leave any modal state without side effects.
    pub fn cancel(&mut self) {
        debug!(mode = ?self.mode.kind(), "cancelled");
        self.mode = Mode::Browsing;
    }

    /// Validate and execute the name prompt. A rejected name keeps the
    /// prompt open with an inline error.
    pub fn confirm_prompt(&mut self) {
        let Mode::FileOp(PendingOperation::AwaitingName(prompt)) = &mut self.mode else {
            return;
        };
        let exclude = match &prompt.purpose {
            NamePurpose::Rename { target } => Some(target.name.as_str()),
            _ => None,
        };
        let name = match operations::validate_name(&prompt.input, &self.listing, exclude) {
            Ok(name) => name,
            Err(e) => {
                debug!(error = %e, "name rejected");
                prompt.error = Some(e.notice());
                return;
            }
        };
        let purpose = prompt.purpose.clone();
        self.mode = Mode::Browsing;

        let fallback = self.selection_key();
        let (result, done) = match &purpose {
            NamePurpose::CreateFile => (
                operations::create_file(&self.cwd, &name).map(|_| ()),
                format!("Created file '{}'", name),
            ),
            NamePurpose::CreateDirectory => (
                operations::create_dir(&self.cwd, &name).map(|_| ()),
                format!("Created directory '{}'", name),
            ),
            NamePurpose::Rename { target } if target.name == name => return,
            NamePurpose::Rename { target } => (
                operations::rename(target, &name).map(|_| ()),
                format!("Renamed '{}' to '{}'", target.name, name),
            ),
        };

        match result {
            Ok(()) => {
                self.notify(done);
                self.rebuild(Some(PathBuf::from(&name)));
            }
            Err(e) => {
                self.notify_error(e.notice());
                self.rebuild(fallback);
            }
        }
    }

    /// Resolve the delete confirmation.
    pub fn confirm_delete(&mut self, affirm: bool) {
        let Mode::FileOp(PendingOperation::AwaitingDeleteConfirm { target }) = &self.mode else {
            return;
        };
        let target = target.clone();
        self.mode = Mode::Browsing;
        if !affirm {
            debug!(target = %target.name, "delete cancelled");
            return;
        }

        let neighbor = self.neighbor_of(&target.name);
        match operations::delete(&target) {
            Ok(()) => {
                self.notify(format!("Deleted '{}'", target.name));
                self.rebuild(neighbor);
            }
            Err(e) => {
                self.notify_error(e.notice());
                self.rebuild(Some(PathBuf::from(&target.name)));
            }
        }
    }

    /// Row to select once `name` is gone: the next one, or the previous one
    /// when `name` was last.
    fn neighbor_of(&self, name: &str) -> Option<PathBuf> {
        let names: Vec<&str> = self.visible_entries().map(|e| e.name.as_str()).collect();
        let i = names.iter().position(|n| *n == name)?;
        names
            .get(i + 1)
            .or_else(|| i.checked_sub(1).and_then(|p| names.get(p)))
            .map(PathBuf::from)
    }

    // ── Context menu ────────────────────────────────────────────────────────

    pub fn open_context_menu(&mut self) {
        if let Some(target) = self.selected_target() {
            self.mode = Mode::ContextMenu(ContextMenu {
                target,
                selected: 0,
            });
        }
    }

    pub fn menu_move(&mut self, delta: isize) {
        if let Mode::ContextMenu(menu) = &mut self.mode {
            let max = MENU_ACTIONS.len() as isize - 1;
            menu.selected = (menu.selected as isize + delta).clamp(0, max) as usize;
        }
    }

    /// Run menu entry `index`, or the highlighted one. Out-of-range digits
    /// are ignored.
    pub fn menu_choose(&mut self, index: Option<usize>) {
        let Mode::ContextMenu(menu) = &self.mode else {
            return;
        };
        let Some(action) = MENU_ACTIONS.get(index.unwrap_or(menu.selected)).copied() else {
            return;
        };
        let target = menu.target.clone();
        self.mode = Mode::Browsing;
        debug!(?action, target = %target.name, "menu action");

        match action {
            MenuAction::OpenDefault => self.open_default_path(&target.path),
            MenuAction::OpenInEditor => self.edit_path(target.path),
            MenuAction::Rename => self.start_rename_for(target),
            MenuAction::Delete => {
                self.mode = Mode::FileOp(PendingOperation::AwaitingDeleteConfirm { target })
            }
            MenuAction::CopyPath => self.copy_path_of(&target.path),
            MenuAction::Properties => self.show_properties_of(&target.path),
        }
    }

    // ── External collaborators ──────────────────────────────────────────────

    pub fn open_in_editor(&mut self) {
        if let Some(path) = self.selected_path() {
            self.edit_path(path);
        }
    }

    /// Blocking editor run; the listing is rebuilt afterwards since the file
    /// may have changed.
    fn edit_path(&mut self, path: PathBuf) {
        self.redraw = true;
        let key = self.selection_key();
        let result = self.services.editor.edit(&path);
        self.rebuild(key);
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "editor failed");
            self.notify_error(format!("Editor failed: {}", e));
        }
    }

    pub fn open_default(&mut self) {
        if let Some(path) = self.selected_path() {
            self.open_default_path(&path);
        }
    }

    fn open_default_path(&mut self, path: &Path) {
        match self.services.opener.open(path) {
            Ok(()) => self.notify(format!("Opened {}", display_name(path))),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "open failed");
                self.notify_error(format!("Cannot open {}: {}", display_name(path), e));
            }
        }
    }

    pub fn copy_path(&mut self) {
        if let Some(path) = self.selected_path() {
            self.copy_path_of(&path);
        }
    }

    fn copy_path_of(&mut self, path: &Path) {
        let text = path.display().to_string();
        match self.services.clipboard.copy(&text) {
            Ok(()) => self.notify(format!("Copied path: {}", text)),
            Err(e) => {
                warn!(error = %e, "clipboard failed");
                self.notify_error(format!("Clipboard unavailable: {}", e));
            }
        }
    }

    pub fn show_properties(&mut self) {
        if let Some(path) = self.selected_path() {
            self.show_properties_of(&path);
        }
    }

    fn show_properties_of(&mut self, path: &Path) {
        match preview::properties(path) {
            Ok(rows) => self.mode = Mode::Properties(rows),
            Err(e) => self.notify_error(e.notice()),
        }
    }

    pub fn toggle_help(&mut self) {
        self.mode = match self.mode {
            Mode::Help => Mode::Browsing,
            _ => Mode::Help,
        };
    }

    // ── Notices ─────────────────────────────────────────────────────────────

    pub fn notify(&mut self, text: String) {
        self.notice = Some(Notice::new(text, false));
    }

    pub fn notify_error(&mut self, text: String) {
        self.notice = Some(Notice::new(text, true));
    }

    /// Drop the notice once it has been shown for [`NOTICE_TTL`].
    pub fn tick(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| n.expired(now)) {
            self.notice = None;
        }
    }

    // ── Render intent ───────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.listing.generation,
            cursor: self.cursor.index(),
            mode: self.mode.kind(),
        }
    }

    fn current_preview(&mut self) -> Option<Arc<Preview>> {
        let provider = self.services.preview.as_ref()?;
        let sel = self.selected()?;
        if let Some(cached) = &self.preview_cache {
            if cached.path == sel.path && cached.generation == self.listing.generation {
                return Some(cached.preview.clone());
            }
        }
        let preview = Arc::new(provider.preview(&sel.path, &sel.entry, &self.prefs));
        self.preview_cache = Some(CachedPreview {
            path: sel.path,
            generation: self.listing.generation,
            preview: preview.clone(),
        });
        Some(preview)
    }

    fn mode_view(&self) -> ModeView {
        match &self.mode {
            Mode::Browsing => ModeView::Browsing,
            Mode::Searching(search) => ModeView::Searching {
                query: search.query.clone(),
                mode: search.mode,
                matches: search.matches.len(),
                truncated: search.truncated,
            },
            Mode::FileOp(PendingOperation::AwaitingName(prompt)) => ModeView::Prompt {
                title: prompt.purpose.title(),
                input: prompt.input.clone(),
                cursor: prompt.cursor,
                error: prompt.error.clone(),
            },
            Mode::FileOp(PendingOperation::AwaitingDeleteConfirm { target }) => {
                ModeView::ConfirmDelete {
                    name: target.name.clone(),
                    kind: target.kind,
                }
            }
            Mode::ContextMenu(menu) => ModeView::ContextMenu {
                name: menu.target.name.clone(),
                selected: menu.selected,
            },
            Mode::Help => ModeView::Help,
            Mode::Properties(rows) => ModeView::Properties { rows: rows.clone() },
        }
    }

    /// Describe the current state for the renderer. `before` is the state
    /// prior to the event just handled; `None` marks everything changed.
    pub fn render_intent(&mut self, before: Option<Snapshot>) -> RenderIntent {
        let changes = match before {
            Some(b) => Changes {
                listing_replaced: b.generation != self.listing.generation,
                cursor_moved: b.cursor != self.cursor.index(),
                mode_changed: b.mode != self.mode.kind(),
                full_redraw: self.redraw,
            },
            None => Changes {
                listing_replaced: true,
                cursor_moved: true,
                mode_changed: true,
                full_redraw: true,
            },
        };
        self.redraw = false;

        let rows = match &self.mode {
            Mode::Searching(search) => search.matches.iter().cloned().map(RowView::Match).collect(),
            _ => self
                .listing
                .visible_indices(self.prefs.show_hidden)
                .into_iter()
                .map(RowView::Listing)
                .collect(),
        };

        RenderIntent {
            preview: self.current_preview(),
            listing: self.listing.clone(),
            rows,
            cursor: self.cursor.index(),
            scroll_offset: self.viewport.offset,
            view: self.mode_view(),
            status: self.notice.clone(),
            prefs: self.prefs.clone(),
            history: self.history_len(),
            changes,
            quit: self.should_quit,
        }
    }
}

/// Directories, and symlinks that resolve to one.
fn leads_to_dir(entry: &Entry, path: &Path) -> bool {
    match entry.kind {
        EntryKind::Directory => true,
        EntryKind::Symlink => path.is_dir(),
        EntryKind::File => false,
    }
}

/// First component of `descendant` below `ancestor`, e.g. `b` for `/a` and
/// `/a/b/c`.
fn child_toward(ancestor: &Path, descendant: &Path) -> Option<PathBuf> {
    let rest = descendant.strip_prefix(ancestor).ok()?;
    rest.components()
        .next()
        .map(|c| PathBuf::from(c.as_os_str()))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fakes;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn setup_app() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        File::create(dir.path().join("file_a.txt")).unwrap();
        File::create(dir.path().join("file_b.rs")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        let (services, _) = fakes::services(true);
        let app = App::new(dir.path(), &AppConfig::default(), services).unwrap();
        (dir, app)
    }

    fn prompt(purpose: NamePurpose) -> NamePrompt {
        NamePrompt::new(purpose)
    }

    #[test]
    fn new_app_selects_first_visible_entry() {
        let (_dir, app) = setup_app();
        assert_eq!(app.row_count(), 4);
        assert_eq!(app.selected_name().as_deref(), Some("alpha"));
        assert!(matches!(app.mode, Mode::Browsing));
    }

    #[test]
    fn new_app_fails_on_missing_start() {
        let dir = TempDir::new().unwrap();
        let (services, _) = fakes::services(true);
        assert!(App::new(&dir.path().join("nope"), &AppConfig::default(), services).is_err());
    }

    #[test]
    fn prompt_insert_and_backspace() {
        let mut p = prompt(NamePurpose::CreateFile);
        p.insert_char('a');
        p.insert_char('b');
        p.insert_char('c');
        assert_eq!(p.input, "abc");
        assert_eq!(p.cursor, 3);
        p.delete_back();
        assert_eq!(p.input, "ab");
        assert_eq!(p.cursor, 2);
    }

    #[test]
    fn prompt_backspace_at_start_is_noop() {
        let mut p = prompt(NamePurpose::CreateDirectory);
        p.delete_back();
        assert!(p.input.is_empty());
        assert_eq!(p.cursor, 0);
    }

    #[test]
    fn prompt_cursor_moves_over_multibyte_chars() {
        let mut p = prompt(NamePurpose::CreateFile);
        p.insert_char('é');
        p.insert_char('x');
        p.move_left();
        assert_eq!(p.cursor, 2);
        p.move_left();
        assert_eq!(p.cursor, 0);
        p.move_left();
        assert_eq!(p.cursor, 0);
        p.delete_forward();
        assert_eq!(p.input, "x");
        p.end();
        p.move_right();
        assert_eq!(p.cursor, 1);
        p.home();
        assert_eq!(p.cursor, 0);
    }

    #[test]
    fn prompt_edit_clears_error() {
        let mut p = prompt(NamePurpose::CreateFile);
        p.error = Some("bad".into());
        p.insert_char('a');
        assert!(p.error.is_none());
    }

    #[test]
    fn rename_prompt_prefills_name() {
        let (_dir, mut app) = setup_app();
        app.cursor.set_to(2);
        app.start_rename();
        let p = app.prompt_mut().unwrap();
        assert_eq!(p.input, "file_a.txt");
        assert_eq!(p.cursor, 10);
    }

    #[test]
    fn notice_expires_after_ttl() {
        let (_dir, mut app) = setup_app();
        app.notify("hello".into());
        app.tick(Instant::now());
        assert!(app.notice().is_some());
        app.tick(Instant::now() + NOTICE_TTL + Duration::from_millis(10));
        assert!(app.notice().is_none());
    }

    #[test]
    fn viewport_follows_cursor() {
        let mut vp = Viewport {
            area: Rect::new(0, 1, 20, 3),
            offset: 0,
        };
        vp.follow(Some(5));
        assert_eq!(vp.offset, 3);
        vp.follow(Some(1));
        assert_eq!(vp.offset, 1);
        vp.follow(None);
        assert_eq!(vp.offset, 0);
    }

    #[test]
    fn viewport_maps_cells_to_rows() {
        let vp = Viewport {
            area: Rect::new(2, 1, 20, 3),
            offset: 4,
        };
        assert_eq!(vp.row_at(5, 1), Some(4));
        assert_eq!(vp.row_at(5, 3), Some(6));
        assert_eq!(vp.row_at(5, 4), None);
        assert_eq!(vp.row_at(0, 2), None);
    }

    #[test]
    fn double_click_requires_same_row_within_window() {
        let (_dir, mut app) = setup_app();
        let t0 = Instant::now();
        assert!(!app.click_row(1, t0));
        assert!(app.click_row(1, t0 + Duration::from_millis(100)));
        assert!(!app.click_row(1, t0 + Duration::from_millis(200)));
        assert!(!app.click_row(2, t0 + Duration::from_millis(250)));
        assert!(!app.click_row(2, t0 + Duration::from_millis(2000)));
    }

    #[test]
    fn enter_and_back_return_to_origin() {
        let (dir, mut app) = setup_app();
        fs::create_dir(dir.path().join("alpha").join("inner")).unwrap();
        let origin = app.cwd.clone();

        app.activate();
        assert_eq!(app.cwd, origin.join("alpha"));
        app.activate();
        assert_eq!(app.cwd, origin.join("alpha").join("inner"));
        assert_eq!(app.history_len(), 2);

        app.go_back();
        app.go_back();
        assert_eq!(app.cwd, origin);
        assert_eq!(app.selected_name().as_deref(), Some("alpha"));
        app.go_back();
        assert_eq!(app.cwd, origin);
    }

    #[test]
    fn entering_vanished_directory_rolls_back() {
        let (dir, mut app) = setup_app();
        let origin = app.cwd.clone();
        fs::remove_dir(dir.path().join("alpha")).unwrap();
        app.activate();
        assert_eq!(app.cwd, origin);
        assert_eq!(app.selected_name().as_deref(), Some("alpha"));
        assert_eq!(app.history_len(), 0);
        assert!(app.notice().unwrap().is_error);
    }

    #[test]
    fn go_parent_selects_previous_directory() {
        let (_dir, mut app) = setup_app();
        let origin = app.cwd.clone();
        app.activate();
        app.go_parent();
        assert_eq!(app.cwd, origin);
        assert_eq!(app.selected_name().as_deref(), Some("alpha"));
        assert_eq!(app.history_len(), 2);
    }

    #[test]
    fn toggle_hidden_keeps_selection() {
        let (_dir, mut app) = setup_app();
        app.cursor.set_to(2);
        assert_eq!(app.selected_name().as_deref(), Some("file_a.txt"));
        app.toggle_hidden();
        assert_eq!(app.row_count(), 5);
        assert_eq!(app.selected_name().as_deref(), Some("file_a.txt"));
    }

    #[test]
    fn cycle_sort_reorders_without_losing_selection() {
        let (dir, mut app) = setup_app();
        fs::write(dir.path().join("file_b.rs"), "0123456789").unwrap();
        app.refresh();
        app.cursor.set_to(2);
        assert_eq!(app.selected_name().as_deref(), Some("file_a.txt"));
        app.cycle_sort();
        assert_eq!(app.prefs.sort_by.label(), "Size");
        assert_eq!(app.selected_name().as_deref(), Some("file_a.txt"));
        assert_eq!(app.cursor.index(), Some(3));
    }

    #[test]
    fn render_intent_reports_changes() {
        let (_dir, mut app) = setup_app();
        let first = app.render_intent(None);
        assert!(first.changes.full_redraw);
        assert_eq!(first.rows.len(), 4);

        let before = app.snapshot();
        app.move_cursor(1);
        let intent = app.render_intent(Some(before));
        assert!(intent.changes.cursor_moved);
        assert!(!intent.changes.listing_replaced);
        assert!(!intent.changes.mode_changed);
        assert_eq!(intent.cursor, Some(1));
        assert_eq!(intent.view, ModeView::Browsing);
    }

    #[test]
    fn preview_is_cached_per_path_and_generation() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        let (services, record) = fakes::services(true);
        let mut app = App::new(dir.path(), &AppConfig::default(), services).unwrap();
        app.render_intent(None);
        app.render_intent(None);
        assert_eq!(record.previewed.borrow().len(), 1);
        app.refresh();
        app.render_intent(None);
        assert_eq!(record.previewed.borrow().len(), 2);
    }

    #[test]
    fn child_toward_finds_first_component() {
        assert_eq!(
            child_toward(Path::new("/a"), Path::new("/a/b/c")),
            Some(PathBuf::from("b"))
        );
        assert_eq!(child_toward(Path::new("/x"), Path::new("/a/b")), None);
    }
}
