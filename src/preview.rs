//! Preview payloads for the selected entry and the properties overlay.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use tracing::debug;

use crate::config::Preferences;
use crate::error::FsResult;
use crate::fs::listing::{DirectoryListing, Entry, EntryKind};
use crate::services::PreviewProvider;

const FALLBACK_THEME: &str = "base16-ocean.dark";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "odt", "ppt", "pptx"];
const BINARY_EXTENSIONS: &[&str] = &[
    "zip", "tar", "gz", "bz2", "xz", "7z", "rar", "so", "dylib", "dll", "exe", "bin", "img",
    "iso", "mp3", "mp4", "avi", "mkv", "o", "a",
];

/// What kind of payload a preview carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Directory,
    Text,
    Image,
    Document,
    Binary,
    /// FIFOs, sockets and device nodes; never opened.
    Special,
    Unavailable,
}

/// Rendered preview for one entry.
#[derive(Debug, Clone)]
pub struct Preview {
    pub kind: PreviewKind,
    /// `mode size modified` summary shown under the title.
    pub info: String,
    pub lines: Vec<Line<'static>>,
}

impl Preview {
    fn unavailable(message: String) -> Self {
        Self {
            kind: PreviewKind::Unavailable,
            info: String::new(),
            lines: vec![Line::from(Span::styled(message, Style::default().fg(Color::Red)))],
        }
    }
}

/// Syntax-highlighting preview provider.
pub struct SyntectPreview {
    syntax_set: SyntaxSet,
    theme: Theme,
    max_lines: usize,
    max_bytes: u64,
}

impl SyntectPreview {
    pub fn new(theme_name: &str, max_lines: usize, max_bytes: u64) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme: load_theme(theme_name),
            max_lines: max_lines.max(1),
            max_bytes: max_bytes.max(1),
        }
    }

    fn directory(&self, path: &Path, prefs: &Preferences) -> Preview {
        let listing = match DirectoryListing::load(path, prefs, 0) {
            Ok(l) => l,
            Err(e) => return Preview::unavailable(e.notice()),
        };
        let visible: Vec<&Entry> = listing
            .entries
            .iter()
            .filter(|e| prefs.show_hidden || !e.is_hidden)
            .collect();

        let mut lines = vec![Line::from(Span::styled(
            format!("Contents ({} items):", visible.len()),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        if visible.is_empty() {
            lines.push(dim("(Empty directory)"));
        }
        for entry in visible.iter().take(self.max_lines) {
            let mut spans = vec![Span::styled(
                format!("{} ", kind_marker(entry.kind)),
                Style::default().fg(Color::DarkGray),
            )];
            if entry.is_dir() {
                spans.push(Span::styled(entry.name.clone(), Style::default().fg(Color::Blue)));
            } else {
                spans.push(Span::raw(entry.name.clone()));
                spans.push(Span::styled(
                    format!(" ({})", format_size(entry.size)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            lines.push(Line::from(spans));
        }
        if visible.len() > self.max_lines {
            lines.push(dim(&format!(
                "... and {} more items",
                visible.len() - self.max_lines
            )));
        }

        Preview {
            kind: PreviewKind::Directory,
            info: String::new(),
            lines,
        }
    }

    fn text(&self, path: &Path) -> Preview {
        let mut head = Vec::new();
        let read = fs::File::open(path).and_then(|f| f.take(self.max_bytes).read_to_end(&mut head));
        if let Err(e) = read {
            return Preview::unavailable(format!("Error reading file: {}", e));
        }
        let content = String::from_utf8_lossy(&head);

        let syntax = self
            .syntax_set
            .find_syntax_by_name(detect_syntax_name(path))
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(|ext| self.syntax_set.find_syntax_by_extension(ext))
            })
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let all: Vec<&str> = content.lines().collect();
        let shown = all.len().min(self.max_lines);
        let width = shown.max(1).to_string().len();
        let mut lines: Vec<Line<'static>> = all
            .iter()
            .take(shown)
            .enumerate()
            .map(|(i, text)| highlight_line(text, i + 1, width, &mut highlighter, &self.syntax_set))
            .collect();

        if lines.is_empty() {
            lines.push(dim("(empty file)"));
        }
        if all.len() > shown {
            lines.push(dim(&format!("... (showing {} of {} lines)", shown, all.len())));
        }
        if head.len() as u64 == self.max_bytes {
            lines.push(dim(&format!("... (truncated at {})", format_size(self.max_bytes))));
        }

        Preview {
            kind: PreviewKind::Text,
            info: String::new(),
            lines,
        }
    }
}

impl PreviewProvider for SyntectPreview {
    fn preview(&self, path: &Path, entry: &Entry, prefs: &Preferences) -> Preview {
        debug!(path = %path.display(), "building preview");
        let mut preview = match classify(path, entry) {
            PreviewKind::Directory => self.directory(path, prefs),
            PreviewKind::Text => self.text(path),
            kind => Preview {
                kind,
                info: String::new(),
                lines: vec![
                    dim(match kind {
                        PreviewKind::Image => "Image file (use an external viewer to open)",
                        PreviewKind::Document => "Binary document, no preview",
                        PreviewKind::Special => "Special file, no preview",
                        PreviewKind::Unavailable => "File unavailable",
                        _ => "Binary file, no preview",
                    }),
                    Line::from(""),
                    Line::from(format!("Path: {}", path.display())),
                ],
            },
        };
        preview.info = format_info(entry);
        preview
    }
}

/// Decide how to preview `entry`. Symlinks are classified by their target.
pub fn classify(path: &Path, entry: &Entry) -> PreviewKind {
    let is_dir = match entry.kind {
        EntryKind::Directory => true,
        EntryKind::Symlink => path.is_dir(),
        EntryKind::File => false,
    };
    if is_dir {
        return PreviewKind::Directory;
    }
    // Reading a FIFO or device can block forever.
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return PreviewKind::Special,
        Err(_) => return PreviewKind::Unavailable,
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        PreviewKind::Image
    } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
        PreviewKind::Document
    } else if BINARY_EXTENSIONS.contains(&ext.as_str()) || has_nul_bytes(path) {
        PreviewKind::Binary
    } else {
        PreviewKind::Text
    }
}

/// Scan the first 8 KiB for NUL bytes.
fn has_nul_bytes(path: &Path) -> bool {
    let mut buf = [0u8; 8192];
    match fs::File::open(path).and_then(|mut f| f.read(&mut buf)) {
        Ok(n) => buf[..n].contains(&0),
        Err(_) => false,
    }
}

/// Detect the syntax name for a file based on its extension.
pub fn detect_syntax_name(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py") => "Python",
        Some("rs") => "Rust",
        Some("yaml" | "yml") => "YAML",
        Some("json") => "JSON",
        Some("toml") => "TOML",
        Some("sh" | "bash" | "zsh") => "Bourne Again Shell (bash)",
        Some("md" | "markdown") => "Markdown",
        Some("html" | "htm") => "HTML",
        Some("css") => "CSS",
        Some("js" | "jsx") => "JavaScript",
        Some("c" | "h") => "C",
        Some("cpp" | "hpp" | "cc") => "C++",
        Some("java") => "Java",
        Some("go") => "Go",
        Some("rb") => "Ruby",
        Some("php") => "PHP",
        Some("sql") => "SQL",
        Some("xml") => "XML",
        None => detect_from_shebang(path),
        _ => "Plain Text",
    }
}

/// Syntax from the shebang line of an extensionless file.
fn detect_from_shebang(path: &Path) -> &'static str {
    let mut first_line = String::new();
    let read = fs::File::open(path).and_then(|f| BufReader::new(f).read_line(&mut first_line));
    if read.is_err() || !first_line.starts_with("#!") {
        return "Plain Text";
    }
    let line = first_line.to_lowercase();
    if line.contains("python") {
        "Python"
    } else if line.contains("bash") || line.contains("/sh") {
        "Bourne Again Shell (bash)"
    } else if line.contains("ruby") {
        "Ruby"
    } else if line.contains("node") {
        "JavaScript"
    } else if line.contains("perl") {
        "Perl"
    } else {
        "Plain Text"
    }
}

/// Load a theme from the built-in theme set by name, with fallback.
pub fn load_theme(name: &str) -> Theme {
    let mut set = ThemeSet::load_defaults();
    set.themes
        .remove(name)
        .or_else(|| set.themes.remove(FALLBACK_THEME))
        .unwrap_or_default()
}

fn highlight_line(
    text: &str,
    number: usize,
    width: usize,
    highlighter: &mut HighlightLines,
    syntax_set: &SyntaxSet,
) -> Line<'static> {
    let mut spans = vec![Span::styled(
        format!("{:>width$} │ ", number, width = width),
        Style::default().fg(Color::DarkGray),
    )];
    match highlighter.highlight_line(text, syntax_set) {
        Ok(ranges) => {
            for (style, piece) in ranges {
                let fg = style.foreground;
                spans.push(Span::styled(
                    piece.to_string(),
                    Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                ));
            }
        }
        Err(_) => spans.push(Span::raw(text.to_string())),
    }
    Line::from(spans)
}

fn dim(text: &str) -> Line<'static> {
    Line::from(Span::styled(text.to_string(), Style::default().fg(Color::DarkGray)))
}

fn kind_marker(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Directory => "d",
        EntryKind::Symlink => "l",
        EntryKind::File => "-",
    }
}

/// Human-readable size, e.g. `512 B`, `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `ls -l` style mode string, e.g. `drwxr-xr-x`.
pub fn format_mode(kind: EntryKind, mode: u32) -> String {
    let mut s = String::with_capacity(10);
    s.push_str(kind_marker(kind));
    for (bit, ch) in [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ] {
        s.push(if mode & bit != 0 { ch } else { '-' });
    }
    s
}

pub fn format_time(time: Option<SystemTime>) -> String {
    match time {
        Some(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "Unknown".to_string(),
    }
}

fn format_info(entry: &Entry) -> String {
    let modified = match entry.modified {
        Some(t) => DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M").to_string(),
        None => "Unknown".to_string(),
    };
    format!(
        "{} {:>9} {}",
        format_mode(entry.kind, entry.permissions),
        format_size(entry.size),
        modified
    )
}

/// One label/value row of the properties overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub label: &'static str,
    pub value: String,
}

/// Fresh metadata for the properties overlay.
pub fn properties(path: &Path) -> FsResult<Vec<Property>> {
    let entry = Entry::from_path(path)?;
    let row = |label, value: String| Property { label, value };

    let mut rows = vec![
        row("Name", entry.name.clone()),
        row("Path", path.display().to_string()),
        row("Kind", entry.kind.label().to_string()),
        row("Size", format!("{} ({} bytes)", format_size(entry.size), entry.size)),
        row("Permissions", format_mode(entry.kind, entry.permissions)),
        row("Modified", format_time(entry.modified)),
    ];
    if entry.kind == EntryKind::Symlink {
        if let Ok(dest) = fs::read_link(path) {
            rows.push(row("Target", dest.display().to_string()));
        }
    }
    rows.extend(owner_rows(path));
    Ok(rows)
}

#[cfg(unix)]
fn owner_rows(path: &Path) -> Vec<Property> {
    use std::os::unix::fs::MetadataExt;
    match fs::symlink_metadata(path) {
        Ok(meta) => vec![
            Property {
                label: "Owner",
                value: format!("uid {} / gid {}", meta.uid(), meta.gid()),
            },
            Property {
                label: "Inode",
                value: meta.ino().to_string(),
            },
        ],
        Err(_) => Vec::new(),
    }
}

#[cfg(not(unix))]
fn owner_rows(_path: &Path) -> Vec<Property> {
    Vec::new()
}
