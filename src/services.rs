//! Narrow interfaces to the outside world: the external editor, the system
//! opener, the clipboard and the previewer.

use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::config::Preferences;
use crate::event::InputGate;
use crate::fs::listing::Entry;
use crate::preview::Preview;
use crate::tui;

/// Runs an editor on a file and blocks until it exits.
pub trait EditorLauncher {
    fn edit(&mut self, path: &Path) -> io::Result<()>;
}

/// Hands a file to the platform's default application without waiting.
pub trait Opener {
    fn open(&mut self, path: &Path) -> io::Result<()>;
}

/// Copies text to the system clipboard.
pub trait ClipboardWriter {
    fn copy(&mut self, text: &str) -> io::Result<()>;
}

/// Builds the preview payload for the selected entry.
pub trait PreviewProvider {
    fn preview(&self, path: &Path, entry: &Entry, prefs: &Preferences) -> Preview;
}

/// Collaborators the dispatcher calls out to.
pub struct Services {
    pub editor: Box<dyn EditorLauncher>,
    pub opener: Box<dyn Opener>,
    pub clipboard: Box<dyn ClipboardWriter>,
    /// `None` when previews are disabled.
    pub preview: Option<Box<dyn PreviewProvider>>,
}

// ── Editor ───────────────────────────────────────────────────────────────────

const FALLBACK_EDITORS: &[&str] = &["nvim", "vim", "vi"];

/// Editor command from config, `$VISUAL`, `$EDITOR`, then the first of
/// nvim/vim/vi found on `PATH`.
pub fn resolve_editor(
    configured: Option<&str>,
    visual: Option<String>,
    editor: Option<String>,
) -> Option<String> {
    configured
        .map(str::to_string)
        .into_iter()
        .chain(visual)
        .chain(editor)
        .find(|cmd| !cmd.trim().is_empty())
        .or_else(|| {
            FALLBACK_EDITORS
                .iter()
                .find(|name| on_path(name))
                .map(|name| name.to_string())
        })
}

fn on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Split `"code --wait"` into program and leading arguments.
pub fn split_command(command: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Editor that takes over the terminal while it runs.
pub struct TerminalEditor {
    command: Option<String>,
    gate: InputGate,
    mouse: bool,
}

impl TerminalEditor {
    pub fn new(command: Option<String>, gate: InputGate, mouse: bool) -> Self {
        Self {
            command,
            gate,
            mouse,
        }
    }
}

impl EditorLauncher for TerminalEditor {
    fn edit(&mut self, path: &Path) -> io::Result<()> {
        let command = self
            .command
            .as_deref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no editor configured"))?;
        let (program, args) = split_command(command)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty editor command"))?;

        info!(editor = program, path = %path.display(), "launching editor");
        self.gate.pause();
        tui::suspend(self.mouse)?;
        let status = Command::new(program).args(&args).arg(path).status();
        let resumed = tui::resume(self.mouse);
        self.gate.resume();
        resumed?;

        let status = status?;
        if status.success() {
            Ok(())
        } else {
            warn!(editor = program, %status, "editor exited with failure");
            Err(io::Error::other(format!("{} exited with {}", program, status)))
        }
    }
}

// ── Opener ───────────────────────────────────────────────────────────────────

/// Hands files to the platform launcher through the `open` crate.
pub struct SystemOpener;

impl Opener for SystemOpener {
    fn open(&mut self, path: &Path) -> io::Result<()> {
        open::that_detached(path)?;
        debug!(path = %path.display(), "opened with system default");
        Ok(())
    }
}

// ── Clipboard ────────────────────────────────────────────────────────────────

/// Pipes text into the first clipboard tool that accepts it.
pub struct SystemClipboard;

type ClipboardTool = (&'static str, &'static [&'static str]);

fn clipboard_commands() -> Vec<ClipboardTool> {
    let mut cmds: Vec<ClipboardTool> = Vec::new();
    if cfg!(target_os = "macos") {
        cmds.push(("pbcopy", &[]));
    } else if cfg!(target_os = "windows") {
        cmds.push(("clip", &[]));
    } else {
        if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            cmds.push(("wl-copy", &[]));
        }
        cmds.push(("xclip", &["-selection", "clipboard"]));
        cmds.push(("xsel", &["--clipboard", "--input"]));
    }
    cmds
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{} exited with {}", program, status)))
    }
}

impl ClipboardWriter for SystemClipboard {
    fn copy(&mut self, text: &str) -> io::Result<()> {
        for (program, args) in clipboard_commands() {
            match pipe_to(program, args, text) {
                Ok(()) => {
                    debug!(tool = program, "copied to clipboard");
                    return Ok(());
                }
                Err(e) => debug!(tool = program, error = %e, "clipboard tool failed"),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            "no clipboard tool available",
        ))
    }
}

/// Recording fakes for dispatcher tests.
#[cfg(test)]
pub mod fakes {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    pub struct Record {
        pub edited: Rc<RefCell<Vec<PathBuf>>>,
        pub opened: Rc<RefCell<Vec<PathBuf>>>,
        pub copied: Rc<RefCell<Vec<String>>>,
        pub previewed: Rc<RefCell<Vec<PathBuf>>>,
    }

    pub struct FakeEditor(pub Record);
    pub struct FakeOpener(pub Record);
    pub struct FakeClipboard(pub Record, pub bool);
    pub struct FakePreview(pub Record);

    impl EditorLauncher for FakeEditor {
        fn edit(&mut self, path: &Path) -> io::Result<()> {
            self.0.edited.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    impl Opener for FakeOpener {
        fn open(&mut self, path: &Path) -> io::Result<()> {
            self.0.opened.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    impl ClipboardWriter for FakeClipboard {
        fn copy(&mut self, text: &str) -> io::Result<()> {
            if !self.1 {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no clipboard"));
            }
            self.0.copied.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    impl PreviewProvider for FakePreview {
        fn preview(&self, path: &Path, _entry: &Entry, _prefs: &Preferences) -> Preview {
            self.0.previewed.borrow_mut().push(path.to_path_buf());
            Preview {
                kind: crate::preview::PreviewKind::Text,
                info: String::new(),
                lines: Vec::new(),
            }
        }
    }

    /// Fakes sharing one record. `clipboard_works` controls copy failures.
    pub fn services(clipboard_works: bool) -> (Services, Record) {
        let record = Record::default();
        let services = Services {
            editor: Box::new(FakeEditor(record.clone())),
            opener: Box::new(FakeOpener(record.clone())),
            clipboard: Box::new(FakeClipboard(record.clone(), clipboard_works)),
            preview: Some(Box::new(FakePreview(record.clone()))),
        };
        (services, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_editor_prefers_config() {
        assert_eq!(
            resolve_editor(Some("hx"), Some("code -w".into()), Some("nano".into())),
            Some("hx".to_string())
        );
    }

    #[test]
    fn resolve_editor_falls_back_through_env() {
        assert_eq!(
            resolve_editor(None, Some("code -w".into()), Some("nano".into())),
            Some("code -w".to_string())
        );
        assert_eq!(
            resolve_editor(None, Some("  ".into()), Some("nano".into())),
            Some("nano".to_string())
        );
    }

    #[test]
    fn split_command_with_args() {
        assert_eq!(split_command("code --wait"), Some(("code", vec!["--wait"])));
        assert_eq!(split_command("vim"), Some(("vim", vec![])));
        assert_eq!(split_command("   "), None);
    }

    #[test]
    fn editor_without_command_fails_cleanly() {
        let mut editor = TerminalEditor::new(None, InputGate::default(), false);
        let err = editor.edit(Path::new("/tmp/x")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
