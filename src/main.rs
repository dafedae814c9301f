mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod handler;
mod logging;
mod nav;
mod preview;
mod search;
mod services;
mod tui;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use crate::app::App;
use crate::config::AppConfig;
use crate::event::{EventHandler, InputGate};
use crate::preview::SyntectPreview;
use crate::services::{
    resolve_editor, PreviewProvider, Services, SystemClipboard, SystemOpener, TerminalEditor,
};
use crate::tui::{install_panic_hook, Tui};

const TICK_RATE: Duration = Duration::from_millis(250);

/// An interactive terminal file explorer.
#[derive(Parser, Debug)]
#[command(name = "mes", version, about)]
struct Cli {
    /// Directory to open (defaults to the configured path, then the current directory)
    path: Option<PathBuf>,

    /// Config file to load on top of the discovered ones
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show hidden files on startup
    #[arg(long)]
    hidden: bool,

    /// Disable mouse capture
    #[arg(long)]
    no_mouse: bool,

    /// Disable the preview pane
    #[arg(long)]
    no_preview: bool,

    /// Maximum depth for recursive search
    #[arg(long, value_name = "N")]
    depth: Option<usize>,
}

impl Cli {
    /// Flags that were given, as a partial config layered over the files.
    fn overrides(&self) -> AppConfig {
        let mut overrides = AppConfig::default();
        if self.hidden {
            overrides.general.show_hidden = Some(true);
        }
        if self.no_mouse {
            overrides.general.mouse = Some(false);
        }
        if self.no_preview {
            overrides.preview.enabled = Some(false);
        }
        overrides.search.max_depth = self.depth;
        overrides
    }
}

fn build_services(config: &AppConfig, gate: InputGate) -> Services {
    let editor = resolve_editor(
        config.editor_command(),
        std::env::var("VISUAL").ok(),
        std::env::var("EDITOR").ok(),
    );
    let preview: Option<Box<dyn PreviewProvider>> = if config.preview_enabled() {
        Some(Box::new(SyntectPreview::new(
            config.syntax_theme_name(),
            config.preview_max_lines(),
            config.preview_max_bytes(),
        )))
    } else {
        None
    };

    Services {
        editor: Box::new(TerminalEditor::new(editor, gate, config.mouse_enabled())),
        opener: Box::new(SystemOpener),
        clipboard: Box::new(SystemClipboard),
        preview,
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    let _log_guard = match logging::init(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    };

    let requested = cli
        .path
        .clone()
        .or_else(|| config.general.default_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = requested.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", requested.display()))
    })?;
    if !path.is_dir() {
        return Err(error::AppError::InvalidPath(format!(
            "{} is not a directory",
            path.display()
        )));
    }

    let gate = InputGate::default();
    let services = build_services(&config, gate.clone());
    let mut app = App::new(&path, &config, services).map_err(|e| {
        error!(path = %path.display(), error = %e, "cannot read starting directory");
        e
    })?;

    install_panic_hook();

    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(TICK_RATE, gate);
    let mut intent = app.render_intent(None);

    loop {
        if intent.quit {
            break;
        }
        if intent.changes.full_redraw {
            tui.force_redraw()?;
        }

        let mut list_area = ratatui::layout::Rect::default();
        tui.terminal_mut().draw(|frame| {
            list_area = ui::render(frame, &intent);
        })?;
        app.set_list_area(list_area);

        let event = events.next().await?;
        intent = handler::handle_event(&mut app, event);
    }

    tui.restore()?;
    info!("exited");
    Ok(())
}
