use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{ModeView, RenderIntent};
use crate::components::dialog::DialogWidget;
use crate::components::help::HelpOverlay;
use crate::components::listing::ListingWidget;
use crate::components::preview::PreviewWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::search::SearchMode;

/// Below this width the preview pane is dropped.
const MIN_SPLIT_WIDTH: u16 = 60;

/// Draw one frame. Returns the area the entry rows were drawn in, which the
/// app needs to map mouse clicks to rows.
pub fn render(frame: &mut Frame, intent: &RenderIntent) -> Rect {
    let [main_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    let main_area = if let ModeView::Searching {
        query,
        mode,
        matches,
        truncated,
    } = &intent.view
    {
        let [bar, rest] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(main_area);
        frame.render_widget(search_line(query, *mode, *matches, *truncated), bar);
        rest
    } else {
        main_area
    };

    let (list_area, preview_area) = if intent.preview.is_some() && main_area.width >= MIN_SPLIT_WIDTH {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(main_area);
        (left, Some(right))
    } else {
        (main_area, None)
    };

    let block = Block::default()
        .title(listing_title(intent))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let list_inner = block.inner(list_area);
    frame.render_widget(ListingWidget::new(intent).block(block), list_area);

    if let Some(area) = preview_area {
        let preview_block = Block::default()
            .title(" Preview ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        frame.render_widget(
            PreviewWidget::new(intent.preview.as_deref()).block(preview_block),
            area,
        );
    }

    let path_str = intent.listing.path.display().to_string();
    let info = status_info(intent);
    frame.render_widget(
        StatusBarWidget::new(&path_str, &info, &intent.view).notice(intent.status.as_ref()),
        status_area,
    );

    match &intent.view {
        ModeView::Help => frame.render_widget(HelpOverlay::new(), frame.area()),
        ModeView::Prompt { .. }
        | ModeView::ConfirmDelete { .. }
        | ModeView::ContextMenu { .. }
        | ModeView::Properties { .. } => {
            frame.render_widget(DialogWidget::new(&intent.view), frame.area())
        }
        ModeView::Browsing | ModeView::Searching { .. } => {}
    }

    list_inner
}

fn listing_title(intent: &RenderIntent) -> String {
    let name = intent
        .listing
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| intent.listing.path.display().to_string());
    format!(" {} ", name)
}

fn status_info(intent: &RenderIntent) -> String {
    let hidden = intent.listing.hidden_count();
    let mut info = format!("{} items", intent.listing.entries.len() - hidden);
    if hidden > 0 {
        if intent.prefs.show_hidden {
            info.push_str(&format!(" (+{} hidden)", hidden));
        } else {
            info.push_str(&format!(" ({} hidden)", hidden));
        }
    }
    info.push_str(&format!(" | Sort: {}", intent.prefs.sort_by.label()));
    if intent.history > 0 {
        info.push_str(&format!(" | Back: {}", intent.history));
    }
    info
}

fn search_line(query: &str, mode: SearchMode, matches: usize, truncated: bool) -> Line<'static> {
    let count = if truncated {
        format!("  {}+ matches", matches)
    } else {
        format!("  {} matches", matches)
    };
    Line::from(vec![
        Span::styled(
            format!("{}: ", mode.label()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(query.to_string()),
        Span::styled("▏", Style::default().fg(Color::White)),
        Span::styled(count, Style::default().fg(Color::DarkGray)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::AppConfig;
    use crate::services::fakes;
    use ratatui::{backend::TestBackend, Terminal};
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let area = buf.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            out.push('\n');
        }
        out
    }

    fn setup() -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        File::create(dir.path().join("README.md")).unwrap();
        File::create(dir.path().join(".git")).unwrap();
        let (services, _) = fakes::services(true);
        let app = App::new(dir.path(), &AppConfig::default(), services).unwrap();
        (dir, app)
    }

    #[test]
    fn draws_listing_status_and_preview_pane() {
        let (_dir, mut app) = setup();
        let intent = app.render_intent(None);
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        let mut list_area = Rect::default();
        terminal
            .draw(|frame| list_area = render(frame, &intent))
            .unwrap();

        let out = screen(&terminal);
        assert!(out.contains("[D] src/"));
        assert!(out.contains("[F] README.md"));
        assert!(!out.contains(".git"));
        assert!(out.contains("2 items (1 hidden) | Sort: Name"));
        assert!(out.contains("Preview"));
        assert_eq!(list_area, Rect::new(1, 1, 38, 9));
    }

    #[test]
    fn narrow_terminal_hides_preview() {
        let (_dir, mut app) = setup();
        let intent = app.render_intent(None);
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        let mut list_area = Rect::default();
        terminal
            .draw(|frame| list_area = render(frame, &intent))
            .unwrap();
        assert!(!screen(&terminal).contains("Preview"));
        assert_eq!(list_area.width, 38);
    }

    #[test]
    fn search_bar_shows_query_and_count() {
        let (_dir, mut app) = setup();
        app.begin_search(SearchMode::Flat);
        app.edit_query(|q| q.push_str("rd"));
        let intent = app.render_intent(None);
        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        terminal.draw(|frame| {
            render(frame, &intent);
        })
        .unwrap();

        let out = screen(&terminal);
        assert!(out.contains("Filter: rd"));
        assert!(out.contains("1 matches"));
        assert!(out.contains("README.md"));
    }

    #[test]
    fn modal_views_are_drawn_on_top() {
        let (_dir, mut app) = setup();
        app.start_delete();
        let intent = app.render_intent(None);
        let mut terminal = Terminal::new(TestBackend::new(80, 16)).unwrap();
        terminal.draw(|frame| {
            render(frame, &intent);
        })
        .unwrap();
        assert!(screen(&terminal).contains("Delete Confirmation"));

        app.cancel();
        app.toggle_help();
        let intent = app.render_intent(None);
        terminal.draw(|frame| {
            render(frame, &intent);
        })
        .unwrap();
        assert!(screen(&terminal).contains("Keybinding Reference"));
    }
}
