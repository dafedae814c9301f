use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::app::{RenderIntent, RowView};
use crate::fs::listing::{Entry, EntryKind};
use crate::preview::format_size;
use crate::search::SearchMatch;

/// Entry list for the current directory, or the search matches.
pub struct ListingWidget<'a> {
    intent: &'a RenderIntent,
    block: Option<Block<'a>>,
}

impl<'a> ListingWidget<'a> {
    pub fn new(intent: &'a RenderIntent) -> Self {
        Self {
            intent,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    fn indicator(kind: EntryKind) -> &'static str {
        match kind {
            EntryKind::Directory => "[D] ",
            EntryKind::Symlink => "[L] ",
            EntryKind::File => "[F] ",
        }
    }

    fn base_style(entry: &Entry) -> Style {
        if entry.is_hidden {
            return Style::default().fg(Color::DarkGray);
        }
        match entry.kind {
            EntryKind::Directory => Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            EntryKind::Symlink => Style::default().fg(Color::Cyan),
            EntryKind::File => Style::default().fg(Color::White),
        }
    }

    fn entry_line(entry: &Entry, style: Style, width: usize) -> Line<'static> {
        let label = if entry.is_dir() {
            format!("{}{}/", Self::indicator(entry.kind), entry.name)
        } else {
            format!("{}{}", Self::indicator(entry.kind), entry.name)
        };
        let size = if entry.is_dir() {
            String::new()
        } else {
            format_size(entry.size)
        };

        let used = label.chars().count() + size.len();
        let mut spans = vec![Span::styled(label, style)];
        if !size.is_empty() && used < width {
            spans.push(Span::styled(" ".repeat(width - used), style));
            spans.push(Span::styled(size, style.fg(Color::DarkGray)));
        }
        Line::from(spans)
    }

    /// Relative path of a match with the matched name characters emphasised.
    fn match_line(m: &SearchMatch, style: Style) -> Line<'static> {
        let shown = m.source_path.to_string_lossy().to_string();
        let name_start = shown.chars().count().saturating_sub(m.entry.name.chars().count());
        let hit = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);

        let mut spans = vec![Span::styled(Self::indicator(m.entry.kind), style)];
        for (i, c) in shown.chars().enumerate() {
            let highlighted = i >= name_start && m.indices.contains(&(i - name_start));
            spans.push(Span::styled(
                c.to_string(),
                if highlighted { hit } else { style },
            ));
        }
        Line::from(spans)
    }
}

impl<'a> Widget for ListingWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let rows = &self.intent.rows;
        let visible_height = inner_area.height as usize;
        if visible_height == 0 || inner_area.width == 0 {
            return;
        }

        if rows.is_empty() {
            let msg = if matches!(self.intent.view, crate::app::ModeView::Searching { .. }) {
                "No matches"
            } else {
                "(empty)"
            };
            let line = Line::from(Span::styled(msg, Style::default().fg(Color::DarkGray)));
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
            return;
        }

        let scroll = self.intent.scroll_offset;
        let width = inner_area.width as usize;

        for (i, (idx, row)) in rows
            .iter()
            .enumerate()
            .skip(scroll)
            .take(visible_height)
            .enumerate()
        {
            let y = inner_area.y + i as u16;
            let is_selected = self.intent.cursor == Some(idx);

            let line = match row {
                RowView::Listing(index) => {
                    let Some(entry) = self.intent.listing.entries.get(*index) else {
                        continue;
                    };
                    let style = if is_selected {
                        Self::base_style(entry).bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                    } else {
                        Self::base_style(entry)
                    };
                    Self::entry_line(entry, style, width)
                }
                RowView::Match(m) => {
                    let style = if is_selected {
                        Self::base_style(&m.entry).bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                    } else {
                        Self::base_style(&m.entry)
                    };
                    Self::match_line(m, style)
                }
            };

            if is_selected {
                buf.set_style(
                    Rect::new(inner_area.x, y, inner_area.width, 1),
                    Style::default().bg(Color::DarkGray),
                );
            }
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::AppConfig;
    use crate::services::fakes;
    use std::fs;
    use tempfile::TempDir;

    fn row_text(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    fn app_with(files: &[&str], dirs: &[&str]) -> (TempDir, App) {
        let dir = TempDir::new().unwrap();
        for f in files {
            fs::write(dir.path().join(f), "hello").unwrap();
        }
        for d in dirs {
            fs::create_dir(dir.path().join(d)).unwrap();
        }
        let (services, _) = fakes::services(true);
        let app = App::new(dir.path(), &AppConfig::default(), services).unwrap();
        (dir, app)
    }

    #[test]
    fn renders_entries_with_indicators_and_sizes() {
        let (_dir, mut app) = app_with(&["notes.txt"], &["src"]);
        let intent = app.render_intent(None);
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        ListingWidget::new(&intent).render(area, &mut buf);

        assert!(row_text(&buf, 0, 30).starts_with("[D] src/"));
        let file_row = row_text(&buf, 1, 30);
        assert!(file_row.starts_with("[F] notes.txt"));
        assert!(file_row.trim_end().ends_with("5 B"));
    }

    #[test]
    fn selected_row_is_highlighted() {
        let (_dir, mut app) = app_with(&["a", "b"], &[]);
        app.move_cursor(1);
        let intent = app.render_intent(None);
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        ListingWidget::new(&intent).render(area, &mut buf);
        assert_eq!(buf.cell((0, 1)).unwrap().bg, Color::DarkGray);
        assert_ne!(buf.cell((0, 0)).unwrap().bg, Color::DarkGray);
    }

    #[test]
    fn respects_scroll_offset() {
        let (_dir, mut app) = app_with(&["a", "b", "c", "d"], &[]);
        app.set_list_area(Rect::new(0, 0, 20, 2));
        app.cursor_last();
        let intent = app.render_intent(None);
        assert_eq!(intent.scroll_offset, 2);
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        ListingWidget::new(&intent).render(area, &mut buf);
        assert!(row_text(&buf, 0, 20).starts_with("[F] c"));
        assert!(row_text(&buf, 1, 20).starts_with("[F] d"));
    }

    #[test]
    fn empty_search_shows_placeholder() {
        let (_dir, mut app) = app_with(&["a"], &[]);
        app.begin_search(crate::search::SearchMode::Flat);
        app.edit_query(|q| q.push('z'));
        let intent = app.render_intent(None);
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        ListingWidget::new(&intent).render(area, &mut buf);
        assert!(row_text(&buf, 0, 20).starts_with("No matches"));
    }

    #[test]
    fn zero_area_does_not_panic() {
        let (_dir, mut app) = app_with(&["a"], &[]);
        let intent = app.render_intent(None);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        ListingWidget::new(&intent).render(area, &mut buf);
    }
}
