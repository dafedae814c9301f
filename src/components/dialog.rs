use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{ModeView, MENU_ACTIONS};
use crate::fs::listing::EntryKind;
use crate::preview::Property;

/// Dialog widget that renders a centered modal overlay for the modal modes.
pub struct DialogWidget<'a> {
    view: &'a ModeView,
}

impl<'a> DialogWidget<'a> {
    pub fn new(view: &'a ModeView) -> Self {
        Self { view }
    }

    /// Calculate a centered rectangle within the given area.
    pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        let w = width.min(area.width);
        let h = height.min(area.height);
        Rect::new(x, y, w, h)
    }
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.view {
            ModeView::Prompt {
                title,
                input,
                cursor,
                error,
            } => render_input_dialog(title, input, *cursor, error.as_deref(), area, buf),
            ModeView::ConfirmDelete { name, kind } => render_confirm_dialog(name, *kind, area, buf),
            ModeView::ContextMenu { name, selected } => render_menu(name, *selected, area, buf),
            ModeView::Properties { rows } => render_properties(rows, area, buf),
            _ => {}
        }
    }
}

fn dialog_block(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .padding(Padding::horizontal(1))
}

fn hint_line(hint: &str) -> Line<'_> {
    Line::from(Span::styled(
        hint,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
    ))
}

fn render_input_dialog(
    title: &str,
    input: &str,
    cursor: usize,
    error: Option<&str>,
    area: Rect,
    buf: &mut Buffer,
) {
    let dialog_width = 50.min(area.width.saturating_sub(4));
    let dialog_height = if error.is_some() { 6 } else { 5 };
    let rect = DialogWidget::centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = dialog_block(title, Color::Cyan);
    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let cursor = cursor.min(input.len());
    let (before, rest) = input.split_at(cursor);
    let (cursor_char, after) = match rest.chars().next() {
        Some(c) => rest.split_at(c.len_utf8()),
        None => (" ", ""),
    };

    // Keep the cursor in view by dropping characters from the left.
    let max_width = inner.width as usize;
    let before_len = before.chars().count();
    let before_display: String = if before_len + 1 > max_width {
        before.chars().skip(before_len + 1 - max_width).collect()
    } else {
        before.to_string()
    };

    let input_style = Style::default().fg(Color::White);
    let cursor_style = Style::default()
        .bg(Color::White)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);

    let line = Line::from(vec![
        Span::styled(before_display, input_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, input_style),
    ]);
    buf.set_line(inner.x, inner.y + (inner.height - 1).min(1), &line, inner.width);

    if let Some(message) = error {
        if inner.height > 2 {
            let err = Line::from(Span::styled(message, Style::default().fg(Color::Red)));
            buf.set_line(inner.x, inner.y + 2, &err, inner.width);
        }
    }

    if inner.height > 1 {
        buf.set_line(
            inner.x,
            inner.y + inner.height - 1,
            &hint_line("[Enter] Confirm  [Esc] Cancel"),
            inner.width,
        );
    }
}

fn render_confirm_dialog(name: &str, kind: EntryKind, area: Rect, buf: &mut Buffer) {
    let dialog_width = (name.chars().count() as u16 + 14)
        .max(40)
        .min(area.width.saturating_sub(4));
    let rect = DialogWidget::centered_rect(dialog_width, 6, area);

    Clear.render(rect, buf);

    let block = dialog_block("Delete Confirmation", Color::Red);
    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let question = match kind {
        EntryKind::Directory => "Delete this directory and everything in it?",
        _ => "Delete this file?",
    };
    let header = Line::from(Span::styled(
        question,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ));
    buf.set_line(inner.x, inner.y, &header, inner.width);

    if inner.height > 2 {
        let target = Line::from(Span::styled(
            format!("  • {}", name),
            Style::default().fg(Color::White),
        ));
        buf.set_line(inner.x, inner.y + 1, &target, inner.width);
    }

    buf.set_line(
        inner.x,
        inner.y + inner.height - 1,
        &hint_line("[y] Yes  [n/Esc] Cancel"),
        inner.width,
    );
}

fn render_menu(name: &str, selected: usize, area: Rect, buf: &mut Buffer) {
    let dialog_width = 36.min(area.width.saturating_sub(4));
    let dialog_height = MENU_ACTIONS.len() as u16 + 3;
    let rect = DialogWidget::centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = dialog_block(name, Color::Cyan);
    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    for (i, action) in MENU_ACTIONS.iter().enumerate() {
        let y = inner.y + i as u16;
        if y >= inner.y + inner.height {
            break;
        }
        let style = if i == selected {
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let line = Line::from(Span::styled(format!("{}. {}", i + 1, action.label()), style));
        buf.set_line(inner.x, y, &line, inner.width);
    }

    if inner.height > MENU_ACTIONS.len() as u16 {
        buf.set_line(
            inner.x,
            inner.y + inner.height - 1,
            &hint_line("[1-6/Enter] Choose  [Esc] Close"),
            inner.width,
        );
    }
}

fn render_properties(rows: &[Property], area: Rect, buf: &mut Buffer) {
    let label_width = rows.iter().map(|r| r.label.len()).max().unwrap_or(0);
    let widest = rows
        .iter()
        .map(|r| r.value.chars().count())
        .max()
        .unwrap_or(0);
    let dialog_width = ((label_width + widest + 8) as u16)
        .max(40)
        .min(area.width.saturating_sub(4));
    let dialog_height = (rows.len() as u16 + 3).min(area.height.saturating_sub(2));
    let rect = DialogWidget::centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = dialog_block("Properties", Color::Cyan);
    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let label_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    for (i, row) in rows.iter().enumerate() {
        let y = inner.y + i as u16;
        if y >= inner.y + inner.height.saturating_sub(1) {
            break;
        }
        let line = Line::from(vec![
            Span::styled(format!("{:<width$}  ", row.label, width = label_width), label_style),
            Span::raw(row.value.clone()),
        ]);
        buf.set_line(inner.x, y, &line, inner.width);
    }

    buf.set_line(
        inner.x,
        inner.y + inner.height - 1,
        &hint_line("Press any key to close"),
        inner.width,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(buf: &Buffer, area: Rect) -> String {
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buf.cell((x, y)).unwrap().symbol());
            }
            out.push('\n');
        }
        out
    }

    fn render(view: &ModeView, area: Rect) -> String {
        let mut buf = Buffer::empty(area);
        DialogWidget::new(view).render(area, &mut buf);
        screen(&buf, area)
    }

    #[test]
    fn centered_rect_is_clamped() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(DialogWidget::centered_rect(10, 4, area), Rect::new(5, 3, 10, 4));
        assert_eq!(DialogWidget::centered_rect(40, 40, area), Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn prompt_shows_title_input_and_error() {
        let view = ModeView::Prompt {
            title: "Rename 'apple.txt'".into(),
            input: "Banana".into(),
            cursor: 6,
            error: Some("'Banana' already exists".into()),
        };
        let out = render(&view, Rect::new(0, 0, 60, 12));
        assert!(out.contains("Rename 'apple.txt'"));
        assert!(out.contains("Banana"));
        assert!(out.contains("'Banana' already exists"));
        assert!(out.contains("[Enter] Confirm"));
    }

    #[test]
    fn prompt_cursor_on_multibyte_char_does_not_panic() {
        let view = ModeView::Prompt {
            title: "New file".into(),
            input: "héllo".into(),
            cursor: 1,
            error: None,
        };
        let out = render(&view, Rect::new(0, 0, 60, 10));
        assert!(out.contains("llo"));
    }

    #[test]
    fn confirm_names_target() {
        let view = ModeView::ConfirmDelete {
            name: "cat.md".into(),
            kind: EntryKind::File,
        };
        let out = render(&view, Rect::new(0, 0, 60, 12));
        assert!(out.contains("Delete this file?"));
        assert!(out.contains("cat.md"));
        assert!(out.contains("[y] Yes"));
    }

    #[test]
    fn menu_lists_numbered_actions() {
        let view = ModeView::ContextMenu {
            name: "apple.txt".into(),
            selected: 1,
        };
        let out = render(&view, Rect::new(0, 0, 60, 14));
        assert!(out.contains("1. Open with default app"));
        assert!(out.contains("6. Properties"));
    }

    #[test]
    fn properties_lists_rows() {
        let view = ModeView::Properties {
            rows: vec![
                Property {
                    label: "Name",
                    value: "apple.txt".into(),
                },
                Property {
                    label: "Size",
                    value: "5 B (5 bytes)".into(),
                },
            ],
        };
        let out = render(&view, Rect::new(0, 0, 60, 12));
        assert!(out.contains("apple.txt"));
        assert!(out.contains("5 B (5 bytes)"));
        assert!(out.contains("Press any key"));
    }

    #[test]
    fn browsing_renders_nothing() {
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        DialogWidget::new(&ModeView::Browsing).render(area, &mut buf);
        assert_eq!(buf, Buffer::empty(area));
    }
}
