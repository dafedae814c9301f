use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::app::{ModeView, Notice};

/// Status bar widget that displays the path, entry info and key hints, or a
/// transient notice.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    file_info: &'a str,
    view: &'a ModeView,
    notice: Option<&'a Notice>,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, file_info: &'a str, view: &'a ModeView) -> Self {
        Self {
            path_str,
            file_info,
            view,
            notice: None,
        }
    }

    pub fn notice(mut self, notice: Option<&'a Notice>) -> Self {
        self.notice = notice;
        self
    }

    fn key_hints(&self) -> &'static str {
        match self.view {
            ModeView::Searching { .. } => " Enter:open  Tab:mode  Esc:exit ",
            ModeView::Prompt { .. } => " Enter:confirm  Esc:cancel ",
            ModeView::ConfirmDelete { .. } => " y:delete  n:cancel ",
            ModeView::ContextMenu { .. } => " 1-6:choose  Esc:close ",
            ModeView::Help | ModeView::Properties { .. } => " Esc:close ",
            ModeView::Browsing => " /:filter  n:new  d:del  ?:help ",
        }
    }
}

/// Keep the tail of `s` within `budget` columns, prefixed with `...`.
fn truncate_left(s: &str, budget: usize) -> String {
    let len = s.chars().count();
    if len <= budget {
        return s.to_string();
    }
    if budget <= 3 {
        return s.chars().take(budget).collect();
    }
    let tail: String = s.chars().skip(len - (budget - 3)).collect();
    format!("...{}", tail)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some(notice) = self.notice {
            let style = if notice.is_error {
                Style::default().bg(Color::Red).fg(Color::White)
            } else {
                Style::default().fg(Color::Green)
            };

            // Pad or truncate message to fill full width
            let display: String = format!("{:<width$}", notice.text, width = width)
                .chars()
                .take(width)
                .collect();

            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Normal bar: [path] [file_info] [key_hints]
        let key_hints = self.key_hints();
        let hints_len = key_hints.len();
        let remaining = width.saturating_sub(hints_len);

        let info_len = self.file_info.chars().count();
        let path_budget = remaining.saturating_sub(info_len).saturating_sub(1);
        let path_display = truncate_left(self.path_str, path_budget);
        let info_display: String = self
            .file_info
            .chars()
            .take(remaining.saturating_sub(path_display.chars().count()))
            .collect();

        let gap = remaining
            .saturating_sub(path_display.chars().count())
            .saturating_sub(info_display.chars().count());

        let path_style = Style::default().fg(Color::White);
        let info_style = Style::default().fg(Color::Cyan);
        let hints_style = Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM);

        let mut spans = vec![
            Span::styled(path_display, path_style),
            Span::raw(" ".repeat(gap)),
            Span::styled(info_display, info_style),
        ];
        if width > hints_len {
            spans.push(Span::styled(key_hints, hints_style));
        }

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
