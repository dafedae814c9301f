use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::preview::Preview;

/// Preview widget that renders the selected entry's preview payload.
pub struct PreviewWidget<'a> {
    preview: Option<&'a Preview>,
    block: Option<Block<'a>>,
}

impl<'a> PreviewWidget<'a> {
    pub fn new(preview: Option<&'a Preview>) -> Self {
        Self {
            preview,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }
}

impl<'a> Widget for PreviewWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let Some(preview) = self.preview.filter(|p| !p.lines.is_empty()) else {
            let line = Line::from(Span::styled("No preview", Style::default().fg(Color::DarkGray)));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        };

        let mut y = inner.y;
        if !preview.info.is_empty() {
            let info = Line::from(Span::styled(
                preview.info.as_str(),
                Style::default().fg(Color::Cyan),
            ));
            buf.set_line(inner.x, y, &info, inner.width);
            y += 1;
        }

        for line in &preview.lines {
            if y >= inner.y + inner.height {
                break;
            }
            buf.set_line(inner.x, y, line, inner.width);
            y += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PreviewKind;
    use ratatui::widgets::Borders;

    fn row(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    fn text_preview(lines: &[&str]) -> Preview {
        Preview {
            kind: PreviewKind::Text,
            info: "-rw-r--r--       5 B 2024-01-01 00:00:00".into(),
            lines: lines.iter().map(|l| Line::from(l.to_string())).collect(),
        }
    }

    #[test]
    fn empty_preview_shows_placeholder() {
        let widget =
            PreviewWidget::new(None).block(Block::default().borders(Borders::ALL).title(" Preview "));
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 1, 30).contains("No preview"));
    }

    #[test]
    fn info_line_precedes_content() {
        let preview = text_preview(&["line 1", "line 2", "line 3"]);
        let area = Rect::new(0, 0, 50, 3);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(Some(&preview)).render(area, &mut buf);
        assert!(row(&buf, 0, 50).contains("-rw-r--r--"));
        assert!(row(&buf, 1, 50).contains("line 1"));
        assert!(row(&buf, 2, 50).contains("line 2"));
    }

    #[test]
    fn zero_area_no_panic() {
        let preview = text_preview(&["x"]);
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(Some(&preview)).render(area, &mut buf);
    }
}
