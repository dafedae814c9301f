use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

/// A single keybinding entry for display.
struct KeyEntry {
    key: &'static str,
    description: &'static str,
}

/// A category of keybindings.
struct KeyCategory {
    name: &'static str,
    entries: &'static [KeyEntry],
}

const NAVIGATION_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "j / ↓",
        description: "Move down",
    },
    KeyEntry {
        key: "k / ↑",
        description: "Move up",
    },
    KeyEntry {
        key: "g / Home",
        description: "Jump to first entry",
    },
    KeyEntry {
        key: "G / End",
        description: "Jump to last entry",
    },
    KeyEntry {
        key: "PgUp / PgDn",
        description: "Move by one page",
    },
    KeyEntry {
        key: "Enter / l / →",
        description: "Enter directory / edit file",
    },
    KeyEntry {
        key: "b / Backspace",
        description: "Go back",
    },
    KeyEntry {
        key: "- / ←",
        description: "Go to parent directory",
    },
    KeyEntry {
        key: "h / .",
        description: "Toggle hidden files",
    },
    KeyEntry {
        key: "s",
        description: "Cycle sort (name → size → modified)",
    },
    KeyEntry {
        key: "S",
        description: "Toggle dirs first",
    },
    KeyEntry {
        key: "r",
        description: "Refresh",
    },
];

const FILE_OPS_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "n",
        description: "Create new file",
    },
    KeyEntry {
        key: "m",
        description: "Create new directory",
    },
    KeyEntry {
        key: "F2",
        description: "Rename entry",
    },
    KeyEntry {
        key: "d / Delete",
        description: "Delete entry",
    },
    KeyEntry {
        key: "Space",
        description: "Context menu",
    },
    KeyEntry {
        key: "o",
        description: "Open with default app",
    },
    KeyEntry {
        key: "e",
        description: "Open in editor",
    },
    KeyEntry {
        key: "y",
        description: "Copy path",
    },
    KeyEntry {
        key: "i",
        description: "Properties",
    },
];

const SEARCH_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "/",
        description: "Filter current directory",
    },
    KeyEntry {
        key: "Ctrl+P",
        description: "Search subdirectories",
    },
    KeyEntry {
        key: "Tab",
        description: "Switch filter / search",
    },
    KeyEntry {
        key: "Enter",
        description: "Go to selected match",
    },
    KeyEntry {
        key: "Esc",
        description: "Leave search",
    },
];

const MOUSE_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "Click",
        description: "Select entry",
    },
    KeyEntry {
        key: "Double click",
        description: "Enter directory / open file",
    },
    KeyEntry {
        key: "Right click",
        description: "Context menu",
    },
    KeyEntry {
        key: "Wheel",
        description: "Scroll",
    },
];

const GENERAL_KEYS: &[KeyEntry] = &[
    KeyEntry {
        key: "?",
        description: "Toggle this help",
    },
    KeyEntry {
        key: "q / Ctrl+C",
        description: "Quit",
    },
];

const CATEGORIES: &[KeyCategory] = &[
    KeyCategory {
        name: "Navigation",
        entries: NAVIGATION_KEYS,
    },
    KeyCategory {
        name: "File Operations",
        entries: FILE_OPS_KEYS,
    },
    KeyCategory {
        name: "Search",
        entries: SEARCH_KEYS,
    },
    KeyCategory {
        name: "Mouse",
        entries: MOUSE_KEYS,
    },
    KeyCategory {
        name: "General",
        entries: GENERAL_KEYS,
    },
];

/// Help overlay widget showing all keybindings.
#[derive(Default)]
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn new() -> Self {
        Self
    }

    /// Build all the lines for the help content.
    fn build_content_lines(&self) -> Vec<Line<'static>> {
        let accent = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let mut lines: Vec<Line<'static>> = vec![
            Line::from(Span::styled(" Keybinding Reference ", accent)),
            Line::from(""),
        ];

        for category in CATEGORIES {
            lines.push(Line::from(vec![
                Span::styled(format!("── {} ", category.name), accent),
                Span::styled("─".repeat(30), Style::default().fg(Color::DarkGray)),
            ]));

            for entry in category.entries {
                let key_padded = format!("  {:<18}", entry.key);
                lines.push(Line::from(vec![
                    Span::styled(
                        key_padded,
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(entry.description, Style::default().fg(Color::White)),
                ]));
            }

            lines.push(Line::from(""));
        }

        lines.push(Line::from(Span::styled(
            " Press ? or Esc to close ",
            Style::default().fg(Color::DarkGray),
        )));

        lines
    }

    /// Get total number of content lines.
    pub fn total_lines() -> usize {
        let mut count = 2; // title + blank
        for category in CATEGORIES {
            count += category.entries.len() + 2; // header + blank
        }
        count + 1 // footer
    }
}

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let overlay_width = (area.width as f32 * 0.70).min(70.0) as u16;
        let overlay_height = (area.height as f32 * 0.90) as u16;

        let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
        let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
        let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

        Clear.render(overlay_area, buf);

        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let inner = block.inner(overlay_area);
        block.render(overlay_area, buf);

        let content_lines = self.build_content_lines();
        let visible_height = inner.height as usize;

        for (i, line) in content_lines.iter().take(visible_height).enumerate() {
            buf.set_line(
                inner.x + 1,
                inner.y + i as u16,
                line,
                inner.width.saturating_sub(2),
            );
        }

        // Show how much is cut off on short terminals.
        let total = Self::total_lines();
        if total > visible_height && overlay_area.height > 0 {
            let indicator = format!(" {}/{} ", visible_height, total);
            let ind_span = Span::styled(indicator, Style::default().fg(Color::DarkGray));
            let ind_x = overlay_area.x
                + overlay_area
                    .width
                    .saturating_sub(ind_span.width() as u16 + 1);
            let ind_y = overlay_area.y + overlay_area.height - 1;
            buf.set_span(ind_x, ind_y, &ind_span, ind_span.width() as u16);
        }
    }
}
