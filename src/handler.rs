use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tracing::trace;

use crate::app::{App, ModeKind, RenderIntent, SCROLL_STEP};
use crate::event::Event;
use crate::search::SearchMode;

/// Apply one event to the app and describe the result for the renderer.
pub fn handle_event(app: &mut App, event: Event) -> RenderIntent {
    let before = app.snapshot();
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse, Instant::now()),
        Event::Resize(width, height) => trace!(width, height, "resize"),
        Event::Tick => app.tick(Instant::now()),
    }
    app.render_intent(Some(before))
}

/// Route a key press to the active mode. Modal modes see every key, so
/// quit is unreachable from them.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') && !app.is_modal() {
        app.quit();
        return;
    }

    match app.mode.kind() {
        ModeKind::Browsing => browsing_key(app, key, ctrl),
        ModeKind::Searching => searching_key(app, key, ctrl),
        ModeKind::AwaitingName => prompt_key(app, key, ctrl),
        ModeKind::AwaitingDeleteConfirm => confirm_key(app, key),
        ModeKind::ContextMenu => menu_key(app, key),
        ModeKind::Help => help_key(app, key),
        ModeKind::Properties => app.cancel(),
    }
}

fn browsing_key(app: &mut App, key: KeyEvent, ctrl: bool) {
    if ctrl {
        if key.code == KeyCode::Char('p') {
            app.begin_search(SearchMode::Recursive);
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),

        KeyCode::Char('j') | KeyCode::Down => app.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_cursor(-1),
        KeyCode::Char('g') | KeyCode::Home => app.cursor_first(),
        KeyCode::Char('G') | KeyCode::End => app.cursor_last(),
        KeyCode::PageDown => app.move_cursor(app.page_size()),
        KeyCode::PageUp => app.move_cursor(-app.page_size()),

        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.activate(),
        KeyCode::Char('b') | KeyCode::Backspace => app.go_back(),
        KeyCode::Char('-') | KeyCode::Left => app.go_parent(),

        KeyCode::Char('/') => app.begin_search(SearchMode::Flat),

        KeyCode::Char('n') => app.start_create(false),
        KeyCode::Char('m') => app.start_create(true),
        KeyCode::F(2) => app.start_rename(),
        KeyCode::Char('d') | KeyCode::Delete => app.start_delete(),
        KeyCode::Char(' ') => app.open_context_menu(),

        KeyCode::Char('h') | KeyCode::Char('.') => app.toggle_hidden(),
        KeyCode::Char('s') => app.cycle_sort(),
        KeyCode::Char('S') => app.toggle_dirs_first(),
        KeyCode::Char('r') => app.refresh(),

        KeyCode::Char('o') => app.open_default(),
        KeyCode::Char('e') => app.open_in_editor(),
        KeyCode::Char('y') => app.copy_path(),
        KeyCode::Char('i') => app.show_properties(),
        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

fn searching_key(app: &mut App, key: KeyEvent, ctrl: bool) {
    match key.code {
        KeyCode::Esc => app.end_search(),
        KeyCode::Enter => app.activate(),
        KeyCode::Tab => app.toggle_search_mode(),
        KeyCode::Backspace => app.edit_query(|q| {
            q.pop();
        }),
        KeyCode::Up => app.move_cursor(-1),
        KeyCode::Down => app.move_cursor(1),
        KeyCode::PageUp => app.move_cursor(-app.page_size()),
        KeyCode::PageDown => app.move_cursor(app.page_size()),
        KeyCode::Char(c) if !ctrl => app.edit_query(|q| q.push(c)),
        _ => {}
    }
}

fn prompt_key(app: &mut App, key: KeyEvent, ctrl: bool) {
    match key.code {
        KeyCode::Esc => app.cancel(),
        KeyCode::Enter => app.confirm_prompt(),
        code => {
            let Some(prompt) = app.prompt_mut() else {
                return;
            };
            match code {
                KeyCode::Backspace => prompt.delete_back(),
                KeyCode::Delete => prompt.delete_forward(),
                KeyCode::Left => prompt.move_left(),
                KeyCode::Right => prompt.move_right(),
                KeyCode::Home => prompt.home(),
                KeyCode::End => prompt.end(),
                KeyCode::Char(c) if !ctrl => prompt.insert_char(c),
                _ => {}
            }
        }
    }
}

/// Only an explicit answer resolves a delete; every other key is dropped.
fn confirm_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_delete(false),
        _ => {}
    }
}

fn menu_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel(),
        KeyCode::Up | KeyCode::Char('k') => app.menu_move(-1),
        KeyCode::Down | KeyCode::Char('j') => app.menu_move(1),
        KeyCode::Enter => app.menu_choose(None),
        KeyCode::Char(c) => {
            if let Some(digit) = c.to_digit(10).filter(|d| *d >= 1) {
                app.menu_choose(Some(digit as usize - 1));
            }
        }
        _ => {}
    }
}

fn help_key(app: &mut App, key: KeyEvent) {
    if matches!(
        key.code,
        KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
    ) {
        app.toggle_help();
    }
}

/// Route a mouse event. `now` drives double click detection.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, now: Instant) {
    let mode = app.mode.kind();
    match mouse.kind {
        MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
            let delta = if mouse.kind == MouseEventKind::ScrollDown {
                SCROLL_STEP
            } else {
                -SCROLL_STEP
            };
            match mode {
                ModeKind::Browsing | ModeKind::Searching | ModeKind::Help => app.move_cursor(delta),
                ModeKind::ContextMenu => app.menu_move(delta.signum()),
                _ => {}
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            if !matches!(mode, ModeKind::Browsing | ModeKind::Searching) {
                return;
            }
            if let Some(row) = app.row_at(mouse.column, mouse.row) {
                if app.click_row(row, now) {
                    app.activate_by_click();
                }
            }
        }
        MouseEventKind::Down(MouseButton::Right) => {
            if mode != ModeKind::Browsing {
                return;
            }
            if let Some(row) = app.row_at(mouse.column, mouse.row) {
                app.select_row(row);
                app.open_context_menu();
            }
        }
        _ => {}
    }
}
