use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use girasol_widget::ChatBackend;
use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event<B: ChatBackend>(app: &mut App<B>, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Widget(event) => {
            app.widget.apply(event);
            app.follow_tail = true;
        }
    }
}

fn handle_key<B: ChatBackend>(app: &mut App<B>, key: KeyEvent) {
    // Global keys that work whether the panel is open or not
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => app.should_quit = true,
            KeyCode::Char('o') => app.widget.toggle(),
            _ => {}
        }
        return;
    }

    if app.widget.view().open {
        handle_open(app, key);
    } else {
        handle_closed(app, key);
    }
}

/// Only the launcher is on screen.
fn handle_closed<B: ChatBackend>(app: &mut App<B>, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Enter | KeyCode::Char(' ') => app.widget.toggle(),
        _ => {}
    }
}

fn handle_open<B: ChatBackend>(app: &mut App<B>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.widget.toggle(),
        KeyCode::Enter => app.send(),
        KeyCode::Up => app.scroll_up(),
        KeyCode::Down => app.scroll_down(),
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.widget.view().input.char_count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.widget.view().input.char_count();
        }
        // The disabled input ignores edits, like a disabled field in the page
        _ if !app.widget.view().input.enabled => {}
        KeyCode::Backspace => {
            if app.cursor > 0 {
                let mut value = app.widget.view().input.value().to_string();
                let byte_pos = char_to_byte_index(&value, app.cursor - 1);
                value.remove(byte_pos);
                let cursor = app.cursor - 1;
                app.edit_input(value, cursor);
            }
        }
        KeyCode::Delete => {
            let mut value = app.widget.view().input.value().to_string();
            if app.cursor < value.chars().count() {
                let byte_pos = char_to_byte_index(&value, app.cursor);
                value.remove(byte_pos);
                let cursor = app.cursor;
                app.edit_input(value, cursor);
            }
        }
        KeyCode::Char(c) => {
            // A full input rejects the keystroke like `maxlength`, wherever the cursor is
            let input = &app.widget.view().input;
            if input.char_count() >= input.max_chars() {
                return;
            }
            let mut value = app.widget.view().input.value().to_string();
            let byte_pos = char_to_byte_index(&value, app.cursor);
            value.insert(byte_pos, c);
            let cursor = app.cursor + 1;
            app.edit_input(value, cursor);
        }
        _ => {}
    }
}
