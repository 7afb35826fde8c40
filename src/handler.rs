use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => app.on_resize(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Reply { seq, outcome } => app.apply_reply(seq, outcome),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        _ => match app.input_mode {
            InputMode::Normal => handle_normal_mode(app, key),
            InputMode::Editing => handle_editing_mode(app, key),
        },
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Enter | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
            app.mark_dirty();
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_down(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_up(),
        KeyCode::Char('g') => app.scroll_up(u16::MAX),
        KeyCode::Char('G') => {
            app.follow_tail = true;
            app.scroll_to_bottom();
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let input = &mut app.widget.input;
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.mark_dirty();
            return;
        }
        // Input stays open while replies are pending; submissions may overlap
        KeyCode::Enter => {
            app.submit();
            return;
        }
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => input.clear(),
        KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            input.insert(c)
        }
        _ => return,
    }
    app.widget.touch();
}

/// The input is a single line, so pasted line breaks become spaces
fn handle_paste(app: &mut App, text: &str) {
    if app.input_mode != InputMode::Editing {
        return;
    }
    let line = text.replace("\r\n", "\n").replace(['\r', '\n'], " ");
    app.widget.input.insert_str(&line);
    app.widget.touch();
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatBackend, ChatError};
    use crate::state::ChatPayload;
    use crate::widget::ChatWidget;
    use async_trait::async_trait;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct NeverCalled;

    #[async_trait]
    impl ChatBackend for NeverCalled {
        async fn chat(&self, _payload: &ChatPayload) -> Result<Value, ChatError> {
            Ok(json!({"reply": "ok"}))
        }
    }

    fn new_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(ChatWidget::new("Hello"), Arc::new(NeverCalled), tx, "http://localhost:8000")
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_edits_input() {
        let mut app = new_app();
        type_text(&mut app, "Lehh");
        handle_event(&mut app, key(KeyCode::Backspace));
        handle_event(&mut app, key(KeyCode::Home));
        type_text(&mut app, "To ");
        assert_eq!(app.widget.input.as_str(), "To Leh");
    }

    #[test]
    fn test_enter_on_blank_input_does_nothing() {
        let mut app = new_app();
        type_text(&mut app, "  ");
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.widget.messages().len(), 1);
        assert_eq!(app.widget.input.as_str(), "  ");
    }

    #[tokio::test]
    async fn test_enter_submits() {
        let mut app = new_app();
        type_text(&mut app, "Kasol weather");
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.widget.messages().len(), 2);
        assert!(app.widget.input.is_empty());
        // Still editing: the user can keep typing while the reply is pending
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_reply_event_is_applied() {
        let mut app = new_app();
        handle_event(
            &mut app,
            AppEvent::Reply {
                seq: 7,
                outcome: Err(ChatError::Transport("timeout".to_string())),
            },
        );
        assert_eq!(app.widget.messages().last().unwrap().text, "Error: timeout");
    }

    #[test]
    fn test_modified_chars_are_not_typed() {
        let mut app = new_app();
        type_text(&mut app, "Goa");
        for (c, modifiers) in [
            ('d', KeyModifiers::CONTROL),
            ('w', KeyModifiers::CONTROL),
            ('x', KeyModifiers::ALT),
        ] {
            handle_event(&mut app, AppEvent::Key(KeyEvent::new(KeyCode::Char(c), modifiers)));
        }
        assert_eq!(app.widget.input.as_str(), "Goa");

        // Shift is how capitals arrive, so it still types
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('!'), KeyModifiers::SHIFT)),
        );
        assert_eq!(app.widget.input.as_str(), "Goa!");
    }

    #[test]
    fn test_paste_inserts_at_cursor() {
        let mut app = new_app();
        type_text(&mut app, "Trip to ");
        handle_event(&mut app, AppEvent::Paste("Spiti\nvalley".to_string()));
        assert_eq!(app.widget.input.as_str(), "Trip to Spiti valley");
        assert_eq!(app.widget.input.cursor(), 20);

        // Ignored outside editing mode
        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, AppEvent::Paste("more".to_string()));
        assert_eq!(app.widget.input.as_str(), "Trip to Spiti valley");
    }

    #[test]
    fn test_quit_keys() {
        let mut app = new_app();
        // 'q' is text while editing
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.should_quit);
        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = new_app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
    }
}
