use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, Focus};
use crate::tui::AppEvent;

/// A single edit on a one-line text buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    Insert(char),
    InsertStr(String),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Apply `op` to `text` at `cursor` (in chars). Returns true if the text changed.
pub fn apply_edit(text: &mut String, cursor: &mut usize, op: EditOp) -> bool {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match op {
        EditOp::Insert(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
            true
        }
        EditOp::InsertStr(s) => {
            // Single-line buffers: newlines from a paste become spaces
            let cleaned: String = s.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect();
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert_str(byte_pos, &cleaned);
            *cursor += cleaned.chars().count();
            !cleaned.is_empty()
        }
        EditOp::Backspace => {
            if *cursor == 0 {
                return false;
            }
            *cursor -= 1;
            let byte_pos = char_to_byte_index(text, *cursor);
            text.remove(byte_pos);
            true
        }
        EditOp::Delete => {
            if *cursor >= char_count {
                return false;
            }
            let byte_pos = char_to_byte_index(text, *cursor);
            text.remove(byte_pos);
            true
        }
        EditOp::Left => {
            *cursor = cursor.saturating_sub(1);
            false
        }
        EditOp::Right => {
            *cursor = (*cursor + 1).min(char_count);
            false
        }
        EditOp::Home => {
            *cursor = 0;
            false
        }
        EditOp::End => {
            *cursor = char_count;
            false
        }
    }
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => {
            if app.notice.is_none() {
                edit_focused(app, EditOp::InsertStr(text));
            }
        }
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // The notice is blocking: only dismissal gets through
    if app.notice.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_notice();
        }
        return;
    }

    match key.code {
        KeyCode::Tab | KeyCode::Down if app.focus != Focus::Transcript => app.focus_next(),
        KeyCode::BackTab | KeyCode::Up if app.focus != Focus::Transcript => app.focus_prev(),
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_prev(),
        _ => match app.focus {
            Focus::Field(_) => handle_field_key(app, key),
            Focus::Submit => handle_submit_key(app, key),
            Focus::Transcript => handle_transcript_key(app, key),
            Focus::FollowUp => handle_follow_up_key(app, key),
        },
    }
}

fn handle_field_key(app: &mut App, key: KeyEvent) {
    match key.code {
        // Enter moves through the form; on a complete form it submits
        KeyCode::Enter => {
            if app.snapshot.form.is_complete() && !app.is_busy() {
                app.submit();
            } else {
                app.focus_next();
            }
        }
        _ => handle_text_key(app, key),
    }
}

fn handle_submit_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') => {
            if !app.is_busy() {
                app.submit();
            }
        }
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        _ => {}
    }
}

fn handle_transcript_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.transcript_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.transcript_height / 2);
        }
        KeyCode::PageDown => app.scroll_down(app.transcript_height),
        KeyCode::PageUp => app.scroll_up(app.transcript_height),
        KeyCode::Char('g') => {
            app.pin_transcript = false;
            app.transcript_scroll = 0;
        }
        KeyCode::Char('G') => app.scroll_transcript_to_bottom(),
        KeyCode::Char('i') | KeyCode::Enter => app.focus = Focus::FollowUp,
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        _ => {}
    }
}

fn handle_follow_up_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.send(),
        KeyCode::Esc => app.focus = Focus::Transcript,
        _ => handle_text_key(app, key),
    }
}

fn handle_text_key(app: &mut App, key: KeyEvent) {
    let op = match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => EditOp::Insert(c),
        KeyCode::Backspace => EditOp::Backspace,
        KeyCode::Delete => EditOp::Delete,
        KeyCode::Left => EditOp::Left,
        KeyCode::Right => EditOp::Right,
        KeyCode::Home => EditOp::Home,
        KeyCode::End => EditOp::End,
        _ => return,
    };
    edit_focused(app, op);
}

fn edit_focused(app: &mut App, op: EditOp) {
    let Some(target) = app.focus.input_target() else {
        return;
    };
    if !app.can_edit(target) {
        return;
    }

    let mut text = app.input_text(target);
    let mut cursor = app.cursor(target);
    if apply_edit(&mut text, &mut cursor, op) {
        app.set_input_text(target, text);
    }
    app.set_cursor(target, cursor);
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_transcript = app
        .transcript_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_transcript {
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
    use crate::app::tests::{fill_form, settle, test_app};
    use crate::app::InputTarget;
    use crossterm::event::KeyEventState;
    use mutiger_weg_core::FormField;

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, press(KeyCode::Char(c))).unwrap();
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "Stärken";
        assert_eq!(char_to_byte_index(s, 2), 2);
        assert_eq!(char_to_byte_index(s, 3), 4); // 'ä' is two bytes
        assert_eq!(char_to_byte_index(s, 100), s.len());
    }

    #[test]
    fn test_edit_in_middle_of_umlauts() {
        let mut text = "Strken".to_string();
        let mut cursor = 2;
        assert!(apply_edit(&mut text, &mut cursor, EditOp::Insert('ä')));
        assert_eq!(text, "Stärken");
        assert_eq!(cursor, 3);

        assert!(apply_edit(&mut text, &mut cursor, EditOp::Backspace));
        assert_eq!(text, "Strken");
        assert_eq!(cursor, 2);
    }

    #[test]
    fn test_edit_bounds_are_no_ops() {
        let mut text = "ab".to_string();
        let mut cursor = 0;
        assert!(!apply_edit(&mut text, &mut cursor, EditOp::Backspace));
        cursor = 2;
        assert!(!apply_edit(&mut text, &mut cursor, EditOp::Delete));
        assert!(!apply_edit(&mut text, &mut cursor, EditOp::Right));
        assert_eq!(cursor, 2);
        assert_eq!(text, "ab");
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut text = String::new();
        let mut cursor = 0;
        apply_edit(&mut text, &mut cursor, EditOp::InsertStr("Technik\nNatur".to_string()));
        assert_eq!(text, "Technik Natur");
        assert_eq!(cursor, 13);
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut app = test_app("ok", false);
        type_text(&mut app, "Teamarbeit");
        handle_event(&mut app, press(KeyCode::Tab)).unwrap();
        type_text(&mut app, "Musik");

        assert_eq!(app.snapshot.form.traumjob, "Teamarbeit");
        assert_eq!(app.snapshot.form.interessen, "Musik");
        assert_eq!(app.focus, Focus::Field(FormField::Interessen));
    }

    #[test]
    fn test_enter_on_incomplete_form_advances_focus() {
        let mut app = test_app("ok", false);
        type_text(&mut app, "Teamarbeit");
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();
        assert_eq!(app.focus, Focus::Field(FormField::Interessen));
        assert!(app.task.is_none());
    }

    #[tokio::test]
    async fn test_notice_blocks_keys_until_dismissed() {
        let mut app = test_app("ok", false);
        app.notice = Some("Bitte fülle alle Felder aus.".to_string());

        type_text(&mut app, "x");
        assert!(app.snapshot.form.traumjob.is_empty());

        handle_event(&mut app, press(KeyCode::Enter)).unwrap();
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn test_enter_in_follow_up_sends_turn() {
        let mut app = test_app("Gerne!", false);
        fill_form(&mut app);
        app.focus = Focus::Submit;
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();
        settle(&mut app).await;
        assert_eq!(app.focus, Focus::FollowUp);

        type_text(&mut app, "Mehr zu Punkt 2");
        assert_eq!(app.cursor(InputTarget::FollowUp), 15);
        handle_event(&mut app, press(KeyCode::Enter)).unwrap();
        settle(&mut app).await;

        assert_eq!(app.snapshot.messages.len(), 5);
        assert!(app.snapshot.user_input.is_empty());
    }

    #[tokio::test]
    async fn test_follow_up_input_locked_while_busy() {
        let mut app = test_app("ok", false);
        fill_form(&mut app);
        app.submit();
        settle(&mut app).await;

        app.submit();
        assert!(app.is_busy());
        type_text(&mut app, "abc");
        assert!(app.controller.user_input().is_empty());
        settle(&mut app).await;
    }
}
