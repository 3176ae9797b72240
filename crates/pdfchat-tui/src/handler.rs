use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode, Picker, SettingsSection};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Apply a line-editing key to `text`. Returns false for keys it ignores.
fn edit_text(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(char_count),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = char_count,
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.file_browser.is_some() {
        handle_file_browser(app, key);
        return;
    }

    if app.picker.is_some() {
        handle_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.prev();
            return;
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Settings => handle_settings_normal(app, key),
        FocusPane::Question => handle_question_normal(app, key),
        FocusPane::Answer => match key.code {
            KeyCode::Char('j') | KeyCode::Down => app.scroll_answer(true),
            KeyCode::Char('k') | KeyCode::Up => app.scroll_answer(false),
            KeyCode::Char('g') | KeyCode::Home => app.answer_scroll = 0,
            _ => {}
        },
        FocusPane::History => match key.code {
            KeyCode::Char('j') | KeyCode::Down => app.scroll_history(true),
            KeyCode::Char('k') | KeyCode::Up => app.scroll_history(false),
            KeyCode::Char('g') | KeyCode::Home => {
                app.history_follow = false;
                app.history_scroll = 0;
            }
            KeyCode::Char('G') | KeyCode::End => app.history_follow = true,
            _ => {}
        },
    }
}

fn handle_settings_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.section_down(),
        KeyCode::Char('k') | KeyCode::Up => app.section_up(),
        KeyCode::Char('b') => app.start_build(),
        KeyCode::Enter | KeyCode::Char('l') => match app.section {
            SettingsSection::Model => app.open_picker(Picker::Model),
            SettingsSection::EmbeddingModel => app.open_picker(Picker::EmbeddingModel),
            SettingsSection::Files => app.open_file_browser(),
            SettingsSection::Build => app.start_build(),
            _ => app.begin_field_edit(),
        },
        _ => {}
    }
}

fn handle_question_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('i') => {
            if app.state.can_ask() {
                app.question_cursor = app.state.question.chars().count();
                app.input_mode = InputMode::Editing;
            } else {
                app.status_message = Some("Build the index before asking questions.".to_string());
            }
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.focus {
        FocusPane::Settings => match key.code {
            KeyCode::Esc => app.cancel_field_edit(),
            KeyCode::Enter => app.commit_field_edit(),
            _ => {
                edit_text(&mut app.field_input, &mut app.field_cursor, key);
            }
        },
        FocusPane::Question => match key.code {
            KeyCode::Esc => app.input_mode = InputMode::Normal,
            KeyCode::Enter => app.start_query(),
            _ => {
                edit_text(&mut app.state.question, &mut app.question_cursor, key);
            }
        },
        _ => app.input_mode = InputMode::Normal,
    }
}

fn handle_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.picker = None,
        KeyCode::Char('j') | KeyCode::Down => app.picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.picker_nav_up(),
        KeyCode::Enter => app.select_picked(),
        _ => {}
    }
}

fn handle_file_browser(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.file_browser = None;
            return;
        }
        KeyCode::Char('a') => {
            app.accept_file_browser();
            return;
        }
        _ => {}
    }

    let Some(browser) = app.file_browser.as_mut() else {
        return;
    };

    let result = match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            browser.nav_down();
            Ok(())
        }
        KeyCode::Char('k') | KeyCode::Up => {
            browser.nav_up();
            Ok(())
        }
        KeyCode::Char(' ') => {
            browser.toggle_mark();
            Ok(())
        }
        KeyCode::Enter | KeyCode::Char('l') => browser.activate(),
        KeyCode::Backspace | KeyCode::Char('h') => browser.go_parent(),
        _ => Ok(()),
    };

    if let Err(err) = result {
        app.status_message = Some(err.to_string());
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let down = match mouse.kind {
        MouseEventKind::ScrollDown => true,
        MouseEventKind::ScrollUp => false,
        _ => return,
    };

    let inside = |area: Option<Rect>| {
        area.is_some_and(|a| {
            mouse.column >= a.x
                && mouse.column < a.x + a.width
                && mouse.row >= a.y
                && mouse.row < a.y + a.height
        })
    };

    if inside(app.history_area) {
        app.scroll_history(down);
    } else if inside(app.answer_area) {
        app.scroll_answer(down);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::AppEvent;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use pdfchat_core::{BackendClient, Configuration, ConsoleState};

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    async fn press(app: &mut App, codes: &[KeyCode]) {
        for code in codes {
            handle_event(app, key(*code)).await.unwrap();
        }
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    fn app() -> App {
        App::new(
            ConsoleState::new(Configuration::default()),
            BackendClient::new("http://127.0.0.1:9"),
        )
    }

    #[test]
    fn test_edit_text_utf8() {
        let mut text = String::from("héllo");
        let mut cursor = 2;
        let backspace = KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE);
        assert!(edit_text(&mut text, &mut cursor, backspace));
        assert_eq!(text, "hllo");
        assert_eq!(cursor, 1);

        let ch = KeyEvent::new(KeyCode::Char('é'), KeyModifiers::NONE);
        edit_text(&mut text, &mut cursor, ch);
        assert_eq!(text, "héllo");

        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert!(!edit_text(&mut text, &mut cursor, tab));
    }

    #[tokio::test]
    async fn test_edit_chunk_overlap_with_keys() {
        let mut app = app();
        // Model -> Embedding -> Files -> Chunk Size -> Chunk Overlap
        press(&mut app, &[KeyCode::Char('j'); 4]).await;
        assert_eq!(app.section, SettingsSection::ChunkOverlap);

        press(&mut app, &[KeyCode::Enter]).await;
        press(&mut app, &[KeyCode::Backspace; 3]).await;
        type_text(&mut app, "50").await;
        press(&mut app, &[KeyCode::Enter]).await;

        assert_eq!(app.state.config.chunk_overlap, 50);
        assert_eq!(app.state.config.chunk_size, 1000);
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[tokio::test]
    async fn test_escape_discards_field_edit() {
        let mut app = app();
        app.section = SettingsSection::SimilarityThreshold;
        press(&mut app, &[KeyCode::Enter]).await;
        type_text(&mut app, "9").await;
        press(&mut app, &[KeyCode::Esc]).await;
        assert_eq!(app.state.config.similarity_threshold, 0.7);
    }

    #[tokio::test]
    async fn test_question_disabled_until_ready() {
        let mut app = app();
        press(&mut app, &[KeyCode::Tab]).await;
        assert_eq!(app.focus, FocusPane::Question);

        press(&mut app, &[KeyCode::Enter]).await;
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.status_message.is_some());

        // Typing goes nowhere while disabled
        type_text(&mut app, "x").await;
        assert!(app.state.question.is_empty());
        assert!(app.query_task.is_none());
    }

    #[tokio::test]
    async fn test_question_editing_when_ready() {
        let mut app = app();
        app.state.build.ready = true;
        press(&mut app, &[KeyCode::Tab, KeyCode::Enter]).await;
        assert_eq!(app.input_mode, InputMode::Editing);

        type_text(&mut app, "Wht").await;
        press(&mut app, &[KeyCode::Left]).await;
        type_text(&mut app, "a").await;
        assert_eq!(app.state.question, "What");

        press(&mut app, &[KeyCode::Esc]).await;
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.query_task.is_none());
    }

    #[tokio::test]
    async fn test_model_picker_keys() {
        let mut app = app();
        press(&mut app, &[KeyCode::Enter]).await;
        assert_eq!(app.picker, Some(Picker::Model));

        press(&mut app, &[KeyCode::Char('j'), KeyCode::Char('j'), KeyCode::Esc]).await;
        assert!(app.picker.is_none());
        assert_eq!(app.state.config.model, Configuration::default().model);

        press(&mut app, &[KeyCode::Enter, KeyCode::Char('j'), KeyCode::Enter]).await;
        assert_eq!(app.state.config.model, pdfchat_core::GENERATION_MODELS[1]);
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = app();
        press(&mut app, &[KeyCode::Char('q')]).await;
        assert!(app.should_quit);

        let mut app = self::app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        )
        .await
        .unwrap();
        assert!(app.should_quit);
    }
}
