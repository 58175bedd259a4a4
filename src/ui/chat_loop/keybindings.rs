//! Key handling for the chat screen and the add-bot popup.
//!
//! Handlers only touch [`App`] state. Anything that needs the network is
//! returned as a [`KeyEffect`] for the loop to spawn.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui_textarea::Input as TAInput;

use crate::commands::{process_input, CommandResult};
use crate::core::app::{App, UiMode};
use crate::core::chat_stream::StreamParams;

const PAGE_SCROLL_LINES: u16 = 10;

#[derive(Debug)]
pub enum KeyEffect {
    None,
    Exit,
    StartStream(StreamParams),
    RefreshModels,
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyEffect {
    if is_ctrl(&key, 'c') {
        return KeyEffect::Exit;
    }

    if matches!(app.ui.mode, UiMode::AddPersona(_)) {
        handle_form_key(app, key);
        return KeyEffect::None;
    }

    handle_typing_key(app, key)
}

fn is_ctrl(key: &KeyEvent, ch: char) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(ch)
}

fn wants_newline(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter
        && (key.modifiers.contains(KeyModifiers::ALT)
            || key.modifiers.contains(KeyModifiers::SHIFT))
}

fn handle_typing_key(app: &mut App, key: KeyEvent) -> KeyEffect {
    if is_ctrl(&key, 'n') {
        if app.is_streaming() {
            app.ui.set_status("Wait for the current reply to finish.");
        } else {
            app.ui.open_persona_form();
        }
        return KeyEffect::None;
    }

    if is_ctrl(&key, 'b') {
        match app.cycle_persona(true) {
            Ok(name) => app.ui.set_status(format!("Bot: {name}")),
            Err(error) => app.ui.set_status(error),
        }
        return KeyEffect::None;
    }

    if is_ctrl(&key, 'o') {
        match app.session.cycle_model(true).map(str::to_string) {
            Some(model) => app.ui.set_status(format!("Model: {model}")),
            None => app.ui.set_status("No models to choose from"),
        }
        return KeyEffect::None;
    }

    if is_ctrl(&key, 'l') {
        match app.clear_current_chat() {
            Ok(()) => app.ui.set_status("Chat history cleared"),
            Err(error) => app.ui.set_status(error),
        }
        return KeyEffect::None;
    }

    match key.code {
        KeyCode::Esc => {
            if !app.ui.dismiss_notice() {
                app.ui.status = None;
            }
            KeyEffect::None
        }
        KeyCode::PageUp => {
            app.ui.scroll_up(PAGE_SCROLL_LINES);
            KeyEffect::None
        }
        KeyCode::PageDown => {
            app.ui.scroll_down(PAGE_SCROLL_LINES);
            KeyEffect::None
        }
        KeyCode::Enter if wants_newline(&key) => {
            app.ui.apply_textarea_edit(|ta| ta.insert_newline());
            KeyEffect::None
        }
        KeyCode::Enter => submit_input(app),
        _ => {
            app.ui.apply_textarea_edit(|ta| {
                ta.input(TAInput::from(key));
            });
            KeyEffect::None
        }
    }
}

fn submit_input(app: &mut App) -> KeyEffect {
    let input = app.ui.get_input_text();
    if input.trim().is_empty() {
        return KeyEffect::None;
    }
    app.ui.clear_input();
    app.ui.status = None;

    match process_input(app, &input) {
        CommandResult::Continue => KeyEffect::None,
        CommandResult::RefreshModels => KeyEffect::RefreshModels,
        CommandResult::ProcessAsMessage(prompt) => match app.submit_prompt(&prompt) {
            Ok(params) => KeyEffect::StartStream(params),
            Err(error) => {
                // Give the text back so it can be sent once the block clears.
                app.ui.set_input_text(&input);
                app.ui.set_status(error.to_string());
                KeyEffect::None
            }
        },
    }
}

/// Paste goes to whichever field has focus.
pub fn handle_paste(app: &mut App, text: &str) {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    if let Some(form) = app.ui.persona_form_mut() {
        form.insert_str(&text);
        return;
    }
    app.ui.apply_textarea_edit(|ta| {
        ta.insert_str(&text);
    });
}

fn handle_form_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.ui.close_persona_form();
            return;
        }
        KeyCode::Enter if wants_newline(&key) => {
            if let Some(form) = app.ui.persona_form_mut() {
                form.insert_newline();
            }
            return;
        }
        KeyCode::Enter => {
            app.submit_persona_form();
            return;
        }
        _ => {}
    }

    let Some(form) = app.ui.persona_form_mut() else {
        return;
    };
    match key.code {
        KeyCode::Tab => form.next_field(),
        KeyCode::BackTab => form.previous_field(),
        _ => form.input(key),
    }
}
