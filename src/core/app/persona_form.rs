//! State of the "add bot" popup.
//!
//! Each field is its own [`TextArea`], so cursor movement and word edits
//! behave the same as in the chat input. Only the description accepts line
//! breaks.

use ratatui::crossterm::event::KeyEvent;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders};
use tui_textarea::{Input as TAInput, Key, TextArea};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Avatar,
    Description,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            FormField::Name => "Bot Name",
            FormField::Avatar => "Avatar (optional emoji)",
            FormField::Description => "Bot Description (System Prompt)",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            FormField::Name => "e.g., Pirate Captain",
            FormField::Avatar => "e.g., 🦜",
            FormField::Description => {
                "e.g., You are a Pirate Captain. All your responses must be in pirate speak."
            }
        }
    }

    fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Avatar,
            FormField::Avatar => FormField::Description,
            FormField::Description => FormField::Name,
        }
    }

    fn previous(self) -> Self {
        match self {
            FormField::Name => FormField::Description,
            FormField::Avatar => FormField::Name,
            FormField::Description => FormField::Avatar,
        }
    }

    fn is_multiline(self) -> bool {
        self == FormField::Description
    }
}

pub const FORM_FIELDS: [FormField; 3] = [FormField::Name, FormField::Avatar, FormField::Description];

#[derive(Debug, Clone)]
pub struct PersonaForm {
    name: TextArea<'static>,
    avatar: TextArea<'static>,
    description: TextArea<'static>,
    focus: FormField,
    /// Validation failure from the last submit; the form stays open.
    pub error: Option<String>,
}

impl Default for PersonaForm {
    fn default() -> Self {
        Self::new()
    }
}

// Text areas carry widget styling; two forms are equal when their contents are.
impl PartialEq for PersonaForm {
    fn eq(&self, other: &Self) -> bool {
        self.focus == other.focus
            && self.error == other.error
            && FORM_FIELDS
                .into_iter()
                .all(|field| self.textarea(field).lines() == other.textarea(field).lines())
    }
}

impl Eq for PersonaForm {}

fn field_textarea(field: FormField) -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_placeholder_text(field.placeholder());
    textarea.set_placeholder_style(Style::default().fg(Color::DarkGray));
    textarea.set_cursor_line_style(Style::default());
    textarea
}

/// Keys tui-textarea turns into a line break.
fn starts_new_line(input: &TAInput) -> bool {
    match input.key {
        Key::Enter => true,
        Key::Char('m') | Key::Char('j') => input.ctrl,
        _ => false,
    }
}

impl PersonaForm {
    pub fn new() -> Self {
        let mut form = Self {
            name: field_textarea(FormField::Name),
            avatar: field_textarea(FormField::Avatar),
            description: field_textarea(FormField::Description),
            focus: FormField::Name,
            error: None,
        };
        form.refresh_focus_styles();
        form
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn textarea(&self, field: FormField) -> &TextArea<'static> {
        match field {
            FormField::Name => &self.name,
            FormField::Avatar => &self.avatar,
            FormField::Description => &self.description,
        }
    }

    fn textarea_mut(&mut self, field: FormField) -> &mut TextArea<'static> {
        match field {
            FormField::Name => &mut self.name,
            FormField::Avatar => &mut self.avatar,
            FormField::Description => &mut self.description,
        }
    }

    pub fn value(&self, field: FormField) -> String {
        self.textarea(field).lines().join("\n")
    }

    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
        self.refresh_focus_styles();
    }

    pub fn previous_field(&mut self) {
        self.focus = self.focus.previous();
        self.refresh_focus_styles();
    }

    /// Only the focused field shows a cursor and a highlighted border.
    fn refresh_focus_styles(&mut self) {
        let focus = self.focus;
        for field in FORM_FIELDS {
            let (border, cursor) = if field == focus {
                (
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                    Style::default().add_modifier(Modifier::REVERSED),
                )
            } else {
                (Style::default(), Style::default())
            };
            let textarea = self.textarea_mut(field);
            textarea.set_cursor_style(cursor);
            textarea.set_block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(field.label()),
            );
        }
    }

    /// Forward a key to the focused field.
    pub fn input(&mut self, key: KeyEvent) {
        let input = TAInput::from(key);
        if !self.focus.is_multiline() && starts_new_line(&input) {
            return;
        }
        let field = self.focus;
        self.textarea_mut(field).input(input);
    }

    pub fn insert_newline(&mut self) {
        if self.focus.is_multiline() {
            self.description.insert_newline();
        }
    }

    /// Insert pasted text; single-line fields get a space for each line break.
    pub fn insert_str(&mut self, text: &str) {
        let field = self.focus;
        let textarea = self.textarea_mut(field);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                if field.is_multiline() {
                    textarea.insert_newline();
                } else {
                    textarea.insert_char(' ');
                }
            }
            textarea.insert_str(line);
        }
    }

    pub fn avatar_value(&self) -> Option<String> {
        let avatar = self.value(FormField::Avatar);
        let avatar = avatar.trim();
        (!avatar.is_empty()).then(|| avatar.to_string())
    }
}
