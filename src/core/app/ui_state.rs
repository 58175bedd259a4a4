use tui_textarea::TextArea;

use super::persona_form::PersonaForm;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMode {
    Typing,
    AddPersona(PersonaForm),
}

#[derive(Debug, Clone)]
pub struct UiState {
    textarea: TextArea<'static>,
    pub mode: UiMode,
    /// One-line feedback from the last command.
    pub status: Option<String>,
    /// The last remote failure, shown until the next successful action.
    pub error: Option<String>,
    /// Multi-line output of `/help` and `/bots`, dismissed with Esc.
    pub notice: Option<String>,
    /// Lines scrolled up from the bottom of the transcript.
    pub scroll_offset: u16,
    pub exit_requested: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            textarea: TextArea::default(),
            mode: UiMode::Typing,
            status: None,
            error: None,
            notice: None,
            scroll_offset: 0,
            exit_requested: false,
        }
    }

    pub fn textarea(&self) -> &TextArea<'static> {
        &self.textarea
    }

    pub fn get_input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.textarea = TextArea::default();
    }

    pub fn set_input_text(&mut self, text: &str) {
        self.textarea = TextArea::from(text.lines().map(str::to_string).collect::<Vec<_>>());
        self.textarea.move_cursor(tui_textarea::CursorMove::Bottom);
        self.textarea.move_cursor(tui_textarea::CursorMove::End);
    }

    pub fn apply_textarea_edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut TextArea<'static>),
    {
        f(&mut self.textarea);
    }

    pub fn input_line_count(&self) -> u16 {
        u16::try_from(self.textarea.lines().len()).unwrap_or(u16::MAX)
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn dismiss_notice(&mut self) -> bool {
        self.notice.take().is_some()
    }

    pub fn open_persona_form(&mut self) {
        self.mode = UiMode::AddPersona(PersonaForm::new());
    }

    pub fn close_persona_form(&mut self) {
        self.mode = UiMode::Typing;
    }

    pub fn persona_form_mut(&mut self) -> Option<&mut PersonaForm> {
        match &mut self.mode {
            UiMode::AddPersona(form) => Some(form),
            UiMode::Typing => None,
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::FormField;

    #[test]
    fn input_text_joins_lines() {
        let mut ui = UiState::new();
        ui.set_input_text("first\nsecond");
        assert_eq!(ui.get_input_text(), "first\nsecond");
        assert_eq!(ui.input_line_count(), 2);
        ui.clear_input();
        assert_eq!(ui.get_input_text(), "");
    }

    #[test]
    fn textarea_edits_apply() {
        let mut ui = UiState::new();
        ui.apply_textarea_edit(|ta| {
            ta.insert_str("hello");
        });
        assert_eq!(ui.get_input_text(), "hello");
    }

    #[test]
    fn scrolling_saturates_at_bottom() {
        let mut ui = UiState::new();
        ui.scroll_down(3);
        assert_eq!(ui.scroll_offset, 0);
        ui.scroll_up(5);
        ui.scroll_down(2);
        assert_eq!(ui.scroll_offset, 3);
        ui.scroll_to_bottom();
        assert_eq!(ui.scroll_offset, 0);
    }

    #[test]
    fn persona_form_opens_and_closes() {
        let mut ui = UiState::new();
        assert!(ui.persona_form_mut().is_none());
        ui.open_persona_form();
        ui.persona_form_mut().expect("form open").insert_str("x");
        assert!(
            matches!(&ui.mode, UiMode::AddPersona(form) if form.value(FormField::Name) == "x")
        );
        ui.close_persona_form();
        assert_eq!(ui.mode, UiMode::Typing);
    }
}
