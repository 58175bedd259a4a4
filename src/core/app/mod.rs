//! Application state shared by the interactive loop and the commands.
//!
//! [`App`] owns the [`SessionState`] and the [`UiState`] and tracks the one
//! chat exchange that may be in flight. The event loop turns key presses into
//! calls on `App`, spawns the network work those calls ask for, and feeds the
//! results back through [`App::handle_stream_message`] and
//! [`App::apply_model_listing`].

pub mod persona_form;
pub mod ui_state;

use std::error::Error as StdError;
use std::fmt;

use tracing::{debug, info};

use crate::core::chat_stream::{StreamMessage, StreamParams};
use crate::core::message::Message;
use crate::core::session::{ChatBlocked, SessionState};

pub use persona_form::{FormField, PersonaForm};
pub use ui_state::{UiMode, UiState};

const BUSY_MESSAGE: &str = "Wait for the current reply to finish.";

/// The reply currently being streamed, and who asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub persona: String,
    pub stream_id: u64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// A reply is still streaming.
    Busy,
    EmptyPrompt,
    /// No chat call may be attempted (listing pending, failed, or empty).
    Blocked(ChatBlocked),
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Busy => write!(f, "{BUSY_MESSAGE}"),
            ExchangeError::EmptyPrompt => write!(f, "Type a message first."),
            ExchangeError::Blocked(blocked) => write!(f, "{blocked}"),
        }
    }
}

impl StdError for ExchangeError {}

/// What the loop needs to fetch a model listing off the UI path.
pub struct ModelListingRequest {
    pub client: reqwest::Client,
    pub host: String,
}

pub struct App {
    pub session: SessionState,
    pub ui: UiState,
    client: reqwest::Client,
    pending: Option<PendingReply>,
    next_stream_id: u64,
}

impl App {
    pub fn new(client: reqwest::Client, session: SessionState) -> Self {
        Self {
            session,
            ui: UiState::new(),
            client,
            pending: None,
            next_stream_id: 0,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.pending.is_some()
    }

    /// The in-flight reply, if it belongs to the persona on screen.
    pub fn visible_pending_reply(&self) -> Option<&PendingReply> {
        self.pending
            .as_ref()
            .filter(|pending| pending.persona == self.session.selected_persona_name())
    }

    /// Start an exchange: record the user's entry on the selected persona and
    /// return the request to stream. Nothing is recorded when this fails.
    pub fn submit_prompt(&mut self, prompt: &str) -> Result<StreamParams, ExchangeError> {
        if self.is_streaming() {
            return Err(ExchangeError::Busy);
        }
        if prompt.trim().is_empty() {
            return Err(ExchangeError::EmptyPrompt);
        }
        let model = self
            .session
            .chat_ready()
            .map_err(ExchangeError::Blocked)?
            .to_string();

        self.session.append_to_current(Message::user(prompt));
        let persona = self.session.current_persona();
        let api_messages = persona.api_messages();
        let persona_name = persona.name.clone();

        self.next_stream_id += 1;
        let stream_id = self.next_stream_id;
        info!(persona = %persona_name, %model, stream_id, "sending chat request");

        self.pending = Some(PendingReply {
            persona: persona_name,
            stream_id,
            content: String::new(),
        });
        self.ui.clear_error();
        self.ui.dismiss_notice();
        self.ui.scroll_to_bottom();

        Ok(StreamParams {
            client: self.client.clone(),
            base_url: self.session.host().to_string(),
            model,
            api_messages,
            stream_id,
        })
    }

    /// Apply one message from the stream service. Returns whether anything
    /// visible changed.
    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };
        if pending.stream_id != stream_id {
            debug!(stream_id, current = pending.stream_id, "dropping stale stream message");
            return false;
        }

        match message {
            StreamMessage::Chunk(content) => {
                pending.content.push_str(&content);
            }
            StreamMessage::Error(error) => {
                // The user's entry stays; the partial reply is discarded.
                self.pending = None;
                self.ui.set_error(format!(
                    "An error occurred while communicating with Ollama: {error}"
                ));
            }
            StreamMessage::End => {
                if let Some(PendingReply {
                    persona, content, ..
                }) = self.pending.take()
                {
                    debug!(persona = %persona, chars = content.len(), "reply complete");
                    if let Some(target) = self.session.persona_mut(&persona) {
                        target.append_message(Message::assistant(content));
                    }
                }
            }
        }
        true
    }

    /// Mark the listing as loading and hand back what is needed to fetch it.
    pub fn begin_model_listing(&mut self) -> ModelListingRequest {
        self.session.mark_models_pending();
        ModelListingRequest {
            client: self.client.clone(),
            host: self.session.host().to_string(),
        }
    }

    /// Record a listing result fetched for `host`. Results for a host that is
    /// no longer current are ignored.
    pub fn apply_model_listing(&mut self, host: &str, result: Result<Vec<String>, String>) {
        if host != self.session.host() {
            debug!(%host, current = %self.session.host(), "ignoring listing for previous host");
            return;
        }
        let result = result.map_err(|error| listing_failure_message(host, &error));
        self.session.apply_model_listing(result);
    }

    pub fn select_persona(&mut self, name: &str) -> Result<(), String> {
        self.ensure_idle()?;
        self.session.select_persona(name).map_err(|e| e.to_string())?;
        self.ui.scroll_to_bottom();
        Ok(())
    }

    pub fn cycle_persona(&mut self, forward: bool) -> Result<String, String> {
        self.ensure_idle()?;
        let name = self.session.cycle_persona(forward).to_string();
        self.ui.scroll_to_bottom();
        Ok(name)
    }

    pub fn create_persona(
        &mut self,
        name: &str,
        description: &str,
        avatar: Option<String>,
    ) -> Result<String, String> {
        self.ensure_idle()?;
        let created = self
            .session
            .create_persona(name, description, avatar)
            .map_err(|e| e.to_string())?;
        self.ui.scroll_to_bottom();
        Ok(created)
    }

    /// Submit the add-bot form. Validation errors keep the form open.
    pub fn submit_persona_form(&mut self) {
        let Some(form) = self.ui.persona_form_mut() else {
            return;
        };
        let (name, description, avatar) = (
            form.value(FormField::Name),
            form.value(FormField::Description),
            form.avatar_value(),
        );

        match self.create_persona(&name, &description, avatar) {
            Ok(created) => {
                self.ui.close_persona_form();
                self.ui.set_status(format!("Created bot: {created}"));
            }
            Err(error) => {
                if let Some(form) = self.ui.persona_form_mut() {
                    form.error = Some(error);
                }
            }
        }
    }

    pub fn clear_current_chat(&mut self) -> Result<(), String> {
        self.ensure_idle()?;
        self.session.clear_current_chat();
        self.ui.clear_error();
        self.ui.scroll_to_bottom();
        Ok(())
    }

    /// Change the endpoint. The caller must fetch a new listing.
    pub fn set_host(&mut self, host: &str) -> Result<(), String> {
        self.ensure_idle()?;
        self.session.set_host(host)
    }

    fn ensure_idle(&self) -> Result<(), String> {
        if self.is_streaming() {
            Err(BUSY_MESSAGE.to_string())
        } else {
            Ok(())
        }
    }
}

pub fn listing_failure_message(host: &str, error: &str) -> String {
    format!(
        "Could not connect to Ollama at '{host}'. Please make sure Ollama is running and the host is correct.\nError details: {error}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::DEFAULT_PERSONA_NAME;
    use crate::core::session::ModelListing;
    use crate::utils::test_utils::{create_ready_app, create_test_app};

    fn transcript(app: &App) -> Vec<(String, String)> {
        app.session
            .current_persona()
            .transcript()
            .iter()
            .map(|m| (m.role.as_str().to_string(), m.content.clone()))
            .collect()
    }

    fn pair(role: &str, content: &str) -> (String, String) {
        (role.to_string(), content.to_string())
    }

    #[test]
    fn streamed_fragments_commit_as_one_assistant_entry() {
        let mut app = create_ready_app(&["llama3:latest"]);
        let params = app.submit_prompt("hi").expect("exchange starts");
        let id = params.stream_id;

        assert!(app.handle_stream_message(StreamMessage::Chunk("He".into()), id));
        assert_eq!(
            app.visible_pending_reply().map(|p| p.content.as_str()),
            Some("He")
        );
        assert!(app.handle_stream_message(StreamMessage::Chunk("llo".into()), id));
        assert!(app.handle_stream_message(StreamMessage::End, id));

        assert!(!app.is_streaming());
        assert_eq!(
            transcript(&app),
            vec![pair("user", "hi"), pair("assistant", "Hello")]
        );
    }

    #[test]
    fn request_carries_description_and_full_transcript() {
        let mut app = create_ready_app(&["llama3:latest"]);
        let first = app.submit_prompt("hi").expect("first exchange");
        app.handle_stream_message(StreamMessage::Chunk("Hello".into()), first.stream_id);
        app.handle_stream_message(StreamMessage::End, first.stream_id);

        let params = app.submit_prompt("how are you?").expect("second exchange");
        assert_eq!(params.model, "llama3:latest");
        assert_eq!(params.base_url, "http://localhost:11434");
        let sent: Vec<(&str, &str)> = params
            .api_messages
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str()))
            .collect();
        assert_eq!(
            sent,
            vec![
                ("system", "You are a helpful assistant."),
                ("user", "hi"),
                ("assistant", "Hello"),
                ("user", "how are you?"),
            ]
        );
        assert!(params.stream_id > first.stream_id);
    }

    #[test]
    fn failed_listing_prevents_any_chat_call() {
        let mut app = create_test_app();
        let host = app.session.host().to_string();
        app.apply_model_listing(&host, Err("connection refused".to_string()));

        let err = app.submit_prompt("hi").err().expect("blocked");
        assert!(matches!(err, ExchangeError::Blocked(ChatBlocked::ModelsFailed(_))));
        assert!(err.to_string().contains("Could not connect to Ollama"));
        assert!(err.to_string().contains("connection refused"));
        assert!(transcript(&app).is_empty());
        assert!(!app.is_streaming());
    }

    #[test]
    fn pending_listing_prevents_chat() {
        let mut app = create_test_app();
        assert_eq!(
            app.submit_prompt("hi").err(),
            Some(ExchangeError::Blocked(ChatBlocked::ModelsPending))
        );
    }

    #[test]
    fn mid_stream_error_keeps_the_user_entry_only() {
        let mut app = create_ready_app(&["llama3:latest"]);
        let id = app.submit_prompt("hi").expect("starts").stream_id;
        app.handle_stream_message(StreamMessage::Chunk("Hal".into()), id);
        app.handle_stream_message(StreamMessage::Error("Ollama error: boom".into()), id);
        // The service always follows an error with End.
        assert!(!app.handle_stream_message(StreamMessage::End, id));

        assert_eq!(transcript(&app), vec![pair("user", "hi")]);
        assert!(app
            .ui
            .error
            .as_deref()
            .is_some_and(|e| e.contains("Ollama error: boom")));
        assert!(!app.is_streaming());
    }

    #[test]
    fn one_exchange_at_a_time() {
        let mut app = create_ready_app(&["llama3:latest"]);
        let id = app.submit_prompt("first").expect("starts").stream_id;
        assert_eq!(app.submit_prompt("second").err(), Some(ExchangeError::Busy));
        assert!(app.select_persona(DEFAULT_PERSONA_NAME).is_err());
        assert!(app.clear_current_chat().is_err());
        assert!(app.set_host("other:11434").is_err());

        app.handle_stream_message(StreamMessage::End, id);
        assert_eq!(transcript(&app), vec![pair("user", "first"), pair("assistant", "")]);
    }

    #[test]
    fn stale_stream_messages_are_ignored() {
        let mut app = create_ready_app(&["llama3:latest"]);
        let id = app.submit_prompt("hi").expect("starts").stream_id;
        assert!(!app.handle_stream_message(StreamMessage::Chunk("x".into()), id + 1));
        assert!(!app.handle_stream_message(StreamMessage::End, id - 1));
        assert!(app.is_streaming());
    }

    #[test]
    fn empty_prompts_are_not_recorded() {
        let mut app = create_ready_app(&["llama3:latest"]);
        assert_eq!(app.submit_prompt("  \n").err(), Some(ExchangeError::EmptyPrompt));
        assert!(transcript(&app).is_empty());
    }

    #[test]
    fn listing_for_previous_host_is_ignored() {
        let mut app = create_test_app();
        let request = app.begin_model_listing();
        app.set_host("gpu-box:11434").expect("idle");
        app.apply_model_listing(&request.host, Ok(vec!["llama3".to_string()]));
        assert_eq!(app.session.models(), &ModelListing::Pending);

        app.apply_model_listing("http://gpu-box:11434", Ok(vec!["llama3".to_string()]));
        assert_eq!(app.session.chat_ready(), Ok("llama3"));
    }

    #[test]
    fn persona_form_creates_and_selects() {
        let mut app = create_test_app();
        app.ui.open_persona_form();
        let form = app.ui.persona_form_mut().expect("open");
        form.insert_str("Pirate Captain");
        app.submit_persona_form();

        // Missing description keeps the form open with the error.
        match &app.ui.mode {
            UiMode::AddPersona(form) => assert_eq!(
                form.error.as_deref(),
                Some("Please provide both a name and a description.")
            ),
            UiMode::Typing => panic!("form should stay open"),
        }

        let form = app.ui.persona_form_mut().expect("open");
        form.previous_field();
        form.insert_str("Speak like a pirate.");
        app.submit_persona_form();
        assert_eq!(app.ui.mode, UiMode::Typing);
        assert_eq!(app.session.selected_persona_name(), "Pirate Captain");
        assert_eq!(app.ui.status.as_deref(), Some("Created bot: Pirate Captain"));
    }

    #[test]
    fn reply_lands_on_the_persona_that_asked() {
        let mut app = create_ready_app(&["llama3:latest"]);
        app.create_persona("Pirate Captain", "Speak like a pirate.", None)
            .expect("created");
        let id = app.submit_prompt("ahoy").expect("starts").stream_id;
        app.handle_stream_message(StreamMessage::Chunk("Arr".into()), id);
        app.handle_stream_message(StreamMessage::End, id);

        assert_eq!(transcript(&app), vec![pair("user", "ahoy"), pair("assistant", "Arr")]);
        let assistant = app
            .session
            .roster()
            .get(DEFAULT_PERSONA_NAME)
            .expect("default persona");
        assert!(assistant.transcript().is_empty());
    }
}
