//! Process-lifetime chat state: the persona roster, which persona and model
//! are selected, and the endpoint those models came from.

use std::fmt;

use tracing::{debug, info, warn};

use crate::core::config::Config;
use crate::core::message::Message;
use crate::core::persona::{Persona, PersonaError, PersonaRoster};
use crate::utils::url::normalize_host;

/// Result of the most recent `/api/tags` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelListing {
    /// A listing is in flight, or the host just changed.
    Pending,
    Loaded(Vec<String>),
    Failed(String),
}

/// Why a chat request may not be attempted right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatBlocked {
    ModelsPending,
    ModelsFailed(String),
    NoModels,
}

impl fmt::Display for ChatBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatBlocked::ModelsPending => write!(f, "Still loading the model list."),
            ChatBlocked::ModelsFailed(error) => write!(f, "{error}"),
            ChatBlocked::NoModels => write!(
                f,
                "No models are installed on this Ollama server. Pull one with `ollama pull <model>`."
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    roster: PersonaRoster,
    selected_persona: String,
    host: String,
    models: ModelListing,
    selected_model: Option<String>,
    preferred_model: Option<String>,
}

impl SessionState {
    pub fn new(roster: PersonaRoster, host: &str) -> Self {
        let roster = if roster.is_empty() {
            PersonaRoster::default()
        } else {
            roster
        };
        let selected_persona = roster
            .by_index(0)
            .map(|persona| persona.name.clone())
            .unwrap_or_default();

        Self {
            roster,
            selected_persona,
            host: normalize_host(host),
            models: ModelListing::Pending,
            selected_model: None,
            preferred_model: None,
        }
    }

    /// Build the startup state from the config file and command-line overrides.
    pub fn from_config(
        config: &Config,
        host: &str,
        model: Option<&str>,
        persona: Option<&str>,
    ) -> Result<Self, PersonaError> {
        let mut session = Self::new(PersonaRoster::from_config(config), host);
        session.preferred_model = model
            .map(str::to_string)
            .or_else(|| config.default_model.clone())
            .filter(|model| !model.trim().is_empty());

        match (persona, config.default_persona.as_deref()) {
            (Some(name), _) => session.select_persona(name)?,
            (None, Some(name)) => {
                if let Err(err) = session.select_persona(name) {
                    warn!(error = %err, "ignoring configured default persona");
                }
            }
            (None, None) => {}
        }
        Ok(session)
    }

    pub fn roster(&self) -> &PersonaRoster {
        &self.roster
    }

    pub fn selected_persona_name(&self) -> &str {
        &self.selected_persona
    }

    pub fn current_persona(&self) -> &Persona {
        // The selected name is only ever set to a key of the roster.
        self.roster
            .get(&self.selected_persona)
            .or_else(|| self.roster.by_index(0))
            .expect("roster is never empty")
    }

    pub fn persona_mut(&mut self, name: &str) -> Option<&mut Persona> {
        self.roster.get_mut(name)
    }

    pub fn select_persona(&mut self, name: &str) -> Result<(), PersonaError> {
        let name = name.trim();
        if !self.roster.contains(name) {
            return Err(self.roster.not_found(name));
        }
        debug!(persona = %name, "selected persona");
        self.selected_persona = name.to_string();
        Ok(())
    }

    /// Create a persona and switch to it.
    pub fn create_persona(
        &mut self,
        name: &str,
        description: &str,
        avatar: Option<String>,
    ) -> Result<String, PersonaError> {
        let created = self.roster.create(name, description, avatar)?.name.clone();
        info!(persona = %created, "created persona");
        self.selected_persona = created.clone();
        Ok(created)
    }

    pub fn cycle_persona(&mut self, forward: bool) -> &str {
        let len = self.roster.len();
        let current = self.roster.position(&self.selected_persona).unwrap_or(0);
        let next = step_index(current, len, forward);
        if let Some(persona) = self.roster.by_index(next) {
            self.selected_persona = persona.name.clone();
        }
        &self.selected_persona
    }

    pub fn append_to_current(&mut self, message: Message) {
        let name = self.selected_persona.clone();
        if let Some(persona) = self.roster.get_mut(&name) {
            persona.append_message(message);
        }
    }

    /// Empty the selected persona's transcript.
    pub fn clear_current_chat(&mut self) {
        let name = self.selected_persona.clone();
        if let Some(persona) = self.roster.get_mut(&name) {
            persona.clear_transcript();
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Point at a new endpoint. The old listing no longer applies.
    pub fn set_host(&mut self, host: &str) -> Result<(), String> {
        let normalized = normalize_host(host);
        if normalized.is_empty() {
            return Err("Host cannot be empty.".to_string());
        }
        info!(host = %normalized, "host changed");
        self.host = normalized;
        self.mark_models_pending();
        Ok(())
    }

    pub fn models(&self) -> &ModelListing {
        &self.models
    }

    /// A pending listing has no selection; the current model is remembered
    /// as preferred so the next listing can restore it.
    pub fn mark_models_pending(&mut self) {
        self.models = ModelListing::Pending;
        if let Some(model) = self.selected_model.take() {
            self.preferred_model = Some(model);
        }
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.selected_model.as_deref()
    }

    /// Record the outcome of a listing call. A loaded listing keeps the
    /// current model if it is still offered, then tries the preferred model,
    /// then falls back to the first entry.
    pub fn apply_model_listing(&mut self, result: Result<Vec<String>, String>) {
        match result {
            Ok(models) => {
                let keep = |candidate: &Option<String>| {
                    candidate
                        .as_ref()
                        .filter(|name| models.contains(name))
                        .cloned()
                };
                self.selected_model = keep(&self.selected_model)
                    .or_else(|| keep(&self.preferred_model))
                    .or_else(|| models.first().cloned());
                debug!(count = models.len(), selected = ?self.selected_model, "models loaded");
                self.models = ModelListing::Loaded(models);
            }
            Err(error) => {
                warn!(host = %self.host, %error, "model listing failed");
                self.selected_model = None;
                self.models = ModelListing::Failed(error);
            }
        }
    }

    pub fn select_model(&mut self, name: &str) -> Result<(), String> {
        let name = name.trim();
        match &self.models {
            ModelListing::Loaded(models) if models.iter().any(|model| model == name) => {
                self.selected_model = Some(name.to_string());
                self.preferred_model = Some(name.to_string());
                Ok(())
            }
            ModelListing::Loaded(models) => Err(format!(
                "Model '{}' is not available. Available models: {}",
                name,
                models.join(", ")
            )),
            other => Err(ChatBlocked::from_listing(other)
                .map(|blocked| blocked.to_string())
                .unwrap_or_default()),
        }
    }

    pub fn cycle_model(&mut self, forward: bool) -> Option<&str> {
        let ModelListing::Loaded(models) = &self.models else {
            return None;
        };
        if models.is_empty() {
            return None;
        }
        let current = self
            .selected_model
            .as_ref()
            .and_then(|selected| models.iter().position(|model| model == selected))
            .unwrap_or(0);
        let next = step_index(current, models.len(), forward);
        self.selected_model = models.get(next).cloned();
        self.preferred_model = self.selected_model.clone();
        self.selected_model.as_deref()
    }

    /// The model to chat with, or the reason no chat call may be made.
    pub fn chat_ready(&self) -> Result<&str, ChatBlocked> {
        if let Some(blocked) = ChatBlocked::from_listing(&self.models) {
            return Err(blocked);
        }
        self.selected_model.as_deref().ok_or(ChatBlocked::NoModels)
    }
}

impl ChatBlocked {
    fn from_listing(listing: &ModelListing) -> Option<Self> {
        match listing {
            ModelListing::Pending => Some(ChatBlocked::ModelsPending),
            ModelListing::Failed(error) => Some(ChatBlocked::ModelsFailed(error.clone())),
            ModelListing::Loaded(models) if models.is_empty() => Some(ChatBlocked::NoModels),
            ModelListing::Loaded(_) => None,
        }
    }
}

fn step_index(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    }
}
