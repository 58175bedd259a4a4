use std::error::Error as StdError;
use std::fmt;

use tracing::warn;

use crate::api::ChatMessage;
use crate::core::config::{Config, PersonaConfig};
use crate::core::constants::{DEFAULT_AVATAR, DEFAULT_PERSONA_DESCRIPTION, DEFAULT_PERSONA_NAME};
use crate::core::message::Message;

/// A named system instruction with its own conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    /// Sent verbatim as the system message of every request.
    pub description: String,
    pub avatar: Option<String>,
    transcript: Vec<Message>,
}

impl Persona {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        avatar: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            avatar: avatar.filter(|value| !value.trim().is_empty()),
            transcript: Vec::new(),
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn append_message(&mut self, message: Message) {
        self.transcript.push(message);
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    pub fn display_avatar(&self) -> &str {
        self.avatar.as_deref().unwrap_or(DEFAULT_AVATAR)
    }

    /// Messages for a chat request: the description as the system message,
    /// followed by the whole transcript in order.
    pub fn api_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.push(ChatMessage::from(&Message::system(self.description.clone())));
        messages.extend(self.transcript.iter().map(ChatMessage::from));
        messages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonaError {
    /// Name or description was blank.
    MissingFields,

    /// A persona with this name already exists and was left unchanged.
    Duplicate(String),

    NotFound {
        name: String,
        available: Vec<String>,
    },
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::MissingFields => {
                write!(f, "Please provide both a name and a description.")
            }
            PersonaError::Duplicate(_) => write!(f, "A bot with this name already exists."),
            PersonaError::NotFound { name, available } => write!(
                f,
                "Bot '{}' not found. Available bots: {}",
                name,
                available.join(", ")
            ),
        }
    }
}

impl StdError for PersonaError {}

/// Personas in creation order, keyed by name.
#[derive(Debug, Clone)]
pub struct PersonaRoster {
    personas: Vec<Persona>,
}

impl Default for PersonaRoster {
    fn default() -> Self {
        Self {
            personas: vec![Persona::new(
                DEFAULT_PERSONA_NAME,
                DEFAULT_PERSONA_DESCRIPTION,
                None,
            )],
        }
    }
}

impl PersonaRoster {
    /// The built-in assistant followed by the personas listed in the config.
    /// Invalid or duplicate entries are skipped with a warning.
    pub fn from_config(config: &Config) -> Self {
        let mut roster = Self::default();
        for PersonaConfig {
            name,
            description,
            avatar,
        } in &config.personas
        {
            if let Err(err) = roster.create(name, description, avatar.clone()) {
                warn!(persona = %name, error = %err, "skipping configured persona");
            }
        }
        roster
    }

    pub fn create(
        &mut self,
        name: &str,
        description: &str,
        avatar: Option<String>,
    ) -> Result<&Persona, PersonaError> {
        let name = name.trim();
        if name.is_empty() || description.trim().is_empty() {
            return Err(PersonaError::MissingFields);
        }
        if self.contains(name) {
            return Err(PersonaError::Duplicate(name.to_string()));
        }

        self.personas.push(Persona::new(name, description, avatar));
        let index = self.personas.len() - 1;
        Ok(&self.personas[index])
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|persona| persona.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Persona> {
        self.personas.iter_mut().find(|persona| persona.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.personas.iter().position(|persona| persona.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.personas
            .iter()
            .map(|persona| persona.name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub(crate) fn by_index(&self, index: usize) -> Option<&Persona> {
        self.personas.get(index)
    }

    pub(crate) fn not_found(&self, name: &str) -> PersonaError {
        PersonaError::NotFound {
            name: name.to_string(),
            available: self.names(),
        }
    }
}
