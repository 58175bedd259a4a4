use serde::{Deserialize, Serialize};

/// One message as it travels over the wire to `/api/chat`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// A single NDJSON line of a streamed `/api/chat` response.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelDetails {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub parameter_size: Option<String>,
    #[serde(default)]
    pub quantization_level: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub details: Option<ModelDetails>,
}

impl ModelInfo {
    /// Identifier to send back in chat requests.
    pub fn id(&self) -> &str {
        match self.model.as_deref() {
            Some(model) if !model.is_empty() => model,
            _ => &self.name,
        }
    }
}

/// Body of `GET /api/tags`.
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

impl ModelsResponse {
    pub fn ids(&self) -> Vec<String> {
        self.models
            .iter()
            .map(|model| model.id().to_string())
            .filter(|id| !id.is_empty())
            .collect()
    }
}

pub mod models;
