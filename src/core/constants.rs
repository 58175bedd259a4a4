pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Port assumed for a host given without scheme or port.
pub const DEFAULT_PORT: u16 = 11434;

/// Environment variable honored when neither a flag nor the config names a host.
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

pub const DEFAULT_PERSONA_NAME: &str = "Ollama Assistant";
pub const DEFAULT_PERSONA_DESCRIPTION: &str = "You are a helpful assistant.";

/// Shown in place of a persona's avatar when none was given.
pub const DEFAULT_AVATAR: &str = "🤖";
