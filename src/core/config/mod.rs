//! User configuration stored as TOML in the platform config directory.

mod io;

pub use io::ConfigError;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::constants::{DEFAULT_HOST, OLLAMA_HOST_ENV};
use crate::utils::url::normalize_host;

/// A persona seeded into every session at startup.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Ollama endpoint, e.g. "http://localhost:11434"
    pub host: Option<String>,
    /// Model selected after the listing loads, when it is available
    pub default_model: Option<String>,
    /// Persona selected at startup
    pub default_persona: Option<String>,
    #[serde(default)]
    pub personas: Vec<PersonaConfig>,
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        Self::load_from_path(&Self::get_config_path())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::get_config_path())
    }

    /// Resolve the endpoint: explicit override, then the config file, then
    /// `OLLAMA_HOST`, then the default.
    pub fn resolve_host(&self, cli_host: Option<&str>) -> String {
        let env_host = std::env::var(OLLAMA_HOST_ENV).ok();
        resolve_host_from(cli_host, self.host.as_deref(), env_host.as_deref())
    }

    pub fn print_all(&self) {
        println!("📄 Current configuration:");
        println!("  host: {}", self.host.as_deref().unwrap_or("(unset)"));
        println!(
            "  default-model: {}",
            self.default_model.as_deref().unwrap_or("(unset)")
        );
        println!(
            "  default-persona: {}",
            self.default_persona.as_deref().unwrap_or("(unset)")
        );
        if self.personas.is_empty() {
            println!("  personas: (none)");
        } else {
            println!("  personas:");
            for persona in &self.personas {
                println!("    • {}", persona.name);
            }
        }
        println!();
        println!("  file: {}", path_display(Self::get_config_path()));
    }
}

fn resolve_host_from(
    cli_host: Option<&str>,
    config_host: Option<&str>,
    env_host: Option<&str>,
) -> String {
    [cli_host, config_host, env_host]
        .into_iter()
        .flatten()
        .map(normalize_host)
        .find(|host| !host.is_empty())
        .unwrap_or_else(|| DEFAULT_HOST.to_string())
}

/// Get a user-friendly display string for a path, using `~` for the home
/// directory on Unix-like systems.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
