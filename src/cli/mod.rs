//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod model_list;
pub mod say;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::core::config::Config;
use crate::ui::chat_loop::{run_chat, ChatOptions};
use crate::utils::logging::init_tracing;
use crate::utils::url::normalize_host;

#[derive(Parser)]
#[command(name = "ollachat", version)]
#[command(about = "A terminal chat interface for a local Ollama server")]
#[command(
    long_about = "ollachat is a full-screen terminal chat interface for an Ollama server. \
Each bot (persona) has its own system prompt and its own conversation; switching bots \
switches conversations.\n\n\
Host resolution:\n\
  --host, then 'host' in the config file, then OLLAMA_HOST, then http://localhost:11434\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a newline\n\
  Ctrl+N            Create a new bot\n\
  Ctrl+B / Ctrl+O   Next bot / next model\n\
  Ctrl+L            Clear the current bot's chat\n\
  PgUp/PgDn         Scroll the conversation\n\
  Ctrl+C            Quit\n\n\
Commands:\n\
  /help             Show all commands"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Ollama endpoint, e.g. http://localhost:11434
    #[arg(long, global = true, value_name = "URL")]
    pub host: Option<String>,

    /// Model to select once the listing loads
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Bot to start with
    #[arg(long, global = true, value_name = "NAME")]
    pub persona: Option<String>,

    /// Write diagnostic logs to this file
    #[arg(short = 'l', long = "log-file", global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// List the models installed on the Ollama server
    Models,
    /// Send one prompt and print the streamed reply
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Set a config value (host, default-model, default-persona)
    Set {
        key: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Clear a config value
    Unset { key: String },
}

impl Args {
    fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            host: self.host.clone(),
            model: self.model.clone(),
            persona: self.persona.clone(),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;
    let options = args.chat_options();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(options).await,
        Commands::Models => list_models(options.host).await,
        Commands::Say { prompt } => run_say(prompt, options).await,
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            if value.is_empty() {
                config.print_all();
                return Ok(());
            }
            match set_config_value(&mut config, &key, &value.join(" ")) {
                Ok(message) => {
                    config.save()?;
                    println!("✅ {message}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            match unset_config_value(&mut config, &key) {
                Ok(message) => {
                    config.save()?;
                    println!("✅ {message}");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("A value is required for {key}"));
    }
    match key {
        "host" => {
            let host = normalize_host(value);
            config.host = Some(host.clone());
            Ok(format!("Set host to: {host}"))
        }
        "default-model" => {
            config.default_model = Some(value.to_string());
            Ok(format!("Set default-model to: {value}"))
        }
        "default-persona" => {
            config.default_persona = Some(value.to_string());
            Ok(format!("Set default-persona to: {value}"))
        }
        _ => Err(format!("Unknown config key: {key}")),
    }
}

fn unset_config_value(config: &mut Config, key: &str) -> Result<String, String> {
    let slot = match key {
        "host" => &mut config.host,
        "default-model" => &mut config.default_model,
        "default-persona" => &mut config.default_persona,
        _ => return Err(format!("Unknown config key: {key}")),
    };
    *slot = None;
    Ok(format!("Unset {key}"))
}
