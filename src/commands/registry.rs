use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Commands whose name starts with `prefix`, for completion hints.
pub fn matching_commands(prefix: &str) -> Vec<&'static Command> {
    let prefix = prefix.to_ascii_lowercase();
    all_commands()
        .iter()
        .filter(|command| command.name.starts_with(&prefix))
        .collect()
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands and keybindings.",
        handler: super::handle_help,
    },
    Command {
        name: "bot",
        usage: "/bot <name>",
        help: "Switch to another bot.",
        handler: super::handle_bot,
    },
    Command {
        name: "bots",
        usage: "/bots",
        help: "List the bots in this session.",
        handler: super::handle_bots,
    },
    Command {
        name: "add",
        usage: "/add [<name> | <description>]",
        help: "Open the new bot form, or create a bot directly.",
        handler: super::handle_add,
    },
    Command {
        name: "clear",
        usage: "/clear",
        help: "Clear the chat history of the current bot.",
        handler: super::handle_clear,
    },
    Command {
        name: "model",
        usage: "/model <name>",
        help: "Switch to another installed model.",
        handler: super::handle_model,
    },
    Command {
        name: "models",
        usage: "/models",
        help: "Reload the list of installed models.",
        handler: super::handle_models,
    },
    Command {
        name: "host",
        usage: "/host [<url>]",
        help: "Show or change the Ollama host.",
        handler: super::handle_host,
    },
];
