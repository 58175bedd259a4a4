mod registry;

pub use registry::{all_commands, matching_commands, CommandInvocation};

use crate::core::app::App;
use crate::core::session::ModelListing;

#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    /// The loop should fetch the model listing for the current host.
    RefreshModels,
}

pub const KEYBINDINGS_HELP: &str = "\
Enter send • Alt+Enter newline • Ctrl+N new bot • Ctrl+B next bot • \
Ctrl+O next model • Ctrl+L clear chat • PgUp/PgDn scroll • Ctrl+C quit";

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    if let Some(command) = registry::find_command(command_name) {
        (command.handler)(app, CommandInvocation { args })
    } else {
        CommandResult::ProcessAsMessage(input.to_string())
    }
}

pub(super) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let mut help = String::from("Commands:\n");
    for command in all_commands() {
        help.push_str(&format!("  {:<32} {}\n", command.usage, command.help));
    }
    help.push('\n');
    help.push_str(KEYBINDINGS_HELP);
    app.ui.set_notice(help);
    CommandResult::Continue
}

pub(super) fn handle_bot(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return handle_bots(app, invocation);
    }
    match app.select_persona(invocation.args) {
        Ok(()) => app.ui.set_status(format!("Bot set: {}", invocation.args)),
        Err(e) => app.ui.set_status(e),
    }
    CommandResult::Continue
}

pub(super) fn handle_bots(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let selected = app.session.selected_persona_name().to_string();
    let mut listing = String::from("Bots:\n");
    for persona in app.session.roster().iter() {
        let marker = if persona.name == selected { "▶" } else { " " };
        listing.push_str(&format!(
            "{} {} {} ({} messages)\n",
            marker,
            persona.display_avatar(),
            persona.name,
            persona.transcript().len()
        ));
    }
    app.ui.set_notice(listing.trim_end().to_string());
    CommandResult::Continue
}

pub(super) fn handle_add(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        if app.is_streaming() {
            app.ui.set_status("Wait for the current reply to finish.");
        } else {
            app.ui.open_persona_form();
        }
        return CommandResult::Continue;
    }

    let Some((name, description)) = invocation.args.split_once('|') else {
        app.ui.set_status("Usage: /add <name> | <description>");
        return CommandResult::Continue;
    };
    match app.create_persona(name, description.trim(), None) {
        Ok(created) => app.ui.set_status(format!("Created bot: {created}")),
        Err(e) => app.ui.set_status(e),
    }
    CommandResult::Continue
}

pub(super) fn handle_clear(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    match app.clear_current_chat() {
        Ok(()) => app.ui.set_status("Chat history cleared"),
        Err(e) => app.ui.set_status(e),
    }
    CommandResult::Continue
}

pub(super) fn handle_model(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let status = match app.session.models() {
            ModelListing::Loaded(models) if !models.is_empty() => {
                format!("Models: {}", models.join(", "))
            }
            ModelListing::Loaded(_) => "No models installed".to_string(),
            ModelListing::Pending => "Loading models…".to_string(),
            ModelListing::Failed(_) => "Model listing failed; see /host".to_string(),
        };
        app.ui.set_status(status);
        return CommandResult::Continue;
    }

    match app.session.select_model(invocation.args) {
        Ok(()) => app.ui.set_status(format!("Model set: {}", invocation.args)),
        Err(e) => app.ui.set_status(e),
    }
    CommandResult::Continue
}

pub(super) fn handle_models(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.ui.set_status("Reloading models…");
    CommandResult::RefreshModels
}

pub(super) fn handle_host(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let host = app.session.host().to_string();
        app.ui.set_status(format!("Host: {host}"));
        return CommandResult::Continue;
    }

    match app.set_host(invocation.args) {
        Ok(()) => {
            let host = app.session.host().to_string();
            app.ui.set_status(format!("Host set: {host}"));
            CommandResult::RefreshModels
        }
        Err(e) => {
            app.ui.set_status(e);
            CommandResult::Continue
        }
    }
}
