use std::error::Error;

use tracing::info;

use super::ChatOptions;
use crate::core::app::App;
use crate::core::config::Config;
use crate::core::session::SessionState;

/// Build the application state for the chat loop from the config file and
/// the command-line overrides.
pub fn bootstrap_app(options: &ChatOptions) -> Result<App, Box<dyn Error>> {
    let config = Config::load()?;
    let host = config.resolve_host(options.host.as_deref());
    let session = SessionState::from_config(
        &config,
        &host,
        options.model.as_deref(),
        options.persona.as_deref(),
    )?;

    info!(
        %host,
        persona = session.selected_persona_name(),
        personas = session.roster().len(),
        "starting chat session"
    );

    Ok(App::new(reqwest::Client::new(), session))
}
