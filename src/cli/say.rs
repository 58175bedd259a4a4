//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::api::models::fetch_models;
use crate::core::app::App;
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::config::Config;
use crate::core::session::SessionState;
use crate::ui::chat_loop::ChatOptions;

pub async fn run_say(prompt: Vec<String>, options: ChatOptions) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: ollachat say <prompt>");
        std::process::exit(1);
    }

    let config = Config::load()?;
    let host = config.resolve_host(options.host.as_deref());
    let session = SessionState::from_config(
        &config,
        &host,
        options.model.as_deref(),
        options.persona.as_deref(),
    )?;

    let mut stdout = io::stdout();
    match say(App::new(reqwest::Client::new(), session), &prompt, &mut stdout).await {
        Ok(_) => Ok(()),
        Err(err) => {
            eprintln!("\n❌ Error: {err}");
            std::process::exit(1);
        }
    }
}

/// List models, then stream one reply into `out`. A failed listing returns
/// before any chat request is made.
async fn say<W: Write>(mut app: App, prompt: &str, out: &mut W) -> Result<String, Box<dyn Error>> {
    let request = app.begin_model_listing();
    let listing = fetch_models(&request.client, &request.host)
        .await
        .map(|response| response.ids())
        .map_err(|err| err.to_string());
    app.apply_model_listing(&request.host, listing);

    let params = app.submit_prompt(prompt)?;
    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_stream(params);

    while let Some((message, id)) = rx.recv().await {
        match &message {
            StreamMessage::Chunk(content) => {
                write!(out, "{content}")?;
                out.flush()?;
            }
            StreamMessage::Error(err) => return Err(err.clone().into()),
            StreamMessage::End => writeln!(out)?,
        }
        let finished = message == StreamMessage::End;
        app.handle_stream_message(message, id);
        if finished {
            break;
        }
    }

    let reply = app
        .session
        .current_persona()
        .transcript()
        .last()
        .filter(|entry| entry.is_assistant())
        .map(|entry| entry.content.clone())
        .unwrap_or_default();
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persona::PersonaRoster;
    use crate::utils::test_utils::{spawn_mock_server, MockResponse};

    fn app_for(host: &str) -> App {
        App::new(
            reqwest::Client::new(),
            SessionState::new(PersonaRoster::default(), host),
        )
    }

    #[tokio::test]
    async fn streams_the_reply_after_listing_models() {
        let server = spawn_mock_server(vec![
            MockResponse::json(200, r#"{"models":[{"name":"llama3:latest"}]}"#),
            MockResponse::streamed(
                200,
                vec![
                    "{\"message\":{\"role\":\"assistant\",\"content\":\"He\"},\"done\":false}\n"
                        .to_string(),
                    "{\"message\":{\"role\":\"assistant\",\"content\":\"llo\"},\"done\":true}\n"
                        .to_string(),
                ],
            ),
        ])
        .await;

        let mut out = Vec::new();
        let reply = say(app_for(&server.base_url), "hi", &mut out)
            .await
            .expect("reply");
        assert_eq!(reply, "Hello");
        assert_eq!(String::from_utf8(out).expect("utf8"), "Hello\n");

        let requests = server.requests().await;
        assert_eq!(requests.len(), 2);
        assert!(requests[0].request_line.starts_with("GET /api/tags"));
        assert!(requests[1].request_line.starts_with("POST /api/chat"));
        let body: serde_json::Value = serde_json::from_slice(&requests[1].body).expect("json body");
        assert_eq!(body["model"], "llama3:latest");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn listing_failure_aborts_before_chatting() {
        let mut out = Vec::new();
        let err = say(app_for("http://127.0.0.1:1"), "hi", &mut out)
            .await
            .err()
            .expect("listing fails");
        assert!(err.to_string().contains("Could not connect to Ollama"));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn empty_listing_aborts_before_chatting() {
        let server = spawn_mock_server(vec![MockResponse::json(200, r#"{"models":[]}"#)]).await;
        let mut out = Vec::new();
        assert!(say(app_for(&server.base_url), "hi", &mut out).await.is_err());
        assert_eq!(server.requests().await.len(), 1);
    }
}
