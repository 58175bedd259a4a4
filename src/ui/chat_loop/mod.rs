//! Main chat event loop.
//!
//! The loop owns the [`App`]. Terminal events, stream fragments, and model
//! listings arrive over channels from spawned tasks; each one is applied to
//! the app and the frame is redrawn.

mod keybindings;
mod lifecycle;
mod setup;

use std::{error::Error, time::Duration};

use ratatui::crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use self::keybindings::{handle_key, handle_paste, KeyEffect};
use self::lifecycle::{restore_terminal, setup_terminal, ChatTerminal};
use self::setup::bootstrap_app;
use crate::api::models::fetch_models;
use crate::core::app::{App, ModelListingRequest};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::ui::renderer::ui;

/// Command-line overrides for an interactive session.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub host: Option<String>,
    pub model: Option<String>,
    pub persona: Option<String>,
}

#[derive(Debug)]
pub enum UiEvent {
    Crossterm(Event),
    ModelsListed {
        host: String,
        result: Result<Vec<String>, String>,
    },
}

pub async fn run_chat(options: ChatOptions) -> Result<(), Box<dyn Error>> {
    let mut app = bootstrap_app(&options)?;

    // Setup terminal only after successful app creation
    let mut terminal = setup_terminal()?;

    let (stream_service, mut stream_rx) = ChatStreamService::new();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let event_reader_handle = spawn_event_reader(event_tx.clone());

    spawn_model_listing(app.begin_model_listing(), event_tx.clone());

    let result = run_loop(
        &mut app,
        &mut terminal,
        &stream_service,
        &event_tx,
        &mut event_rx,
        &mut stream_rx,
    )
    .await;

    event_reader_handle.abort();
    restore_terminal(&mut terminal)?;

    result
}

async fn run_loop(
    app: &mut App,
    terminal: &mut ChatTerminal,
    stream_service: &ChatStreamService,
    event_tx: &mpsc::UnboundedSender<UiEvent>,
    event_rx: &mut mpsc::UnboundedReceiver<UiEvent>,
    stream_rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        tokio::select! {
            Some(ev) = event_rx.recv() => {
                handle_ui_event(app, ev, stream_service, event_tx);
            }
            Some((message, stream_id)) = stream_rx.recv() => {
                app.handle_stream_message(message, stream_id);
                // Fragments arrive in bursts; apply them all before drawing.
                while let Ok((message, stream_id)) = stream_rx.try_recv() {
                    app.handle_stream_message(message, stream_id);
                }
            }
            else => break,
        }

        if app.ui.exit_requested {
            break;
        }
    }
    Ok(())
}

fn handle_ui_event(
    app: &mut App,
    ev: UiEvent,
    stream_service: &ChatStreamService,
    event_tx: &mpsc::UnboundedSender<UiEvent>,
) {
    match ev {
        UiEvent::Crossterm(Event::Key(key)) if key.kind == KeyEventKind::Press => {
            match handle_key(app, key) {
                KeyEffect::None => {}
                KeyEffect::Exit => app.ui.exit_requested = true,
                KeyEffect::StartStream(params) => stream_service.spawn_stream(params),
                KeyEffect::RefreshModels => {
                    spawn_model_listing(app.begin_model_listing(), event_tx.clone());
                }
            }
        }
        UiEvent::Crossterm(Event::Paste(text)) => handle_paste(app, &text),
        UiEvent::Crossterm(_) => {}
        UiEvent::ModelsListed { host, result } => app.apply_model_listing(&host, result),
    }
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(UiEvent::Crossterm(ev)).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

fn spawn_model_listing(request: ModelListingRequest, event_tx: mpsc::UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        let ModelListingRequest { client, host } = request;
        let result = match fetch_models(&client, &host).await {
            Ok(response) => {
                let ids = response.ids();
                debug!(%host, count = ids.len(), "model listing loaded");
                Ok(ids)
            }
            Err(err) => {
                warn!(%host, error = %err, "model listing failed");
                Err(err.to_string())
            }
        };
        let _ = event_tx.send(UiEvent::ModelsListed { host, result });
    });
}
