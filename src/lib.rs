//! ollachat is a terminal chat client for a local Ollama server.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the session state: the persona roster with one transcript
//!   per persona, the model listing, the configuration, and streaming.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input and display updates.
//! - [`commands`] implements slash-command parsing and command execution used
//!   by the chat loop.
//! - [`api`] defines the Ollama wire payloads and the model listing call.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod ui;
pub mod utils;
