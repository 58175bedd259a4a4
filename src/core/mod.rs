pub mod app;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod message;
pub mod persona;
pub mod session;
pub mod text_wrapping;
