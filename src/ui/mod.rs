//! Terminal UI layer for interactive chat sessions.
//!
//! - [`chat_loop`]: the main interaction loop that dispatches user input to
//!   [`crate::commands`] and coordinates streaming via [`crate::core::chat_stream`].
//! - [`renderer`]: the sidebar, transcript, input box, and add-bot popup.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns domain logic and backend coordination.

pub mod chat_loop;
pub mod renderer;
