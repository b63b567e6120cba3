//! Forwarding engine
//!
//! One reusable engine shared by both roles: listeners accept, handlers
//! negotiate a destination through a pluggable strategy and relay both
//! directions to completion. The roles differ only in the negotiation
//! strategy and transform pair they supply.

mod handler;
mod listener;

pub use handler::handle_connection;
pub use listener::{start_listener, ListenerHandle};

use thiserror::Error;

/// Listener errors
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}
