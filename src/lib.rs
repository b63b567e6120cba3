//! # Caesar Relay
//!
//! A bidirectional stream-forwarding proxy that applies a reversible,
//! stateless per-byte rotation to traffic flowing between two endpoints.
//!
//! ## Features
//!
//! - **Reversible byte rotation** over the full 256-value alphabet
//! - **Paired stream relay**: one task per direction, joined on completion
//! - **Pluggable negotiation**: SOCKS4/4a intake or a fixed upstream endpoint
//! - **Multiple listeners** with per-address failure isolation
//! - **Signal-driven shutdown**: drain in-flight connections, or stop now
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Listeners                         │
//! │         (one accept loop per bound address)          │
//! ├─────────────────────────────────────────────────────┤
//! │                Connection Handlers                   │
//! │     (negotiate destination, relay both directions)   │
//! ├─────────────────────────────────────────────────────┤
//! │                   Stream Relay                       │
//! │         (chunked copy, per-byte rotation)            │
//! ├─────────────────────────────────────────────────────┤
//! │                Shutdown Coordinator                  │
//! │   (single-consumer event loop, drain state machine)  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The client role accepts local SOCKS4/4a connections and forward-rotates
//! traffic toward the requested destination; the server role accepts the
//! rotated wire traffic and reverse-rotates it toward a fixed upstream
//! relay endpoint, restoring the stream at the far hop.

pub mod config;
pub mod engine;
pub mod negotiate;
pub mod relay;
pub mod shutdown;
pub mod status;
pub mod transform;

pub use config::Config;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Rotation amount used when none is configured
pub const DEFAULT_ROTATION: u8 = 1;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Relay error: {0}")]
    Relay(#[from] relay::RelayError),

    #[error("Negotiation error: {0}")]
    Negotiate(#[from] negotiate::NegotiateError),

    #[error("Listener error: {0}")]
    Listener(#[from] engine::ListenerError),

    #[error("Configuration error: {0}")]
    Config(String),
}
