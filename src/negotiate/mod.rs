//! Destination negotiation
//!
//! Turning a freshly accepted connection into a connection paired with its
//! forwarding destination is the only role-specific step in the engine, so
//! it lives behind one trait with a strategy per role:
//!
//! - [`SocksInitiator`]: parse a SOCKS4/4a CONNECT request and dial the
//!   address it names
//! - [`UpstreamNegotiator`]: dial one fixed upstream relay endpoint

mod socks;
mod upstream;

pub use socks::SocksInitiator;
pub use upstream::UpstreamNegotiator;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;

/// Negotiation errors
#[derive(Debug, Error)]
pub enum NegotiateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid SOCKS version: {0}")]
    InvalidVersion(u8),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(u8),

    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Failed to reach {destination}: {source}")]
    Dial {
        destination: String,
        source: std::io::Error,
    },

    #[error("Timeout")]
    Timeout,
}

/// Trait for negotiation strategies
///
/// A strategy owns the inbound connection only for the duration of the
/// handshake; on success the caller holds both connections and is
/// responsible for closing them.
#[async_trait]
pub trait Negotiator: Send + Sync {
    /// Produce the destination connection for one inbound connection.
    async fn negotiate(&self, inbound: &mut TcpStream) -> Result<TcpStream, NegotiateError>;
}
