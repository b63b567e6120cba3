//! Accept loops, one per bound address
//!
//! Each listener is independent: a bind failure on one address never
//! affects the others, and the accept loop never blocks on a single
//! connection's lifetime.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::handler::handle_connection;
use super::ListenerError;
use crate::negotiate::Negotiator;
use crate::shutdown::EventSender;
use crate::transform::TransformPair;

/// A bound accept endpoint and its running accept loop.
pub struct ListenerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// The local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting.
    ///
    /// No new connection can be accepted once this returns; handlers for
    /// already-accepted connections are unaffected.
    pub async fn close(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        debug!(addr = %self.addr, "listener closed");
    }
}

/// Bind `addr` and start an independent accept loop.
pub async fn start_listener(
    addr: &str,
    negotiator: Arc<dyn Negotiator>,
    transforms: TransformPair,
    events: EventSender,
) -> Result<ListenerHandle, ListenerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let local = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    debug!(addr = %local, "listener bound");

    let task = tokio::spawn(accept_loop(listener, negotiator, transforms, events));

    Ok(ListenerHandle { addr: local, task })
}

/// Accept connections until the listener fails or is closed, spawning a
/// handler per connection and immediately resuming.
async fn accept_loop(
    listener: TcpListener,
    negotiator: Arc<dyn Negotiator>,
    transforms: TransformPair,
    events: EventSender,
) {
    loop {
        match listener.accept().await {
            Ok((inbound, peer)) => {
                debug!(%peer, "connection accepted");
                inbound.set_nodelay(true).ok();
                tokio::spawn(handle_connection(
                    inbound,
                    Arc::clone(&negotiator),
                    transforms,
                    events.clone(),
                ));
            }
            Err(err) => {
                warn!(error = %err, "accept failed, stopping listener");
                break;
            }
        }
    }
}
