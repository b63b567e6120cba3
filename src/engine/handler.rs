//! Per-connection lifecycle

use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::debug;

use crate::negotiate::Negotiator;
use crate::relay::{self, DirectionOutcome};
use crate::shutdown::EventSender;
use crate::transform::TransformPair;

/// Drive one accepted connection to completion.
///
/// The handler-started event is emitted before any blocking work so the
/// active count is accurate even if negotiation stalls; the guard emits
/// the matching handler-stopped event exactly once on every exit path.
/// Both connections are closed unconditionally on return, by ownership.
/// Handlers share no state with each other beyond the event stream.
pub async fn handle_connection(
    mut inbound: TcpStream,
    negotiator: Arc<dyn Negotiator>,
    transforms: TransformPair,
    events: EventSender,
) {
    let _guard = events.handler_started();

    let peer = inbound.peer_addr().ok();

    let destination = match negotiator.negotiate(&mut inbound).await {
        Ok(stream) => stream,
        Err(err) => {
            debug!(peer = ?peer, error = %err, "negotiation failed");
            // Close before the guard reports the handler stopped.
            drop(inbound);
            return;
        }
    };

    let outcome = relay::run_pair(inbound, destination, transforms).await;
    match (&outcome.to_destination, &outcome.from_destination) {
        (DirectionOutcome::Eof(sent), DirectionOutcome::Eof(received)) => {
            debug!(peer = ?peer, bytes_sent = sent, bytes_received = received, "relay finished");
        }
        (to_destination, from_destination) => {
            debug!(
                peer = ?peer,
                to_destination = ?to_destination,
                from_destination = ?from_destination,
                "relay ended"
            );
        }
    }
}
