//! Stream relay
//!
//! Copies bytes between a connection pair, one task per direction, with a
//! rotation applied to every byte in flight. A pair is complete only once
//! both directions have finished; a failed direction severs its peer so a
//! read blocked on a dead connection observes closure instead of hanging.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::trace;

use crate::transform::{RotN, TransformPair};

/// Read buffer size for each relay direction
const BUFFER_SIZE: usize = 16 * 1024;

/// Relay errors
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
}

/// How one relay direction ended.
#[derive(Debug)]
pub enum DirectionOutcome {
    /// Clean end-of-stream after relaying this many bytes.
    Eof(u64),
    /// The direction failed mid-stream.
    Failed(RelayError),
    /// The direction was cut short because its peer direction failed.
    Severed,
}

impl DirectionOutcome {
    /// Whether this direction ran to a clean end-of-stream.
    pub fn is_clean(&self) -> bool {
        matches!(self, DirectionOutcome::Eof(_))
    }
}

/// Terminal report for one relay pair.
#[derive(Debug)]
pub struct PairOutcome {
    pub to_destination: DirectionOutcome,
    pub from_destination: DirectionOutcome,
}

impl PairOutcome {
    /// Whether both directions reached a clean end-of-stream.
    pub fn is_clean(&self) -> bool {
        self.to_destination.is_clean() && self.from_destination.is_clean()
    }
}

/// Copy `reader` to `writer` until end-of-stream or failure, rotating
/// every byte.
///
/// Chunks are arbitrary-sized; the output length always equals the input
/// length. On clean end-of-stream the sink is half-closed so the peer
/// observes EOF for this direction, and the byte count is returned. The
/// relay never closes a connection; that stays with the caller so the
/// paired direction is not disturbed mid-flight.
pub async fn copy_transform<R, W>(
    mut reader: R,
    mut writer: W,
    transform: RotN,
) -> Result<u64, RelayError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; BUFFER_SIZE];
    let mut relayed = 0u64;

    loop {
        let n = reader.read(&mut buf).await.map_err(RelayError::Read)?;
        if n == 0 {
            let _ = writer.shutdown().await;
            trace!(bytes = relayed, "relay direction finished");
            return Ok(relayed);
        }

        transform.apply_in_place(&mut buf[..n]);
        writer.write_all(&buf[..n]).await.map_err(RelayError::Write)?;
        relayed += n as u64;
    }
}

/// Which direction of a pair reported a result.
#[derive(Debug, Clone, Copy)]
enum Direction {
    ToDestination,
    FromDestination,
}

/// Run both directions of a relay pair to completion.
///
/// Spawns one task per direction and waits for both (join semantics, not
/// first-to-finish). If either direction fails, both tasks are aborted so
/// the survivor's blocked read observes closure; an aborted direction
/// reports [`DirectionOutcome::Severed`]. The connections themselves are
/// consumed and closed when the pair returns.
pub async fn run_pair<A, B>(inbound: A, destination: B, transforms: TransformPair) -> PairOutcome
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (inbound_read, inbound_write) = tokio::io::split(inbound);
    let (destination_read, destination_write) = tokio::io::split(destination);

    let (report_tx, mut report_rx) = mpsc::unbounded_channel();

    let egress = {
        let report_tx = report_tx.clone();
        let transform = transforms.to_destination;
        tokio::spawn(async move {
            let result = copy_transform(inbound_read, destination_write, transform).await;
            let _ = report_tx.send((Direction::ToDestination, result));
        })
    };
    let ingress = {
        let report_tx = report_tx.clone();
        let transform = transforms.from_destination;
        tokio::spawn(async move {
            let result = copy_transform(destination_read, inbound_write, transform).await;
            let _ = report_tx.send((Direction::FromDestination, result));
        })
    };
    drop(report_tx);

    // A direction that never reports was aborted after its peer failed.
    let mut to_destination = DirectionOutcome::Severed;
    let mut from_destination = DirectionOutcome::Severed;

    // The channel drains only once both tasks are gone, completed or
    // aborted, so this loop is the join point for the pair.
    while let Some((direction, result)) = report_rx.recv().await {
        let failed = result.is_err();
        let outcome = match result {
            Ok(bytes) => DirectionOutcome::Eof(bytes),
            Err(err) => DirectionOutcome::Failed(err),
        };
        match direction {
            Direction::ToDestination => to_destination = outcome,
            Direction::FromDestination => from_destination = outcome,
        }
        if failed {
            egress.abort();
            ingress.abort();
        }
    }

    PairOutcome {
        to_destination,
        from_destination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_copy_transform_rotates_every_byte() {
        let (mut source, relay_source) = tokio::io::duplex(64);
        let (relay_sink, mut sink) = tokio::io::duplex(64);

        let relay = tokio::spawn(copy_transform(relay_source, relay_sink, RotN::forward(1)));

        source.write_all(b"hello").await.unwrap();
        drop(source);

        let mut out = Vec::new();
        sink.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"ifmmp");

        let relayed = relay.await.unwrap().unwrap();
        assert_eq!(relayed, 5);
    }

    #[tokio::test]
    async fn test_copy_transform_propagates_eof_to_sink() {
        let (source, relay_source) = tokio::io::duplex(64);
        let (relay_sink, mut sink) = tokio::io::duplex(64);

        let relay = tokio::spawn(copy_transform(relay_source, relay_sink, RotN::forward(0)));
        drop(source);

        // read_to_end only returns once the relay shuts the sink down.
        let mut out = Vec::new();
        timeout(Duration::from_secs(2), sink.read_to_end(&mut out))
            .await
            .expect("sink never observed EOF")
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(relay.await.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_pair_relays_both_directions() {
        let (mut app, inbound) = tokio::io::duplex(256);
        let (destination, mut upstream) = tokio::io::duplex(256);

        let pair = tokio::spawn(run_pair(inbound, destination, TransformPair::initiator(1)));

        app.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        upstream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"qjoh");

        upstream.write_all(b"qpoh").await.unwrap();
        app.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(app);
        drop(upstream);
        let outcome = timeout(Duration::from_secs(2), pair)
            .await
            .expect("pair never joined")
            .unwrap();
        assert!(outcome.is_clean());
    }

    #[tokio::test]
    async fn test_failed_direction_severs_blocked_peer() {
        // Real sockets: a reset on the inbound side must unblock the
        // ingress relay, which is waiting on a destination that stays
        // silent and open.
        let inbound_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let inbound_addr = inbound_listener.local_addr().unwrap();
        let destination_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let destination_addr = destination_listener.local_addr().unwrap();

        let app = TcpStream::connect(inbound_addr).await.unwrap();
        let (inbound, _) = inbound_listener.accept().await.unwrap();
        let destination = TcpStream::connect(destination_addr).await.unwrap();
        let (_upstream, _) = destination_listener.accept().await.unwrap();

        let pair = tokio::spawn(run_pair(inbound, destination, TransformPair::initiator(1)));

        // Reset the inbound connection; the egress read fails with
        // ECONNRESET instead of a clean EOF.
        app.set_linger(Some(Duration::ZERO)).unwrap();
        drop(app);

        let outcome = timeout(Duration::from_secs(2), pair)
            .await
            .expect("pair hung on the surviving direction")
            .unwrap();
        assert!(
            matches!(outcome.to_destination, DirectionOutcome::Failed(_)),
            "expected egress failure, got {:?}",
            outcome.to_destination
        );
        assert!(!outcome.from_destination.is_clean());
    }
}
