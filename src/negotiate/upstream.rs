//! Fixed-endpoint dialing (responder role)

use super::{NegotiateError, Negotiator};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Responder-role negotiation: every inbound connection is paired with a
/// fresh connection to one configured upstream relay endpoint. The
/// inbound connection itself carries no handshake bytes in this role.
pub struct UpstreamNegotiator {
    upstream: String,
    connect_timeout: Duration,
}

impl UpstreamNegotiator {
    /// Create a negotiator dialing `upstream` with the given timeout.
    pub fn new(upstream: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            upstream: upstream.into(),
            connect_timeout,
        }
    }

    /// The upstream endpoint this negotiator dials.
    pub fn upstream(&self) -> &str {
        &self.upstream
    }
}

#[async_trait]
impl Negotiator for UpstreamNegotiator {
    async fn negotiate(&self, _inbound: &mut TcpStream) -> Result<TcpStream, NegotiateError> {
        let stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(self.upstream.as_str()),
        )
            .await
            .map_err(|_| NegotiateError::Timeout)?
            .map_err(|source| NegotiateError::Dial {
                destination: self.upstream.clone(),
                source,
            })?;

        stream.set_nodelay(true).ok();
        debug!(upstream = %self.upstream, "upstream connected");
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dials_fixed_endpoint() {
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();

        let inbound_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let _client = TcpStream::connect(inbound_listener.local_addr().unwrap())
            .await
            .unwrap();
        let (mut inbound, _) = inbound_listener.accept().await.unwrap();

        let negotiator = UpstreamNegotiator::new(upstream_addr.to_string(), Duration::from_secs(5));
        let stream = negotiator.negotiate(&mut inbound).await.unwrap();
        assert_eq!(stream.peer_addr().unwrap(), upstream_addr);
    }

    #[tokio::test]
    async fn test_reports_unreachable_upstream() {
        let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        drop(upstream);

        let inbound_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let _client = TcpStream::connect(inbound_listener.local_addr().unwrap())
            .await
            .unwrap();
        let (mut inbound, _) = inbound_listener.accept().await.unwrap();

        let negotiator = UpstreamNegotiator::new(upstream_addr.to_string(), Duration::from_secs(5));
        let err = negotiator.negotiate(&mut inbound).await.unwrap_err();
        assert!(matches!(err, NegotiateError::Dial { .. }));
    }
}
