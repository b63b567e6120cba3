//! SOCKS4/4a CONNECT intake (initiator role)

use super::{NegotiateError, Negotiator};
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// SOCKS4 request version
const SOCKS_VERSION: u8 = 0x04;

/// SOCKS4 reply version (always zero)
const REPLY_VERSION: u8 = 0x00;

/// Cap on the null-terminated user id and hostname fields
const MAX_FIELD_LEN: usize = 255;

/// SOCKS4 commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Command {
    Connect = 0x01,
    Bind = 0x02,
}

impl TryFrom<u8> for Command {
    type Error = NegotiateError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Command::Connect),
            0x02 => Ok(Command::Bind),
            _ => Err(NegotiateError::UnsupportedCommand(value)),
        }
    }
}

/// SOCKS4 reply codes
#[derive(Debug, Clone, Copy)]
#[repr(u8)]
enum Reply {
    Granted = 90,
    Rejected = 91,
}

/// SOCKS4/4a negotiation: parse a CONNECT request from the inbound
/// connection's initial bytes, dial the requested destination, and report
/// the destination's address back over the inbound connection.
///
/// The 4a extension (DSTIP of the form 0.0.0.x, x nonzero, followed by a
/// null-terminated hostname) is accepted; BIND is not.
pub struct SocksInitiator {
    connect_timeout: Duration,
}

impl SocksInitiator {
    /// Create an initiator with the given destination connect timeout.
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Read the CONNECT request and return the destination to dial.
    async fn read_request(&self, inbound: &mut TcpStream) -> Result<String, NegotiateError> {
        let mut header = [0u8; 8];
        inbound.read_exact(&mut header).await?;

        if header[0] != SOCKS_VERSION {
            return Err(NegotiateError::InvalidVersion(header[0]));
        }
        let command = Command::try_from(header[1])?;
        if command != Command::Connect {
            return Err(NegotiateError::UnsupportedCommand(header[1]));
        }

        let port = u16::from_be_bytes([header[2], header[3]]);
        let ip = Ipv4Addr::new(header[4], header[5], header[6], header[7]);

        // User id, unused but part of the request.
        read_null_terminated(inbound).await?;

        // 4a form: an invalid 0.0.0.x address means a hostname follows.
        let octets = ip.octets();
        if octets[0] == 0 && octets[1] == 0 && octets[2] == 0 && octets[3] != 0 {
            let hostname = read_null_terminated(inbound).await?;
            let hostname = String::from_utf8(hostname)
                .map_err(|_| NegotiateError::Malformed("hostname is not UTF-8".to_string()))?;
            Ok(format!("{}:{}", hostname, port))
        } else {
            Ok(format!("{}:{}", ip, port))
        }
    }
}

#[async_trait]
impl Negotiator for SocksInitiator {
    async fn negotiate(&self, inbound: &mut TcpStream) -> Result<TcpStream, NegotiateError> {
        let destination = match self.read_request(inbound).await {
            Ok(destination) => destination,
            Err(err) => {
                let _ = inbound.write_all(&make_reply(Reply::Rejected, None)).await;
                return Err(err);
            }
        };

        debug!(%destination, "CONNECT requested");

        let stream = match tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(destination.as_str()),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                let _ = inbound.write_all(&make_reply(Reply::Rejected, None)).await;
                return Err(NegotiateError::Dial {
                    destination,
                    source,
                });
            }
            Err(_) => {
                let _ = inbound.write_all(&make_reply(Reply::Rejected, None)).await;
                return Err(NegotiateError::Timeout);
            }
        };

        stream.set_nodelay(true).ok();

        let peer = stream.peer_addr().ok();
        inbound.write_all(&make_reply(Reply::Granted, peer)).await?;

        Ok(stream)
    }
}

/// Read a null-terminated field, bounded at [`MAX_FIELD_LEN`] bytes.
async fn read_null_terminated(inbound: &mut TcpStream) -> Result<Vec<u8>, NegotiateError> {
    let mut field = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        inbound.read_exact(&mut byte).await?;
        if byte[0] == 0 {
            return Ok(field);
        }
        if field.len() == MAX_FIELD_LEN {
            return Err(NegotiateError::Malformed(
                "unterminated request field".to_string(),
            ));
        }
        field.push(byte[0]);
    }
}

/// Build the 8-byte reply: VN, CD, DSTPORT, DSTIP.
///
/// The address fields are zeroed when no IPv4 destination address applies.
fn make_reply(reply: Reply, addr: Option<SocketAddr>) -> [u8; 8] {
    let mut buf = [0u8; 8];
    buf[0] = REPLY_VERSION;
    buf[1] = reply as u8;
    if let Some(addr) = addr {
        buf[2..4].copy_from_slice(&addr.port().to_be_bytes());
        if let SocketAddr::V4(v4) = addr {
            buf[4..8].copy_from_slice(&v4.ip().octets());
        }
    }
    buf
}
