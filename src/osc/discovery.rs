//! Mixer discovery and identification
//!
//! X-Air mixers answer an argument-less `/xinfo` query, including one sent to
//! the broadcast address, with `[ip, name, model, firmware]`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use rosc::OscMessage;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info};

use super::codec::{arg_as_string, decode_packet, encode_message, OscParams, MAX_DATAGRAM};
use super::INFO_ADDRESS;
use crate::error::{Result, XairError};

/// How long discovery waits for the first reply
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Identification reported by the mixer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerInfo {
    pub ip: String,
    pub name: String,
    pub model: String,
    pub firmware: String,
}

impl MixerInfo {
    /// Parse an `/xinfo` reply
    pub fn from_reply(msg: &OscMessage) -> Result<Self> {
        let malformed = |reason: &str| XairError::MalformedReply {
            address: msg.addr.clone(),
            reason: reason.to_string(),
        };

        if msg.addr != INFO_ADDRESS {
            return Err(malformed("not an info reply"));
        }

        let fields: Option<Vec<&str>> = msg.args.iter().take(4).map(arg_as_string).collect();
        let fields = match fields {
            Some(fields) if fields.len() == 4 => fields,
            _ => return Err(malformed("expected ip, name, model and firmware strings")),
        };

        Ok(Self {
            ip: fields[0].to_string(),
            name: fields[1].to_string(),
            model: fields[2].to_string(),
            firmware: fields[3].to_string(),
        })
    }

    pub fn ip_addr(&self) -> Option<IpAddr> {
        self.ip.parse().ok()
    }
}

impl std::fmt::Display for MixerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} with firmware {} on IP {}",
            self.model, self.firmware, self.ip
        )
    }
}

/// Broadcast an info query on the local network and wait for the first mixer
pub async fn discover(port: u16, timeout: Duration) -> Result<MixerInfo> {
    info!("🔍 Searching for mixer...");
    discover_at(SocketAddrV4::new(Ipv4Addr::BROADCAST, port).into(), timeout).await
}

/// Send an info query to `target` and parse the first reply
///
/// Returns [`XairError::DiscoveryTimeout`] when nothing answers in time.
pub async fn discover_at(target: SocketAddr, timeout: Duration) -> Result<MixerInfo> {
    let socket = broadcast_socket()?;
    let query = encode_message(INFO_ADDRESS, OscParams::None)?;
    socket.send_to(&query, target).await?;
    debug!("Sent info query to {}", target);

    let mut buf = vec![0u8; MAX_DATAGRAM];
    let (len, from) = match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await {
        Ok(received) => received?,
        Err(_) => return Err(XairError::DiscoveryTimeout(timeout)),
    };
    debug!("Discovery reply from {} ({} bytes)", from, len);

    let messages = decode_packet(&buf[..len])?;
    let reply = messages.first().ok_or_else(|| XairError::MalformedReply {
        address: INFO_ADDRESS.to_string(),
        reason: "empty bundle".to_string(),
    })?;
    let mixer = MixerInfo::from_reply(reply)?;

    info!("✅ Found {}", mixer);
    Ok(mixer)
}

/// Ephemeral-port UDP socket allowed to send to the broadcast address
fn broadcast_socket() -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_broadcast(true)?;

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    socket.bind(&bind_addr.into())?;

    // Set non-blocking for tokio
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}
