//! UDP transport to one X-Air mixer
//!
//! The socket is connected to the mixer so every datagram we receive comes
//! from it. Outbound messages are fire-and-forget: they are queued to a
//! sender task that owns the writes, so callers never block and order is
//! kept. The receive loop, the keepalive and validation share the socket.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::codec::{decode_packet, encode_message, OscParams, MAX_DATAGRAM};
use super::discovery::MixerInfo;
use super::dispatch::dispatch;
use super::{INFO_ADDRESS, KEEPALIVE_ADDRESS};
use crate::error::{Result, XairError};
use crate::mixer::{MixerHandle, MixerLink};

/// Default validation wait
pub const VALIDATE_TIMEOUT: Duration = Duration::from_millis(500);
/// Default keepalive period, the mixer drops subscribers after ten seconds
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);

const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// One encoded datagram and the address it carries, for logging
type Outbound = (String, Vec<u8>);

pub struct XAirClient {
    socket: Arc<UdpSocket>,
    out_tx: mpsc::UnboundedSender<Outbound>,
    mixer_addr: SocketAddr,
    info_tx: watch::Sender<Option<MixerInfo>>,
}

impl XAirClient {
    /// Bind an ephemeral local port and connect it to the mixer
    pub async fn connect(ip: IpAddr, port: u16) -> Result<Self> {
        let mixer_addr = SocketAddr::new(ip, port);
        let bind_addr: SocketAddr = match ip {
            IpAddr::V4(_) => SocketAddr::from(([0, 0, 0, 0], 0)),
            IpAddr::V6(_) => SocketAddr::from(([0u16; 8], 0)),
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(mixer_addr).await?;
        debug!(
            "OSC socket {} connected to {}",
            socket.local_addr()?,
            mixer_addr
        );

        let socket = Arc::new(socket);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_sender(Arc::clone(&socket), out_rx, mixer_addr));

        let (info_tx, _) = watch::channel(None);
        Ok(Self {
            socket,
            out_tx,
            mixer_addr,
            info_tx,
        })
    }

    pub fn mixer_addr(&self) -> SocketAddr {
        self.mixer_addr
    }

    /// Encode and send one message
    ///
    /// Failures are logged and dropped; the mixer echo path reconciles state.
    pub fn send_message(&self, address: &str, params: OscParams) {
        let data = match encode_message(address, params) {
            Ok(data) => data,
            Err(e) => {
                warn!("⚠️  Failed to encode {}: {}", address, e);
                return;
            }
        };

        if self.out_tx.send((address.to_string(), data)).is_err() {
            warn!("⚠️  OSC sender stopped, dropping {}", address);
        }
    }

    /// Start the receive loop
    ///
    /// Decoded parameter values go to `mixer`; info replies feed validation.
    /// Malformed datagrams are logged and skipped.
    pub fn spawn_receiver(&self, mixer: MixerHandle, shutdown: CancellationToken) -> JoinHandle<()> {
        let socket = Arc::clone(&self.socket);
        let info_tx = self.info_tx.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("OSC receiver stopping");
                        break;
                    }
                    received = socket.recv(&mut buf) => match received {
                        Ok(len) => match decode_packet(&buf[..len]) {
                            Ok(messages) => {
                                for msg in messages {
                                    trace!("← {} {:?}", msg.addr, msg.args);
                                    dispatch(msg, &mixer, &info_tx);
                                }
                            }
                            Err(e) => warn!("⚠️  Dropping malformed datagram ({} bytes): {}", len, e),
                        },
                        Err(e) => {
                            // ICMP port unreachable surfaces here when the mixer is gone
                            debug!("OSC receive error: {}", e);
                            tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                        }
                    }
                }
            }
        })
    }

    /// Ask the mixer to identify itself and wait for the answer
    ///
    /// Needs a running receiver (see [`Self::spawn_receiver`]).
    pub async fn validate(&self, timeout: Duration) -> Result<MixerInfo> {
        self.info_tx.send_replace(None);
        let mut info_rx = self.info_tx.subscribe();
        self.send_message(INFO_ADDRESS, OscParams::None);

        let waited = tokio::time::timeout(timeout, info_rx.wait_for(Option::is_some)).await;
        match waited {
            Ok(Ok(info)) => match info.clone() {
                Some(info) => {
                    info!("✅ Connected to {}", info);
                    Ok(info)
                }
                None => Err(XairError::ValidationFailed(self.mixer_addr.to_string())),
            },
            _ => Err(XairError::ValidationFailed(self.mixer_addr.to_string())),
        }
    }

    /// Renew the update subscription every `interval` until cancelled
    pub async fn keepalive(&self, interval: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.send_message(KEEPALIVE_ADDRESS, OscParams::None);
                    trace!("Keepalive sent");
                }
            }
        }
        debug!("Keepalive stopped");
    }
}

/// Write queued datagrams in order until every client handle is gone
async fn run_sender(
    socket: Arc<UdpSocket>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    mixer_addr: SocketAddr,
) {
    while let Some((address, data)) = rx.recv().await {
        match socket.send(&data).await {
            Ok(_) => trace!("→ {}", address),
            Err(e) => warn!("⚠️  Failed to send {} to {}: {}", address, mixer_addr, e),
        }
    }
    debug!("OSC sender stopped");
}

impl MixerLink for XAirClient {
    fn send(&self, address: &str, params: OscParams) {
        self.send_message(address, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::MixerActor;
    use crate::osc::XAIR_PORT;
    use crate::testing::{RecordingLink, RecordingSurface};
    use rosc::OscType;

    async fn fake_mixer() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    fn info_args() -> OscParams {
        OscParams::Many(
            ["127.0.0.1", "XR18-TEST", "XR18", "1.17"]
                .iter()
                .map(|s| OscType::String(s.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_protocol_constants() {
        assert_eq!(XAIR_PORT, 10024);
        assert_eq!(KEEPALIVE_INTERVAL, Duration::from_secs(5));
        assert_eq!(VALIDATE_TIMEOUT, Duration::from_millis(500));
    }

    async fn recv_message(mixer: &UdpSocket) -> rosc::OscMessage {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), mixer.recv_from(&mut buf))
            .await
            .expect("datagram not delivered")
            .unwrap();
        decode_packet(&buf[..len]).unwrap().remove(0)
    }

    #[tokio::test]
    async fn test_send_message_reaches_mixer() {
        let (mixer, addr) = fake_mixer().await;
        let client = XAirClient::connect(addr.ip(), addr.port()).await.unwrap();

        client.send("/ch/01/mix/fader", 0.5f32.into());

        let msg = recv_message(&mixer).await;
        assert_eq!(msg.addr, "/ch/01/mix/fader");
        assert_eq!(msg.args, vec![OscType::Float(0.5)]);
    }

    #[tokio::test]
    async fn test_burst_right_after_connect_is_delivered_in_order() {
        let (mixer, addr) = fake_mixer().await;
        let client = XAirClient::connect(addr.ip(), addr.port()).await.unwrap();

        client.send_message(INFO_ADDRESS, OscParams::None);
        for i in 1..=16 {
            client.send_message(&format!("/ch/{:02}/mix/fader", i), OscParams::None);
        }

        assert_eq!(recv_message(&mixer).await.addr, INFO_ADDRESS);
        for i in 1..=16 {
            assert_eq!(
                recv_message(&mixer).await.addr,
                format!("/ch/{:02}/mix/fader", i)
            );
        }
    }

    #[tokio::test]
    async fn test_validate_against_fake_mixer() {
        let (mixer, addr) = fake_mixer().await;
        let client = XAirClient::connect(addr.ip(), addr.port()).await.unwrap();
        let handle = MixerActor::spawn(
            Arc::new(RecordingLink::default()),
            Arc::new(RecordingSurface::default()),
        );
        let shutdown = CancellationToken::new();
        client.spawn_receiver(handle.clone(), shutdown.clone());

        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                let (len, from) = mixer.recv_from(&mut buf).await.unwrap();
                let msgs = decode_packet(&buf[..len]).unwrap();
                if msgs[0].addr == INFO_ADDRESS {
                    // A garbage datagram first: must be skipped, not fatal
                    mixer.send_to(b"garbage", from).await.unwrap();
                    let value = encode_message("/ch/05/mix/fader", 0.6f32.into()).unwrap();
                    mixer.send_to(&value, from).await.unwrap();
                    let reply = encode_message(INFO_ADDRESS, info_args()).unwrap();
                    mixer.send_to(&reply, from).await.unwrap();
                }
            }
        });

        let info = client.validate(Duration::from_secs(2)).await.unwrap();
        assert_eq!(info.model, "XR18");

        let ch = handle.channel(0, 4).await.unwrap();
        assert_eq!(ch.fader, 0.6);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_validate_times_out_on_silent_peer() {
        let (_mixer, addr) = fake_mixer().await;
        let client = XAirClient::connect(addr.ip(), addr.port()).await.unwrap();
        let handle = MixerActor::spawn(
            Arc::new(RecordingLink::default()),
            Arc::new(RecordingSurface::default()),
        );
        let shutdown = CancellationToken::new();
        client.spawn_receiver(handle, shutdown.clone());

        let result = client.validate(Duration::from_millis(100)).await;
        assert!(matches!(result, Err(XairError::ValidationFailed(_))));
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_keepalive_until_cancelled() {
        let (mixer, addr) = fake_mixer().await;
        let client = Arc::new(XAirClient::connect(addr.ip(), addr.port()).await.unwrap());
        let shutdown = CancellationToken::new();

        let task = {
            let client = Arc::clone(&client);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                client.keepalive(Duration::from_millis(20), shutdown).await;
            })
        };

        let mut buf = vec![0u8; MAX_DATAGRAM];
        for _ in 0..2 {
            let (len, _) = mixer.recv_from(&mut buf).await.unwrap();
            let msgs = decode_packet(&buf[..len]).unwrap();
            assert_eq!(msgs[0].addr, KEEPALIVE_ADDRESS);
            assert!(msgs[0].args.is_empty());
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
