use crate::error::{BlockchainError, Result};
use crate::mining::CancellationToken;
use crate::network::GossipMessage;
use crate::rendezvous::Registry;
use log::{debug, info, warn};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

pub const DEFAULT_RENDEZVOUS_PORT: u16 = 55555;

const RECV_TIMEOUT: Duration = Duration::from_millis(250);
const RECV_BUFFER_SIZE: usize = 2048;

/// Peer registry reachable over UDP
///
/// Nodes register by sending HEARTBEAT. The registry keys each node by the
/// source address it observed, prunes nodes that stop heartbeating and
/// sends the full PEERS list to every registered node on each tick, and
/// right away when a node registers for the first time.
pub struct RendezvousServer {
    socket: UdpSocket,
    registry: Registry,
    broadcast_interval: Duration,
    stale_after: Duration,
    shutdown: CancellationToken,
}

impl RendezvousServer {
    pub fn bind(
        port: u16,
        broadcast_interval: Duration,
        stale_after: Duration,
    ) -> Result<RendezvousServer> {
        if broadcast_interval.is_zero() || stale_after.is_zero() {
            return Err(BlockchainError::Config(
                "Rendezvous intervals must be non-zero".to_string(),
            ));
        }
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {bind_addr}: {e}")))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT.min(broadcast_interval)))
            .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;
        info!("Rendezvous listening on {}", socket.local_addr()?);

        Ok(RendezvousServer {
            socket,
            registry: Registry::new(),
            broadcast_interval,
            stale_after,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn run(&mut self) -> Result<()> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut next_tick = Instant::now() + self.broadcast_interval;

        while !self.shutdown.is_cancelled() {
            match self.socket.recv_from(&mut buf) {
                Ok((len, sender)) => self.handle_datagram(&buf[..len], sender),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => warn!("Receive failed: {e}"),
            }

            let now = Instant::now();
            if now >= next_tick {
                self.registry.prune(self.stale_after, now);
                self.broadcast_peers();
                next_tick = now + self.broadcast_interval;
            }
        }
        info!("Rendezvous stopped");
        Ok(())
    }

    fn handle_datagram(&mut self, payload: &[u8], sender: SocketAddr) {
        match GossipMessage::decode(payload) {
            Ok(GossipMessage::Heartbeat { origin }) => {
                debug!("Heartbeat from {sender} ({origin})");
                if self.registry.record(sender, Instant::now()) {
                    self.broadcast_peers();
                }
            }
            Ok(other) => debug!("Ignoring {} from {sender}", other.kind()),
            Err(e) => warn!("Dropping datagram from {sender}: {e}"),
        }
    }

    fn broadcast_peers(&self) {
        if self.registry.is_empty() {
            return;
        }
        let message = GossipMessage::Peers {
            peers: self.registry.peer_list(),
        };
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Cannot encode peer list: {e}");
                return;
            }
        };
        for addr in self.registry.addresses() {
            if let Err(e) = self.socket.send_to(&payload, addr) {
                warn!("PEERS to {addr} failed: {e}");
            }
        }
    }
}
