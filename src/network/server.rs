use crate::config::Config;
use crate::consensus::ConsensusManager;
use crate::error::{BlockchainError, Result};
use crate::mining::{CancellationToken, MiningWorker};
use crate::network::{GossipEngine, GossipMessage, Transport};
use crate::node::NodeState;
use log::{error, info, warn};
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Receive loop wakes this often to notice shutdown
const RECV_TIMEOUT: Duration = Duration::from_millis(250);
const RECV_BUFFER_SIZE: usize = 65_536;

/// One node bound to a UDP socket
///
/// `run` drives three activities that only meet through the shared node
/// state: the receive loop, the rendezvous heartbeat, and startup sync
/// followed by the optional mining loop.
pub struct Server {
    config: Config,
    socket: Arc<UdpSocket>,
    engine: Arc<GossipEngine>,
    shutdown: CancellationToken,
}

impl Server {
    /// Bind the node's socket; the only failure that ends the process
    pub fn bind(config: Config) -> Result<Server> {
        config.validate()?;
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {bind_addr}: {e}")))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;
        let bound = socket
            .local_addr()
            .map_err(|e| BlockchainError::Network(format!("Failed to read local address: {e}")))?;

        let self_addr = config.advertise_addr(bound.port());
        let state = Arc::new(NodeState::new(
            &config.identity,
            self_addr,
            config.seen_capacity,
        ));
        let consensus = Arc::new(ConsensusManager::new(state));
        let socket = Arc::new(socket);
        let engine = Arc::new(GossipEngine::new(
            consensus,
            Arc::clone(&socket) as Arc<dyn Transport>,
            config.gossip_ttl,
        ));

        info!(
            "Node {} listening on {bound}, advertised as {self_addr}",
            config.identity
        );
        Ok(Server {
            config,
            socket,
            engine,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.engine.state().peers().get_self_addr()
    }

    pub fn engine(&self) -> &Arc<GossipEngine> {
        &self.engine
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop every loop and abort any in-flight search
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        match self.engine.consensus().cancel_mining() {
            Ok(cancelled) if cancelled > 0 => info!("Cancelled {cancelled} mining search(es)"),
            Ok(_) => {}
            Err(e) => warn!("Failed to cancel mining: {e}"),
        }
    }

    /// Run until shutdown
    ///
    /// With `foreground` set, the caller's closure runs on the current
    /// thread (the interactive console) and its return shuts the node down.
    pub fn run<F>(&self, foreground: Option<F>) -> Result<()>
    where
        F: FnOnce(&Server) + Send,
    {
        thread::scope(|scope| {
            scope.spawn(|| self.heartbeat_loop());
            scope.spawn(|| self.sync_then_mine());
            match foreground {
                Some(foreground) => {
                    scope.spawn(|| self.receive_loop());
                    foreground(self);
                    self.shutdown();
                }
                None => self.receive_loop(),
            }
        });
        info!("Node {} stopped", self.config.identity);
        Ok(())
    }

    fn receive_loop(&self) {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        while !self.shutdown.is_cancelled() {
            match self.socket.recv_from(&mut buf) {
                Ok((len, sender)) => self.engine.handle_datagram(&buf[..len], sender),
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => warn!("Receive failed: {e}"),
            }
        }
    }

    fn heartbeat_loop(&self) {
        let heartbeat = GossipMessage::Heartbeat {
            origin: self.local_addr().to_string(),
        };
        let peers = self.engine.state().peers();
        loop {
            if let Err(e) = self.engine.send(&heartbeat, self.config.rendezvous) {
                warn!("Heartbeat to {} failed: {e}", self.config.rendezvous);
            }
            if let Err(e) = peers.prune_stale(self.config.peer_timeout) {
                warn!("Peer pruning failed: {e}");
            }
            if self.shutdown.pause(self.config.heartbeat_interval) {
                break;
            }
        }
    }

    fn sync_then_mine(&self) {
        let consensus = self.engine.consensus();
        if let Err(e) = consensus.sync_on_startup(
            &self.engine,
            self.config.sync_peer_wait,
            self.config.sync_timeout,
        ) {
            error!("Startup sync failed: {e}");
        }
        if self.config.auto_mine && !self.shutdown.is_cancelled() {
            MiningWorker::new(
                Arc::clone(&self.engine),
                self.config.mine_empty_blocks,
                self.shutdown.clone(),
            )
            .run();
        }
    }
}
